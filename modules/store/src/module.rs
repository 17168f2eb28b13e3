use axum::Router;
use std::sync::Arc;

use crate::api::rest::routes;
use crate::auth::{AccessPolicy, AuthState, JwtKeys, PasswordHasher};
use crate::config::StoreConfig;
use crate::domain::ports::{FruitListCache, FruitRepository, UsersRepository};
use crate::domain::service::{FruitService, UserService};

/// Collaborators constructed at startup and injected into the store.
pub struct StoreDeps {
    pub fruits: Arc<dyn FruitRepository>,
    pub users: Arc<dyn UsersRepository>,
    pub cache: Arc<dyn FruitListCache>,
    pub keys: JwtKeys,
}

/// Shared by all handlers through `Extension<Arc<StoreState>>`.
pub struct StoreState {
    pub fruits: FruitService,
    pub users: UserService,
    pub keys: Arc<JwtKeys>,
}

pub struct Store {
    state: Arc<StoreState>,
    auth: AuthState,
    enable_docs: bool,
}

impl Store {
    pub fn new(deps: StoreDeps, cfg: &StoreConfig) -> Self {
        Self::with_policy(deps, cfg, AccessPolicy::store_default())
    }

    pub fn with_policy(deps: StoreDeps, cfg: &StoreConfig, policy: AccessPolicy) -> Self {
        let keys = Arc::new(deps.keys);
        let state = Arc::new(StoreState {
            fruits: FruitService::new(deps.fruits, deps.cache),
            users: UserService::new(deps.users, PasswordHasher::new(cfg.bcrypt_cost)),
            keys: keys.clone(),
        });
        Self {
            state,
            auth: AuthState {
                keys,
                policy: Arc::new(policy),
            },
            enable_docs: cfg.enable_docs,
        }
    }

    pub fn state(&self) -> Arc<StoreState> {
        self.state.clone()
    }

    /// All store routes; the standard middleware stack is applied by the caller.
    pub fn router(&self) -> Router {
        routes::register_routes(self.state.clone(), self.auth.clone(), self.enable_docs)
    }
}
