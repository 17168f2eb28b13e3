use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

use crate::api::rest::{handlers, openapi};
use crate::auth::{require_auth, AuthState};
use crate::module::StoreState;

/// Public routes (`/auth/login`, `/health`, optionally `/openapi.json`) plus
/// the token-protected `/fruits` and `/users` routes.
pub fn register_routes(state: Arc<StoreState>, auth: AuthState, enable_docs: bool) -> Router {
    let protected = Router::new()
        .route(
            "/fruits",
            get(handlers::list_fruits).post(handlers::create_fruit),
        )
        .route(
            "/fruits/{id}",
            get(handlers::get_fruit)
                .put(handlers::update_fruit)
                .delete(handlers::delete_fruit),
        )
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route_layer(from_fn_with_state(auth, require_auth));

    let mut public = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/health", get(modkit::health_check));
    if enable_docs {
        public = public.route("/openapi.json", get(openapi::openapi_json));
    }

    public.merge(protected).layer(Extension(state))
}
