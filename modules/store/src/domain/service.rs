use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use user_events::UserEvent;
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::contract::model::{Fruit, FruitDraft, NewUser, User};
use crate::domain::error::DomainError;
use crate::domain::ports::{FruitListCache, FruitRepository, InsertOutcome, UsersRepository};
use crate::domain::validation::{validate_fruit, validate_new_user};

/// Current time at the precision Postgres keeps, so responses match later reads.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Inventory operations with a read-through cache of the listing.
///
/// Reads tolerate an unavailable cache; writes fail when the stale listing
/// cannot be invalidated.
pub struct FruitService {
    repo: Arc<dyn FruitRepository>,
    cache: Arc<dyn FruitListCache>,
}

impl FruitService {
    pub fn new(repo: Arc<dyn FruitRepository>, cache: Arc<dyn FruitListCache>) -> Self {
        Self { repo, cache }
    }

    #[instrument(skip(self))]
    pub async fn list_fruits(&self) -> Result<Vec<Fruit>, DomainError> {
        match self.cache.get().await {
            Ok(Some(fruits)) => {
                debug!(count = fruits.len(), "fruit list served from cache");
                return Ok(fruits);
            }
            Ok(None) => debug!("fruit list cache miss"),
            Err(e) => warn!(error = %e, "fruit list cache read failed; using database"),
        }

        // Taken before the database read: a write landing in between bumps it
        // and the listing read here is not cached.
        let generation = match self.cache.generation().await {
            Ok(g) => Some(g),
            Err(e) => {
                warn!(error = %e, "fruit list cache generation unavailable");
                None
            }
        };

        let fruits = self
            .repo
            .list()
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?;

        if let Some(generation) = generation {
            match self.cache.put(generation, &fruits).await {
                Ok(true) => {}
                Ok(false) => debug!("fruit list changed during read; not cached"),
                Err(e) => warn!(error = %e, "failed to populate fruit list cache"),
            }
        }
        Ok(fruits)
    }

    #[instrument(skip(self))]
    pub async fn get_fruit(&self, id: Uuid) -> Result<Fruit, DomainError> {
        self.repo
            .find(id)
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?
            .ok_or_else(|| DomainError::fruit_not_found(id))
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_fruit(&self, draft: FruitDraft) -> Result<Fruit, DomainError> {
        validate_fruit(&draft)?;
        let now = now();
        let fruit = Fruit {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            quantity: draft.quantity,
            price: draft.price,
            created_at: now,
            updated_at: now,
        };
        self.repo
            .insert(&fruit)
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?;
        self.invalidate_listing().await?;
        info!(id = %fruit.id, "fruit created");
        Ok(fruit)
    }

    #[instrument(skip(self, draft))]
    pub async fn update_fruit(&self, id: Uuid, draft: FruitDraft) -> Result<Fruit, DomainError> {
        validate_fruit(&draft)?;
        let draft = FruitDraft {
            name: draft.name.trim().to_string(),
            ..draft
        };
        let updated = self
            .repo
            .update(id, &draft, now())
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?
            .ok_or_else(|| DomainError::fruit_not_found(id))?;
        self.invalidate_listing().await?;
        info!(%id, "fruit updated");
        Ok(updated)
    }

    /// Idempotent: deleting a missing fruit succeeds.
    #[instrument(skip(self))]
    pub async fn delete_fruit(&self, id: Uuid) -> Result<(), DomainError> {
        let removed = self
            .repo
            .delete(id)
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?;
        self.invalidate_listing().await?;
        if removed {
            info!(%id, "fruit deleted");
        } else {
            debug!(%id, "delete of absent fruit");
        }
        Ok(())
    }

    async fn invalidate_listing(&self) -> Result<(), DomainError> {
        self.cache.invalidate().await.map_err(|e| {
            warn!(error = %e, "fruit list cache invalidation failed");
            DomainError::cache(e.to_string())
        })
    }
}

/// Account operations. Creation writes the user and its `create` event in
/// one transaction; the outbox relay delivers the event afterwards.
pub struct UserService {
    repo: Arc<dyn UsersRepository>,
    hasher: PasswordHasher,
    /// Hash verified against when the username is unknown, built on first use.
    decoy: OnceCell<String>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UsersRepository>, hasher: PasswordHasher) -> Self {
        Self {
            repo,
            hasher,
            decoy: OnceCell::new(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        self.repo
            .list()
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))
    }

    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        let role = validate_new_user(&new_user)?;
        let username = new_user.username.trim().to_string();

        if self
            .repo
            .find_by_username(&username)
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?
            .is_some()
        {
            return Err(DomainError::username_taken(username));
        }

        let password_hash = self
            .hasher
            .hash(&new_user.password)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let now = now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        };
        let event = UserEvent::created(user.projection());

        match self
            .repo
            .insert_with_event(&user, &event)
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?
        {
            InsertOutcome::Inserted => {
                info!(id = %user.id, role = %user.role, "user created; event queued");
                Ok(user)
            }
            InsertOutcome::UsernameTaken => Err(DomainError::username_taken(user.username)),
        }
    }

    /// Check credentials; unknown user and wrong password are indistinguishable.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, DomainError> {
        let Some(user) = self
            .repo
            .find_by_username(username)
            .await
            .map_err(|e| DomainError::database(format!("{e:#}")))?
        else {
            debug!("login for unknown user");
            self.burn_verify(password).await;
            return Err(DomainError::InvalidCredentials);
        };

        let ok = self
            .hasher
            .verify(password, &user.password_hash)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;
        if !ok {
            debug!("login with wrong password");
            return Err(DomainError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Same bcrypt work as a real check, so unknown usernames take as long as
    /// wrong passwords.
    async fn burn_verify(&self, password: &str) {
        let decoy = self
            .decoy
            .get_or_try_init(|| self.hasher.hash("decoy-password"))
            .await;
        match decoy {
            Ok(hash) => {
                let _ = self.hasher.verify(password, hash).await;
            }
            Err(e) => warn!(error = %e, "cannot build decoy hash"),
        }
    }
}
