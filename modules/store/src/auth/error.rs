use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    Expired,

    #[error("token carries no role claim")]
    MissingRole,

    #[error("role '{0}' is not recognised")]
    UnknownRole(String),

    #[error("role '{role}' may not access {method} {route}")]
    Forbidden {
        role: String,
        method: String,
        route: String,
    },

    #[error("token signing secret must not be empty")]
    EmptySecret,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Whether the caller failed to prove who they are (as opposed to lacking permission).
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::Expired
        )
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            AuthError::MissingRole | AuthError::UnknownRole(_) | AuthError::Forbidden { .. }
        )
    }
}
