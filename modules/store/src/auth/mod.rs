//! Bearer-token authentication and role authorization.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;

pub use error::AuthError;
pub use jwt::{Claims, JwtKeys};
pub use middleware::{require_auth, AuthContext, AuthState};
pub use password::PasswordHasher;
pub use policy::AccessPolicy;
