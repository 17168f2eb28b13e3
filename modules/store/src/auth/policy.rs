use axum::http::Method;
use std::collections::HashMap;

use crate::auth::{error::AuthError, jwt::Claims};
use crate::contract::model::Role;

/// Role allow-list per `(method, route template)`.
///
/// Routes are matched by their template (`/fruits/{id}`), never by the
/// concrete path. A route with no entry is denied to every role.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<(Method, String), Vec<Role>>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, method: Method, route: &str, roles: &[Role]) -> Self {
        self.rules
            .insert((method, route.to_string()), roles.to_vec());
        self
    }

    /// Reads of the inventory for every role, everything else admin-only.
    pub fn store_default() -> Self {
        const ANY: &[Role] = &[Role::Admin, Role::User];
        const ADMIN: &[Role] = &[Role::Admin];
        Self::new()
            .allow(Method::GET, "/fruits", ANY)
            .allow(Method::GET, "/fruits/{id}", ANY)
            .allow(Method::POST, "/fruits", ADMIN)
            .allow(Method::PUT, "/fruits/{id}", ADMIN)
            .allow(Method::DELETE, "/fruits/{id}", ADMIN)
            .allow(Method::GET, "/users", ADMIN)
            .allow(Method::POST, "/users", ADMIN)
    }

    pub fn allowed_roles(&self, method: &Method, route: &str) -> Option<&[Role]> {
        // HEAD is served by GET handlers.
        let method = if *method == Method::HEAD {
            Method::GET
        } else {
            method.clone()
        };
        self.rules
            .get(&(method, route.to_string()))
            .map(Vec::as_slice)
    }

    /// Resolve the caller's role and check it against the route's allow-list.
    pub fn authorize(
        &self,
        method: &Method,
        route: &str,
        claims: &Claims,
    ) -> Result<Role, AuthError> {
        let raw = claims.role.as_deref().ok_or(AuthError::MissingRole)?;
        let role: Role = raw
            .parse()
            .map_err(|_| AuthError::UnknownRole(raw.to_string()))?;

        let allowed = self
            .allowed_roles(method, route)
            .is_some_and(|roles| roles.contains(&role));
        if allowed {
            Ok(role)
        } else {
            Err(AuthError::Forbidden {
                role: role.to_string(),
                method: method.to_string(),
                route: route.to_string(),
            })
        }
    }
}
