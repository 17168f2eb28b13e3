use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::api::rest::error::ProblemCtx;
use crate::auth::{error::AuthError, jwt::JwtKeys, policy::AccessPolicy};
use crate::contract::model::Role;

#[derive(Clone)]
pub struct AuthState {
    pub keys: Arc<JwtKeys>,
    pub policy: Arc<AccessPolicy>,
}

/// Authenticated caller, available to handlers as `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
    pub role: Role,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Route layer: 401 without a valid token, 403 when the policy denies the role.
pub async fn require_auth(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let ctx = ProblemCtx::of(&req);

    let claims = match bearer_token(req.headers())
        .ok_or(AuthError::MissingToken)
        .and_then(|token| state.keys.verify(token))
    {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "request rejected: unauthenticated");
            return ctx.auth(e).into_response();
        }
    };

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let role = match state.policy.authorize(req.method(), &route, &claims) {
        Ok(role) => role,
        Err(e) => {
            debug!(error = %e, "request rejected: forbidden");
            return ctx.auth(e).into_response();
        }
    };

    req.extensions_mut().insert(AuthContext {
        subject: claims.sub,
        role,
    });
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn extracts_bearer_tokens() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer  abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
