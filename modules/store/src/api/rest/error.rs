use axum::{
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{request::Parts, Extensions, Request, Uri},
};
use modkit::http::request_id::XRequestId;
use modkit::{
    bad_request, conflict, forbidden, internal_error, not_found, unauthorized, ProblemResponse,
    ValidationError,
};
use std::convert::Infallible;
use tracing::error;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::domain::error::DomainError;

/// Request facts stamped onto every problem: the path as `instance` and the request id.
#[derive(Debug, Clone)]
pub struct ProblemCtx {
    instance: String,
    request_id: Option<String>,
}

impl ProblemCtx {
    fn from_parts(uri: &Uri, extensions: &Extensions) -> Self {
        Self {
            instance: uri.path().to_string(),
            request_id: extensions.get::<XRequestId>().map(|r| r.0.clone()),
        }
    }

    pub fn of<B>(req: &Request<B>) -> Self {
        Self::from_parts(req.uri(), req.extensions())
    }

    fn finish(&self, p: ProblemResponse, code: &str) -> ProblemResponse {
        let mut problem = p.0.with_instance(&self.instance).with_code(code);
        if let Some(id) = &self.request_id {
            problem = problem.with_request_id(id);
        }
        ProblemResponse(problem)
    }

    pub fn bad_request(&self, code: &str, detail: impl Into<String>) -> ProblemResponse {
        self.finish(bad_request(detail), code)
    }

    pub fn json_rejection(&self, rejection: JsonRejection) -> ProblemResponse {
        self.bad_request("INVALID_BODY", rejection.body_text())
    }

    /// Parse a path identifier; malformed input never reaches the service.
    pub fn parse_id(&self, raw: &str) -> Result<Uuid, ProblemResponse> {
        Uuid::parse_str(raw)
            .map_err(|_| self.bad_request("INVALID_ID", format!("'{raw}' is not a valid UUID")))
    }

    pub fn domain(&self, err: DomainError) -> ProblemResponse {
        match err {
            DomainError::FruitNotFound { .. } => {
                self.finish(not_found(err.to_string()), "FRUIT_NOT_FOUND")
            }
            DomainError::UsernameTaken { .. } => {
                self.finish(conflict(err.to_string()), "USERNAME_TAKEN")
            }
            DomainError::InvalidCredentials => {
                self.finish(unauthorized(err.to_string()), "INVALID_CREDENTIALS")
            }
            DomainError::Validation { field, message } => {
                let mut p = self.finish(
                    bad_request(format!("{field}: {message}")),
                    "VALIDATION_FAILED",
                );
                p.0 = p.0.with_errors(vec![ValidationError {
                    detail: message,
                    pointer: format!("/{field}"),
                }]);
                p
            }
            DomainError::Database { .. }
            | DomainError::Cache { .. }
            | DomainError::Internal { .. } => {
                error!(error = %err, instance = %self.instance, "request failed");
                self.finish(internal_error("An internal error occurred"), "INTERNAL")
            }
        }
    }

    pub fn auth(&self, err: AuthError) -> ProblemResponse {
        let code = match &err {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::MissingRole => "MISSING_ROLE",
            AuthError::UnknownRole(_) => "UNKNOWN_ROLE",
            AuthError::Forbidden { .. } => "FORBIDDEN",
            AuthError::EmptySecret | AuthError::Signing(_) | AuthError::Hashing(_) => {
                error!(error = %err, instance = %self.instance, "auth failure");
                return self.finish(internal_error("An internal error occurred"), "INTERNAL");
            }
        };
        if err.is_unauthenticated() {
            self.finish(unauthorized(err.to_string()), code)
        } else {
            self.finish(forbidden(err.to_string()), code)
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ProblemCtx {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(&parts.uri, &parts.extensions))
    }
}
