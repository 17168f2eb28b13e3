//! # ModKit
//!
//! HTTP and process plumbing shared by the fruit store services:
//! RFC 9457 problem responses, request-id propagation and tracing, the
//! standard middleware stack, graceful serving and shutdown signals.

pub use anyhow::Result;

pub mod api;
pub mod http;
pub mod runtime;

pub use api::problem::{
    bad_request, conflict, forbidden, internal_error, not_found, unauthorized, Problem,
    ProblemResponse, ValidationError,
};
pub use http::server::{health_check, serve, with_standard_layers, HttpOptions};
pub use runtime::shutdown::{shutdown_token, wait_for_shutdown};
