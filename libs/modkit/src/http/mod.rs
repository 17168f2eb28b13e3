//! HTTP plumbing: request ids, tracing and the standard middleware stack.

pub mod request_id;
pub mod server;
