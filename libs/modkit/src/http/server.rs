use anyhow::anyhow;
use axum::{middleware::from_fn, response::Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use super::request_id::{self, MakeReqId};

/// Knobs of the standard middleware stack.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    pub cors_enabled: bool,
    pub body_limit: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_enabled: true,
            body_limit: 16 * 1024 * 1024,
        }
    }
}

impl HttpOptions {
    /// Options with the request timeout taken from `server.timeout_sec` (0 = default).
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        if secs > 0 {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }
}

/// Wrap a router with the standard stack.
///
/// Outermost to innermost:
/// PropagateRequestId -> SetRequestId -> Trace -> push_req_id_to_extensions -> Timeout -> CORS -> BodyLimit
pub fn with_standard_layers(router: Router, opts: &HttpOptions) -> Router {
    let x_request_id = request_id::header();

    // `.layer` wraps everything added before it, so the innermost layer goes first.
    let mut router = router.layer(RequestBodyLimitLayer::new(opts.body_limit));
    if opts.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    router
        .layer(TimeoutLayer::new(opts.request_timeout))
        .layer(from_fn(request_id::push_req_id_to_extensions))
        .layer(request_id::create_trace_layer())
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeReqId))
        .layer(PropagateRequestIdLayer::new(x_request_id))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Bind and serve until `cancel` fires, then drain in-flight requests.
pub async fn serve(router: Router, addr: SocketAddr, cancel: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server bound on {}", addr);

    let shutdown = async move {
        cancel.cancelled().await;
        tracing::info!("HTTP server shutting down gracefully (cancellation)");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow!(e))
}
