//! HTTP transport for the update triggers
//!
//! # API Endpoints
//!
//! ## GET|POST /api/public-update
//!
//! Open to anyone, rate limited per client (3 per hour by default). Every
//! response carries:
//!
//! ```text
//! X-RateLimit-Limit: 3
//! X-RateLimit-Remaining: 2
//! X-RateLimit-Reset: 2024-05-01T13:00:00.000Z
//! ```
//!
//! ### 200
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Profile updated with cat.png!",
//!   "pfpFile": "cat.png",
//!   "rateLimit": { "remaining": 2, "resetTime": "2024-05-01T13:00:00.000Z" }
//! }
//! ```
//!
//! ### 429
//!
//! ```json
//! {
//!   "error": "Rate limit exceeded",
//!   "message": "Too many update requests. Please try again later.",
//!   "resetTime": "2024-05-01T13:00:00.000Z",
//!   "limit": 3,
//!   "window": "1 hour"
//! }
//! ```
//!
//! ### 500
//!
//! ```json
//! { "error": "Update failed", "message": "Login failed (401): ..." }
//! ```
//!
//! ## GET|POST /api/update-pfp
//!
//! Not rate limited. Meant for a scheduler; when a cron secret is
//! configured the request must carry `Authorization: Bearer <secret>`.
//! Replies with plain text.
//!
//! ## GET /health
//!
//! Returns "OK" with 200 status.

use crate::error::UpdateError;
use crate::identity::resolve_identifier;
use crate::types::{
    PublicUpdateResponse, RateLimitExceededResponse, RateLimitSnapshot, UpdateFailedResponse,
    describe_window, to_iso8601,
};
use crate::updater::Orchestrator;
use anyhow::{Result, anyhow};
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use pfp_governor::{Clock, Quota, RateGovernor, ShardedStore};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// The governor type the server runs with
pub type SharedGovernor = RateGovernor<ShardedStore, Arc<dyn Clock>>;

/// State shared by all handlers
pub struct AppState {
    pub governor: Arc<SharedGovernor>,
    pub orchestrator: Arc<dyn Orchestrator>,
    /// Quota applied per client on the public trigger
    pub public_quota: Quota,
    /// Bearer secret for the authenticated trigger
    pub cron_secret: Option<String>,
}

/// HTTP transport implementation
pub struct HttpTransport {
    addr: SocketAddr,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow!("Invalid address {host}:{port}: {e}"))?;
        Ok(Self { addr })
    }

    /// Serve until `shutdown` resolves
    pub async fn start(
        self,
        state: Arc<AppState>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let app = router(state);

        tracing::info!("HTTP server listening on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        Ok(())
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/public-update",
            get(handle_public_update).post(handle_public_update),
        )
        .route(
            "/api/update-pfp",
            get(handle_authenticated_update).post(handle_authenticated_update),
        )
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Peer address of the connection, when the server was started with connect info
pub struct ClientAddr(pub Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientAddr(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

async fn handle_public_update(
    State(state): State<Arc<AppState>>,
    ClientAddr(peer): ClientAddr,
    headers: HeaderMap,
) -> Response {
    let identifier = resolve_identifier(&headers, peer);
    tracing::info!("Public update requested by {}", identifier);

    let quota = state.public_quota;
    let admission = match state
        .governor
        .admit(&identifier, quota.max_requests, quota.window)
    {
        Ok(admission) => admission,
        Err(e) => {
            tracing::error!("Rate governor error: {}", e);
            return update_failed(HeaderMap::new(), e.to_string());
        }
    };

    let reset_time = to_iso8601(admission.reset_time);
    let limit_headers = rate_limit_headers(quota.max_requests, admission.remaining, &reset_time);

    if !admission.success {
        tracing::warn!("Rate limit exceeded for {}", identifier);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            limit_headers,
            Json(RateLimitExceededResponse {
                error: "Rate limit exceeded".to_string(),
                message: "Too many update requests. Please try again later.".to_string(),
                reset_time,
                limit: quota.max_requests,
                window: describe_window(quota.window),
            }),
        )
            .into_response();
    }

    tracing::debug!(
        remaining = admission.remaining,
        "Admitted public update for {}",
        identifier
    );

    match state.orchestrator.update_profile().await {
        Ok(outcome) => {
            tracing::info!("Public update successful: {}", outcome.pfp_file);
            (
                StatusCode::OK,
                limit_headers,
                Json(PublicUpdateResponse {
                    success: true,
                    message: outcome.message,
                    pfp_file: outcome.pfp_file,
                    rate_limit: RateLimitSnapshot {
                        remaining: admission.remaining,
                        reset_time,
                    },
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Public update failed: {}", e);
            update_failed(limit_headers, e.to_string())
        }
    }
}

async fn handle_authenticated_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if let Some(secret) = &state.cron_secret {
        if !bearer_matches(&headers, secret) {
            tracing::warn!("Rejected update-pfp request with missing or wrong bearer token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }

    tracing::info!("Scheduled update requested");

    match state.orchestrator.update_profile().await {
        Ok(outcome) => (
            StatusCode::OK,
            format!("Profile updated with {}!", outcome.pfp_file),
        )
            .into_response(),
        Err(UpdateError::Configuration) => {
            tracing::error!("Scheduled update failed: missing credentials");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error.",
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Scheduled update failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred: {e}"),
            )
                .into_response()
        }
    }
}

fn rate_limit_headers(limit: u32, remaining: u32, reset_time: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
    if let Ok(value) = HeaderValue::from_str(reset_time) {
        headers.insert(RATE_LIMIT_RESET, value);
    }
    headers
}

fn update_failed(headers: HeaderMap, message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        headers,
        Json(UpdateFailedResponse {
            error: "Update failed".to_string(),
            message,
        }),
    )
        .into_response()
}

fn bearer_matches(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == secret)
}
