/// Per-client sliding window rate limiter
///
/// Applied as route middleware to the per-file and write endpoints. Clients are keyed
/// by peer IP when the server runs with connect info, otherwise they share the
/// "unknown" bucket. A malformed `{filename}` is rejected with 400 before the request
/// counts against the limit.

use crate::{api::AppState, catalog::filename::validate_filename, error::CatalogError};
use axum::{
    extract::{rejection::RawPathParamsRejection, ConnectInfo, RawPathParams, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Sixty second window, the deployment default
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Record a request from `client`, returning false when it is over the limit
    ///
    /// Rejected requests are not recorded, so a client regains capacity as soon as
    /// its oldest accepted request leaves the window.
    pub async fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now()).await
    }

    async fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock().await;

        // Drop buckets that have fully aged out so idle clients do not accumulate.
        hits.retain(|_, q| q.back().is_some_and(|t| now.duration_since(*t) < self.window));

        let queue = hits.entry(client.to_string()).or_default();
        while queue.front().is_some_and(|t| now.duration_since(*t) >= self.window) {
            queue.pop_front();
        }

        if queue.len() >= self.max_requests {
            return false;
        }
        queue.push_back(now);
        true
    }
}

/// Client key for a request: peer IP, or "unknown" without connect info
pub fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The `{filename}` path parameter when it fails validation
fn invalid_filename(params: &RawPathParams) -> Option<String> {
    params
        .iter()
        .find(|(key, _)| *key == "filename")
        .map(|(_, value)| value)
        .filter(|value| validate_filename(value).is_none())
        .map(str::to_string)
}

/// Middleware rejecting requests over the configured limit with 429
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(filename) = params.ok().as_ref().and_then(invalid_filename) {
        tracing::warn!("🚫 Blocked unsafe workflow filename: {:?}", filename);
        return CatalogError::InvalidFilename(filename).into_response();
    }

    let client = client_key(&request);
    if !state.limiter.check(&client).await {
        tracing::warn!("🚦 Rate limit exceeded for {} on {}", client, request.uri().path());
        return CatalogError::RateLimited.into_response();
    }
    next.run(request).await
}
