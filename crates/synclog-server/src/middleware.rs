//! Request plumbing shared by every route: request ids, bearer auth and
//! per-caller rate limiting.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;
const USER_ROUTE_PREFIX: &str = "/api/v1/users/";

/// Correlation id for one request, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Accepted bearer tokens. `None` means auth is off.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Option<Arc<HashSet<String>>>,
}

impl AuthState {
    /// Reads `SYNCLOG_API_KEYS`; see [`AuthState::from_keys`].
    ///
    /// # Errors
    ///
    /// Fails outside development when no key is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("SYNCLOG_API_KEYS").unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// Parses a comma-separated token list.
    ///
    /// An empty list turns auth off in development and is an error elsewhere.
    ///
    /// # Errors
    ///
    /// Fails outside development when `raw` holds no token.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys: HashSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();

        match (keys.is_empty(), is_development) {
            (false, _) => Ok(Self {
                keys: Some(Arc::new(keys)),
            }),
            (true, true) => {
                tracing::warn!(
                    "no SYNCLOG_API_KEYS configured; user routes are unauthenticated"
                );
                Ok(Self::disabled())
            }
            (true, false) => {
                anyhow::bail!(
                    "SYNCLOG_API_KEYS must list at least one bearer token outside development"
                )
            }
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { keys: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    fn allows(&self, token: Option<&str>) -> bool {
        match (&self.keys, token) {
            (None, _) => true,
            (Some(keys), Some(token)) => keys.contains(token),
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    opened_at: Instant,
    used: usize,
}

/// Fixed-window request budget, tracked separately for each caller.
///
/// Callers on `/api/v1/users/{user_id}/...` are keyed by user id, anything
/// else by bearer token, and unauthenticated traffic shares one bucket.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: usize,
    window: Duration,
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: usize, window: Duration) -> Self {
        Self {
            budget,
            window,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spends one request from `key`'s budget at `now`. Returns `false` once
    /// the budget for the current window is gone.
    async fn admit(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;

        if !buckets.contains_key(key) {
            // New callers trigger a sweep so stale keys don't accumulate.
            buckets.retain(|_, bucket| {
                now.saturating_duration_since(bucket.opened_at) < self.window
            });
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            opened_at: now,
            used: 0,
        });
        if now.saturating_duration_since(bucket.opened_at) >= self.window {
            *bucket = Bucket {
                opened_at: now,
                used: 0,
            };
        }

        if bucket.used >= self.budget {
            return false;
        }
        bucket.used += 1;
        true
    }

    #[cfg(test)]
    async fn tracked_callers(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// Attaches a [`RequestId`] to the request and echoes it on the response.
///
/// A caller-supplied `x-request-id` is kept when it is non-empty and at most
/// 128 bytes; otherwise a v4 UUID is minted.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = caller_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Rejects user routes without an accepted bearer token.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if auth.allows(bearer_token(req.headers())) {
        return next.run(req).await;
    }
    reject(&req, "unauthorized", "missing or invalid bearer token")
}

/// Rejects callers that have spent their request budget for the window.
pub async fn enforce_rate_limit(
    State(limits): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = caller_key(&req);
    if limits.admit(&key, Instant::now()).await {
        return next.run(req).await;
    }
    tracing::debug!(caller = %key, "rate limit exceeded");
    reject(&req, "rate_limited", "rate limit exceeded")
}

fn reject(req: &Request, code: &str, message: &str) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    ApiError::new(request_id, code, message).into_response()
}

fn caller_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
}

fn caller_key(req: &Request) -> String {
    if let Some(user_id) = user_segment(req.uri().path()) {
        return format!("user:{user_id}");
    }
    bearer_token(req.headers()).map_or_else(
        || "anonymous".to_string(),
        |token| format!("token:{token}"),
    )
}

fn user_segment(path: &str) -> Option<&str> {
    path.strip_prefix(USER_ROUTE_PREFIX)?
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
