/*!
 * # Rate Limiting
 *
 * In-process sliding-window limiter guarding the create endpoints. Each key
 * (an authenticated profile, or the client IP for anonymous callers) keeps the
 * instants of its recent requests; a request is admitted while fewer than
 * `requests_per_window` of them fall inside the trailing window.
 *
 * Rejected requests get `429 Too Many Requests` with `Retry-After` and the
 * usual `X-RateLimit-*` headers.
 */

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use metrics::counter;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::errors::ServiceError;

fn num_to_header_value<T: ToString>(n: T) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 30,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        }
    }
}

impl From<&AppConfig> for RateLimitConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            requests_per_window: cfg.rate_limit_requests_per_window,
            window_duration: Duration::from_secs(cfg.rate_limit_window_seconds),
            enable_headers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the oldest request in the window expires
    pub reset_time: Duration,
}

#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, VecDeque<Instant>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn check_rate_limit(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let limit = self.config.requests_per_window;
        let window = self.config.window_duration;

        let mut hits = self.entries.entry(key.to_string()).or_default();
        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) >= window {
                hits.pop_front();
            } else {
                break;
            }
        }

        let reset_after = |hits: &VecDeque<Instant>| {
            hits.front()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(window)
        };

        if hits.len() >= limit as usize {
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                reset_time: reset_after(&*hits),
            };
        }

        hits.push_back(now);
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(hits.len() as u32),
            reset_time: reset_after(&*hits),
        }
    }

    pub fn get_remaining_quota(&self, key: &str) -> u32 {
        let now = Instant::now();
        let used = self
            .entries
            .get(key)
            .map(|hits| {
                hits.iter()
                    .filter(|at| now.saturating_duration_since(**at) < self.config.window_duration)
                    .count()
            })
            .unwrap_or(0);
        self.config.requests_per_window.saturating_sub(used as u32)
    }

    pub fn reset(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drops keys whose every request has left the window
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let window = self.config.window_duration;
        self.entries.retain(|_, hits| {
            hits.back()
                .map_or(false, |latest| now.saturating_duration_since(*latest) < window)
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

pub async fn start_cleanup_task(rate_limiter: RateLimiter, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        rate_limiter.cleanup_expired();
        debug!(keys = rate_limiter.tracked_keys(), "rate limiter cleanup");
    }
}

pub fn extract_ip_key(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                return format!("ip:{}", ip.trim());
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return format!("ip:{}", ip_str.trim());
        }
    }

    "ip:unknown".to_string()
}

/// Authenticated profile set by the auth layer, if it ran first
pub fn extract_user_key(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<AuthUser>()
        .map(|user| format!("user:{}", user.profile_id))
}

fn apply_headers(response: &mut Response, result: &RateLimitResult) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", num_to_header_value(result.limit));
    headers.insert(
        "X-RateLimit-Remaining",
        num_to_header_value(result.remaining),
    );
    headers.insert(
        "X-RateLimit-Reset",
        num_to_header_value(result.reset_time.as_secs()),
    );
}

/// Layer with `axum::middleware::from_fn_with_state(limiter, rate_limit_middleware)`.
/// Place it inside the auth layer so requests are keyed by profile.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = extract_user_key(&request).unwrap_or_else(|| extract_ip_key(&request));
    let result = limiter.check_rate_limit(&key);

    if !result.allowed {
        warn!(key = %key, path = %request.uri().path(), "rate limit exceeded");
        counter!("labdesk.rate_limit.rejected", 1);

        let retry_after = result.reset_time.as_secs().max(1);
        let mut response = ServiceError::RateLimitExceeded.into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, num_to_header_value(retry_after));
        if limiter.config.enable_headers {
            apply_headers(&mut response, &result);
        }
        return response;
    }

    let mut response = next.run(request).await;
    if limiter.config.enable_headers {
        apply_headers(&mut response, &result);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body, http::StatusCode, middleware::from_fn_with_state, routing::post, Router,
    };
    use tower::ServiceExt;

    fn limiter(limit: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_window: limit,
            window_duration: Duration::from_secs(window_secs),
            enable_headers: true,
        })
    }

    #[test]
    fn admits_up_to_the_limit() {
        let limiter = limiter(2, 60);
        assert!(limiter.check_rate_limit("user:a").allowed);
        let second = limiter.check_rate_limit("user:a");
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert!(!limiter.check_rate_limit("user:a").allowed);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1, 60);
        assert!(limiter.check_rate_limit("key1").allowed);
        assert!(limiter.check_rate_limit("key2").allowed);
        assert!(!limiter.check_rate_limit("key1").allowed);
        assert!(!limiter.check_rate_limit("key2").allowed);
    }

    #[test]
    fn window_slides_past_old_requests() {
        let limiter = limiter(2, 10);
        let start = Instant::now();
        assert!(limiter.check_at("k", start).allowed);
        assert!(limiter.check_at("k", start + Duration::from_secs(4)).allowed);
        assert!(!limiter.check_at("k", start + Duration::from_secs(9)).allowed);

        // the first hit has left the window, the second has not
        let later = limiter.check_at("k", start + Duration::from_secs(10));
        assert!(later.allowed);
        assert_eq!(later.remaining, 0);
        assert!(!limiter.check_at("k", start + Duration::from_secs(11)).allowed);
    }

    #[test]
    fn rejection_reports_time_until_oldest_expires() {
        let limiter = limiter(1, 30);
        let start = Instant::now();
        limiter.check_at("k", start);
        let denied = limiter.check_at("k", start + Duration::from_secs(10));
        assert!(!denied.allowed);
        assert_eq!(denied.reset_time, Duration::from_secs(20));
    }

    #[test]
    fn quota_and_reset() {
        let limiter = limiter(5, 60);
        assert_eq!(limiter.get_remaining_quota("k"), 5);
        limiter.check_rate_limit("k");
        assert_eq!(limiter.get_remaining_quota("k"), 4);
        limiter.reset("k");
        assert_eq!(limiter.get_remaining_quota("k"), 5);
    }

    #[test]
    fn cleanup_keeps_active_keys() {
        let limiter = limiter(5, 60);
        limiter.check_rate_limit("active");
        limiter.cleanup_expired();
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn middleware_returns_429_with_retry_after() {
        let limiter = limiter(1, 60);
        let app = Router::new()
            .route("/things", post(|| async { StatusCode::CREATED }))
            .layer(from_fn_with_state(limiter, rate_limit_middleware));

        let request = || {
            Request::builder()
                .method("POST")
                .uri("/things")
                .header("x-forwarded-for", "10.0.0.7, 10.0.0.1")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(first.headers()["X-RateLimit-Remaining"], "0");

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
    }
}
