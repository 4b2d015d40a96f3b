//! The small HTTP surface each binary mounts alongside its bus-driven
//! services: a health check, rate-limited the same way external sinks
//! are, so a misbehaving prober can't starve the process.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use governor::{Quota, RateLimiter};
use tracing::warn;

type Limiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

#[derive(Clone)]
struct AppState {
    limiter: Arc<Limiter>,
}

/// Builds the router: `GET /healthz` returns `200 OK`, gated by a
/// token-bucket limiter of `requests_per_sec` requests/second shared
/// across every route.
pub fn router(requests_per_sec: u32) -> Router {
    let state = AppState {
        limiter: Arc::new(new_limiter(requests_per_sec)),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
}

fn new_limiter(requests_per_sec: u32) -> Limiter {
    let per_sec = NonZeroU32::new(requests_per_sec).unwrap_or_else(|| NonZeroU32::new(1).unwrap());
    RateLimiter::direct(Quota::per_second(per_sec))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn rate_limit(State(state): State<AppState>, request: axum::extract::Request, next: Next) -> Response {
    match state.limiter.check() {
        Ok(()) => next.run(request).await,
        Err(_) => {
            warn!("http rate limit exceeded, rejecting request");
            Response::builder().status(StatusCode::TOO_MANY_REQUESTS).body(axum::body::Body::empty()).expect("static response is well-formed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthz_handler_reports_ok() {
        assert_eq!(healthz().await, StatusCode::OK);
    }

    #[test]
    fn limiter_admits_up_to_its_quota_then_rejects() {
        let limiter = new_limiter(1);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
