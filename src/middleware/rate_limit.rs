use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat};

use crate::{
    limiter::{EndpointClass, PolicyTable, RateLimitDecision, RateLimiter, now_ms},
    utils::{error_codes, error_to_api_response, verify_token},
};

#[derive(Clone)]
pub struct RateLimitContext {
    pub limiter: Arc<RateLimiter>,
    pub policies: PolicyTable,
    pub jwt_secret: String,
}

/// Classifies the route, derives the client identity, counts the request,
/// and translates exhaustion into a 429 with the rate-limit headers.
pub async fn rate_limit(
    State(ctx): State<Arc<RateLimitContext>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let class = EndpointClass::classify(req.method(), req.uri().path());
    let policy = ctx.policies.policy(class);
    let identity = client_identity(&req, &ctx.jwt_secret);

    // Each endpoint class gets its own window per identity.
    let key = format!("{}:{}", class.as_str(), identity);
    let decision = ctx.limiter.check(&key, policy).await;

    if !decision.allowed {
        let retry_after = decision.retry_after_secs(now_ms());
        tracing::warn!(
            "rate limit exceeded for {} on {} endpoints, retry in {}s",
            identity,
            class.as_str(),
            retry_after
        );
        return rejection_response(&decision, retry_after);
    }

    let mut response = next.run(req).await;
    apply_limit_headers(&mut response, &decision);
    response
}

fn rejection_response(decision: &RateLimitDecision, retry_after: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        error_to_api_response::<()>(
            error_codes::RATE_LIMIT,
            format!("Too many requests, please retry in {} seconds", retry_after),
        ),
    )
        .into_response();
    apply_limit_headers(&mut response, decision);
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

fn apply_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&reset_timestamp(decision.reset_at_ms)) {
        headers.insert("X-RateLimit-Reset", value);
    }
}

fn reset_timestamp(reset_at_ms: u64) -> String {
    DateTime::from_timestamp_millis(reset_at_ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Limiting key for the caller: the authenticated user id when a valid
/// bearer token is present, else the forwarded client address. A user id is
/// a better key than an IP, which over-throttles everyone behind one NAT.
fn client_identity(req: &Request<Body>, jwt_secret: &str) -> String {
    if let Some(user_id) = bearer_user_id(req, jwt_secret) {
        return format!("user:{}", user_id);
    }

    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

fn bearer_user_id(req: &Request<Body>, jwt_secret: &str) -> Option<String> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?
        .strip_prefix("Bearer ")?;
    // Invalid tokens fall through to the address key; auth enforcement
    // lives with the managed backend, not here.
    verify_token(token, jwt_secret).ok().map(|claims| claims.sub)
}
