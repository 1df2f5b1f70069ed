use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::warn;

/// Backoff schedule for a single retried operation.
///
/// The delay before retry `n` (0-based) is
/// `initial_delay * backoff_multiplier^n`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryOptions {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let raw = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Errors worth retrying: likely to succeed on a later attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Runs `f`, retrying failures accepted by `should_retry` with exponential
/// backoff. The first success wins; a rejected or exhausted failure is
/// returned unwrapped so callers can keep inspecting the original error.
/// Each retry is logged at `warn`; callers needing their own observability
/// hook use [`retry_with_backoff_observed`].
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    f: F,
    opts: &RetryOptions,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    retry_with_backoff_observed(f, opts, should_retry, |attempt, err: &E| {
        warn!(
            "attempt {} failed, retrying in {}ms: {}",
            attempt,
            opts.delay_for_attempt(attempt - 1).as_millis(),
            err
        );
    })
    .await
}

/// [`retry_with_backoff`] with an explicit `on_retry` hook, invoked with the
/// 1-based number of the attempt that just failed before each sleep.
pub async fn retry_with_backoff_observed<T, E, F, Fut, P, H>(
    mut f: F,
    opts: &RetryOptions,
    should_retry: P,
    mut on_retry: H,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    H: FnMut(u32, &E),
{
    let mut attempt: u32 = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= opts.max_retries || !should_retry(&err) {
                    return Err(err);
                }
                on_retry(attempt + 1, &err);
                tokio::time::sleep(opts.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// `retry_with_backoff` with the error type's own transience test.
pub async fn retry_transient<T, E, F, Fut>(f: F, opts: &RetryOptions) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + fmt::Display,
{
    retry_with_backoff(f, opts, |err: &E| err.is_transient()).await
}

/// Wraps an async operation into a reusable retry-enabled callable, so one
/// configuration can be shared across call sites.
pub fn with_retry<T, E, F, Fut>(f: F, opts: RetryOptions) -> impl AsyncFn() -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + fmt::Display,
{
    async move || retry_with_backoff(&f, &opts, |err: &E| err.is_transient()).await
}

#[derive(Debug)]
pub enum FetchError {
    /// The request never produced a response (connect/timeout/body errors).
    Network(reqwest::Error),
    /// The upstream answered with a non-2xx status.
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
    /// The response arrived but its payload did not parse.
    Decode(String),
}

impl FetchError {
    pub fn decode(err: impl fmt::Display) -> Self {
        FetchError::Decode(err.to_string())
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(err) => write!(f, "network error: {}", err),
            FetchError::Status { status, url, .. } => {
                write!(f, "upstream returned {} for {}", status, url)
            }
            FetchError::Decode(msg) => write!(f, "failed to decode upstream response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Decode(_) => false,
        }
    }
}

/// HTTP fetch with retries on transient failures (network errors, 5xx, 429).
/// Other non-2xx statuses surface immediately with the response body attached.
/// `build` must produce a fresh request per attempt.
pub async fn fetch_with_retry<F>(
    build: F,
    opts: &RetryOptions,
) -> Result<reqwest::Response, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    retry_transient(
        || async {
            let response = build().send().await.map_err(FetchError::Network)?;
            if response.status().is_success() {
                Ok(response)
            } else {
                let status = response.status();
                let url = response.url().to_string();
                let body = response.text().await.unwrap_or_default();
                Err(FetchError::Status { status, url, body })
            }
        },
        opts,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_opts(max_retries: u32) -> RetryOptions {
        RetryOptions {
            max_retries,
            initial_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(40),
        }
    }

    fn status_error(status: u16) -> FetchError {
        FetchError::Status {
            status: StatusCode::from_u16(status).unwrap(),
            url: "http://upstream.test/resource".into(),
            body: String::new(),
        }
    }

    #[test]
    fn backoff_sequence_is_capped_geometric() {
        let opts = RetryOptions {
            max_retries: 5,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(8000),
        };

        let delays: Vec<u64> = (0..5)
            .map(|n| opts.delay_for_attempt(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 8000]);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, FetchError> = retry_transient(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(status_error(500)) } else { Ok("ok") }
            },
            &fast_opts(2),
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> = retry_transient(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(404))
            },
            &fast_opts(3),
        )
        .await;

        assert_eq!(result.unwrap_err().status().unwrap().as_u16(), 404);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_original_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> = retry_transient(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(503))
            },
            &fast_opts(2),
        )
        .await;

        // 1 initial attempt + 2 retries, and the last 503 comes back as-is.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().status().unwrap().as_u16(), 503);
    }

    #[tokio::test]
    async fn custom_predicate_overrides_transience() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> = retry_with_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(500))
            },
            &fast_opts(3),
            |_| false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn on_retry_hook_sees_each_failed_attempt() {
        let calls = AtomicU32::new(0);
        let mut seen: Vec<u32> = Vec::new();

        let result: Result<(), FetchError> = retry_with_backoff_observed(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(503))
            },
            &fast_opts(2),
            |err: &FetchError| err.is_transient(),
            |attempt, err| {
                assert_eq!(err.status().unwrap().as_u16(), 503);
                seen.push(attempt);
            },
        )
        .await;

        assert!(result.is_err());
        // Called once per retried failure; the final failure is returned,
        // not reported to the hook.
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wrapped_callable_is_reusable() {
        let calls = AtomicU32::new(0);
        let op = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 0 { Err(status_error(502)) } else { Ok(n) }
            },
            fast_opts(1),
        );

        // Each invocation fails once, retries, then succeeds.
        assert_eq!(op().await.unwrap(), 1);
        assert_eq!(op().await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn transience_classification() {
        assert!(status_error(500).is_transient());
        assert!(status_error(503).is_transient());
        assert!(status_error(429).is_transient());
        assert!(!status_error(404).is_transient());
        assert!(!status_error(400).is_transient());
        assert!(!FetchError::decode("bad json").is_transient());
    }
}
