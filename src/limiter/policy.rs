use std::env;
use std::time::Duration;

use axum::http::Method;

use super::RateLimitPolicy;

/// Route classification used to pick a limit policy. The limiter itself is
/// policy-agnostic; the middleware classifies and selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Session/credential endpoints proxied to the managed auth backend.
    Auth,
    /// Fallback for anything that is neither a plain read nor a write.
    Api,
    Read,
    Write,
    /// Abuse-prone operations such as contact-form submission.
    Sensitive,
}

impl EndpointClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Auth => "auth",
            EndpointClass::Api => "api",
            EndpointClass::Read => "read",
            EndpointClass::Write => "write",
            EndpointClass::Sensitive => "sensitive",
        }
    }

    pub fn classify(method: &Method, path: &str) -> Self {
        if path.contains("/auth/") || path.ends_with("/auth") {
            return EndpointClass::Auth;
        }
        if path.ends_with("/contact") {
            return EndpointClass::Sensitive;
        }
        match *method {
            Method::GET | Method::HEAD => EndpointClass::Read,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE => EndpointClass::Write,
            _ => EndpointClass::Api,
        }
    }
}

/// Per-class limit policies, overridable from the environment
/// (`RATE_LIMIT_<CLASS>_REQUESTS` / `RATE_LIMIT_<CLASS>_WINDOW_SECS`).
#[derive(Debug, Clone, Copy)]
pub struct PolicyTable {
    pub auth: RateLimitPolicy,
    pub api: RateLimitPolicy,
    pub read: RateLimitPolicy,
    pub write: RateLimitPolicy,
    pub sensitive: RateLimitPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            auth: policy(5, 900),
            api: policy(60, 60),
            read: policy(120, 60),
            write: policy(30, 60),
            sensitive: policy(3, 60),
        }
    }
}

fn policy(max_requests: u32, window_secs: u64) -> RateLimitPolicy {
    RateLimitPolicy {
        max_requests,
        window: Duration::from_secs(window_secs),
    }
}

fn policy_from_env(class: &str, default: RateLimitPolicy) -> RateLimitPolicy {
    let max_requests = env::var(format!("RATE_LIMIT_{}_REQUESTS", class))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default.max_requests);
    let window_secs = env::var(format!("RATE_LIMIT_{}_WINDOW_SECS", class))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default.window.as_secs());
    policy(max_requests, window_secs)
}

impl PolicyTable {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            auth: policy_from_env("AUTH", defaults.auth),
            api: policy_from_env("API", defaults.api),
            read: policy_from_env("READ", defaults.read),
            write: policy_from_env("WRITE", defaults.write),
            sensitive: policy_from_env("SENSITIVE", defaults.sensitive),
        }
    }

    pub fn policy(&self, class: EndpointClass) -> &RateLimitPolicy {
        match class {
            EndpointClass::Auth => &self.auth,
            EndpointClass::Api => &self.api,
            EndpointClass::Read => &self.read,
            EndpointClass::Write => &self.write,
            EndpointClass::Sensitive => &self.sensitive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_path_then_method() {
        assert_eq!(
            EndpointClass::classify(&Method::POST, "/api/auth/login"),
            EndpointClass::Auth
        );
        assert_eq!(
            EndpointClass::classify(&Method::POST, "/api/contact"),
            EndpointClass::Sensitive
        );
        assert_eq!(
            EndpointClass::classify(&Method::GET, "/api/listings"),
            EndpointClass::Read
        );
        assert_eq!(
            EndpointClass::classify(&Method::POST, "/api/listings"),
            EndpointClass::Write
        );
        assert_eq!(
            EndpointClass::classify(&Method::OPTIONS, "/api/listings"),
            EndpointClass::Api
        );
    }

    #[test]
    fn defaults_keep_sensitive_strictest() {
        let table = PolicyTable::default();
        assert_eq!(table.sensitive.max_requests, 3);
        assert_eq!(table.auth.max_requests, 5);
        assert_eq!(table.auth.window, Duration::from_secs(900));
        assert!(table.read.max_requests > table.write.max_requests);
    }

    #[test]
    fn env_overrides_parse_and_bad_values_fall_back() {
        // Env vars are process-global; this is the only test touching the
        // RATE_LIMIT_* names, and it restores them before returning.
        unsafe {
            env::set_var("RATE_LIMIT_WRITE_REQUESTS", "7");
            env::set_var("RATE_LIMIT_WRITE_WINDOW_SECS", "120");
            env::set_var("RATE_LIMIT_SENSITIVE_REQUESTS", "not-a-number");
        }

        let table = PolicyTable::from_env();

        unsafe {
            env::remove_var("RATE_LIMIT_WRITE_REQUESTS");
            env::remove_var("RATE_LIMIT_WRITE_WINDOW_SECS");
            env::remove_var("RATE_LIMIT_SENSITIVE_REQUESTS");
        }

        let defaults = PolicyTable::default();
        assert_eq!(table.write.max_requests, 7);
        assert_eq!(table.write.window, Duration::from_secs(120));
        // Unparsable override keeps the default.
        assert_eq!(
            table.sensitive.max_requests,
            defaults.sensitive.max_requests
        );
        // Untouched classes keep their defaults wholesale.
        assert_eq!(table.auth.max_requests, defaults.auth.max_requests);
        assert_eq!(table.read.window, defaults.read.window);
    }

    #[test]
    fn table_lookup_matches_class() {
        let table = PolicyTable::default();
        assert_eq!(
            table.policy(EndpointClass::Sensitive).max_requests,
            table.sensitive.max_requests
        );
        assert_eq!(
            table.policy(EndpointClass::Read).window,
            table.read.window
        );
    }
}
