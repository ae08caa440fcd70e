//! Support for library configuration options

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;

/// Name of the environment variable that may hold the bearer token sent to the schedule server
pub const TOKEN_ENV_VAR: &str = "PLANNER_API_TOKEN";

/// Name of the environment variable the `print-month` binary reads the server URL from
pub const URL_ENV_VAR: &str = "PLANNER_API_URL";

/// Base URL of the schedule server. The `/api/schedule/...` paths are resolved against it.
/// Feel free to override it when initing this library.
pub static API_BASE_URL: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("http://127.0.0.1:5000".to_string())));

/// How long a request to the schedule server may take.
/// Feel free to override it when initing this library.
pub static REQUEST_TIMEOUT: Lazy<Arc<Mutex<Duration>>> = Lazy::new(|| Arc::new(Mutex::new(Duration::from_secs(10))));

/// Where the offline copy of the schedule is stored.
/// Feel free to override it when initing this library.
pub static CACHE_FILE: Lazy<Arc<Mutex<PathBuf>>> = Lazy::new(|| Arc::new(Mutex::new(PathBuf::from("planner_cache/schedule.json"))));

/// The current value of [`API_BASE_URL`]
pub fn api_base_url() -> String {
    API_BASE_URL.lock().map(|url| url.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
}

/// The current value of [`REQUEST_TIMEOUT`]
pub fn request_timeout() -> Duration {
    REQUEST_TIMEOUT.lock().map(|t| *t).unwrap_or_else(|poisoned| *poisoned.into_inner())
}

/// The current value of [`CACHE_FILE`]
pub fn cache_file() -> PathBuf {
    CACHE_FILE.lock().map(|p| p.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
}

/// The bearer token from the environment, if any
pub fn api_token() -> Option<String> {
    std::env::var(TOKEN_ENV_VAR).ok().and_then(|token| usable_token(&token))
}

/// Tokens that were stored as the strings "undefined" or "null" are no tokens at all
pub fn usable_token(token: &str) -> Option<String> {
    let token = token.trim();
    match token {
        "" | "undefined" | "null" => None,
        t => Some(t.to_string()),
    }
}



#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_tokens_are_ignored() {
        assert_eq!(usable_token("undefined"), None);
        assert_eq!(usable_token(" null "), None);
        assert_eq!(usable_token(""), None);
        assert_eq!(usable_token("abc.def"), Some("abc.def".to_string()));
    }

    #[test]
    fn defaults() {
        assert!(api_base_url().starts_with("http"));
        assert!(request_timeout() > Duration::from_secs(0));
        assert!(cache_file().ends_with("schedule.json"));
    }
}
