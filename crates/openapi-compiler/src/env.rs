//! Runtime environment contract for generated servers.
//!
//! Generated servers read `API_BASE_URL`, `API_HEADERS` and the per-scheme credential variables
//! from [`crate::security::env_names_for`]. Lookups go through [`EnvSource`] so the same code
//! works against the process environment and against fixtures.

use std::collections::HashMap;

pub const API_BASE_URL: &str = "API_BASE_URL";
/// Comma-separated `key:value` pairs sent with every request.
pub const API_HEADERS: &str = "API_HEADERS";

pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    pub base_url: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RuntimeEnv {
    #[must_use]
    pub fn from_source(env: &dyn EnvSource) -> Self {
        let base_url = env
            .var(API_BASE_URL)
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        if base_url.is_none() {
            tracing::warn!("{API_BASE_URL} is not set; requests will use relative paths");
        }

        let headers = env
            .var(API_HEADERS)
            .map(|raw| parse_api_headers(&raw))
            .unwrap_or_default();

        Self { base_url, headers }
    }
}

/// Parse `API_HEADERS` (`"X-A:1, X-B: two"`).
///
/// Entries without a `:` or with an empty key are skipped. Values may themselves contain `:`.
#[must_use]
pub fn parse_api_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let Some((key, value)) = entry.split_once(':') else {
                tracing::warn!(entry = %entry, "ignoring malformed {API_HEADERS} entry (expected key:value)");
                return None;
            };
            let key = key.trim();
            if key.is_empty() {
                tracing::warn!(entry = %entry, "ignoring {API_HEADERS} entry with empty key");
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
