//! Client configuration.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (OUTCALL_BASE_URL, OUTCALL_WS_URL,
//!    OUTCALL_GREETING)
//! 2. Values set programmatically on the struct
//! 3. Defaults (http://localhost:8000 and the stock greeting line)
//!
//! The client is in-memory only; there is no config file.

use serde::Deserialize;

/// Default backend origin for local development
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Fixed line used by the standalone greeting playback
pub const DEFAULT_GREETING: &str =
    "Hello, I am your AI debt collection agent. How can I help you today?";

/// Settings shared by the controller and the test harness
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8000`
    pub base_url: String,

    /// Channel origin when it differs from `base_url`; derived from
    /// `base_url` by scheme mapping when unset
    pub ws_base: Option<String>,

    /// Text synthesized by `play_greeting`
    pub greeting: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_base: None,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl ClientConfig {
    /// Build a config with the given backend origin
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_trailing_slash(base_url.into()),
            ws_base: None,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }

    /// Defaults overridden by environment variables where set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("OUTCALL_BASE_URL") {
            if !url.is_empty() {
                config.base_url = trim_trailing_slash(url);
            }
        }
        if let Ok(ws) = std::env::var("OUTCALL_WS_URL") {
            if !ws.is_empty() {
                config.ws_base = Some(trim_trailing_slash(ws));
            }
        }
        if let Ok(greeting) = std::env::var("OUTCALL_GREETING") {
            if !greeting.is_empty() {
                config.greeting = greeting;
            }
        }
        config
    }

    /// Full URL for an API endpoint path, e.g. `/api/call`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Channel URL for a call, mapping the http(s) scheme to ws(s)
    pub fn ws_url(&self, call_id: &str) -> String {
        if let Some(ws_base) = &self.ws_base {
            return format!("{ws_base}/ws/call/{call_id}");
        }
        let origin = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{origin}/ws/call/{call_id}")
    }
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
