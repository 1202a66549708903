use std::env;
use std::time::Duration;

/// Default cadence between scheduled sync ticks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Bonfire application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chat server
    pub server_url: String,
    /// Interval between scheduled sync ticks
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let server =
            env::var("BONFIRE_SERVER").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        // Normalize localhost to IPv4 to avoid IPv6 (::1) preference on macOS
        let server = if server.contains("localhost") {
            server.replacen("localhost", "127.0.0.1", 1)
        } else {
            server
        };
        let poll_ms = env::var("BONFIRE_POLL_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        Self {
            server_url: server,
            poll_interval: Duration::from_millis(poll_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}
