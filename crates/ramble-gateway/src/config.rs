//! Gateway configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("RAMBLE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            timeout_secs: env::var("RAMBLE_API_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}
