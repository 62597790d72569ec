//! Configuration management for the SoftEscrow client

use std::env;
use std::time::Duration;

use serde::Deserialize;

/// Production API endpoint
pub const DEFAULT_BASE_URL: &str = "https://portal.softescrow.com/api";

/// Parts in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Timeout in seconds for service calls, and for connecting when uploading parts
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            upload: UploadConfig {
                concurrency: DEFAULT_CONCURRENCY,
            },
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Read settings from `SOFTESCROW_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        Config {
            api: ApiConfig {
                base_url: lookup("SOFTESCROW_BASE_URL")
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or(defaults.api.base_url),
                api_key: lookup("SOFTESCROW_API_KEY").filter(|key| !key.is_empty()),
                timeout_secs: parse_or(
                    lookup("SOFTESCROW_TIMEOUT_SECS"),
                    "SOFTESCROW_TIMEOUT_SECS",
                    defaults.api.timeout_secs,
                ),
            },
            upload: UploadConfig {
                concurrency: parse_or(
                    lookup("SOFTESCROW_UPLOAD_CONCURRENCY"),
                    "SOFTESCROW_UPLOAD_CONCURRENCY",
                    defaults.upload.concurrency,
                )
                .max(1),
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value {:?} for {}, using default", raw, key);
            default
        }),
    }
}
