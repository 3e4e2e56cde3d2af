//! API configuration
//!
//! Loaded from environment variables; every setting has a default.

use std::path::PathBuf;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_ARCHIVES_DIR: &str = "./archives";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1080";

#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL
    pub redis_url: String,

    /// Directory holding finished archives
    pub archives_dir: PathBuf,

    /// Address the HTTP server listens on
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            archives_dir: PathBuf::from(DEFAULT_ARCHIVES_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// - REDIS_URL (default: redis://127.0.0.1:6379)
    /// - ARCHIVES_DIR (default: ./archives)
    /// - API_BIND_ADDR (default: 0.0.0.0:1080)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            redis_url: non_empty("REDIS_URL").unwrap_or(defaults.redis_url),
            archives_dir: non_empty("ARCHIVES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.archives_dir),
            bind_addr: non_empty("API_BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}
