//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use convene_core::{CapacityPolicy, Policy};
use convene_shared::constants::{DEFAULT_HTTP_PORT, IMAGE_SIZE_CEILING, MAX_IMAGE_SIZE};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: none, the platform data directory is used.
    pub database_path: Option<PathBuf>,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Convene"`
    pub instance_name: String,

    /// Env: `CAPACITY_POLICY` (`unenforced` / `enforced`)
    /// Default: `unenforced`
    pub capacity_policy: CapacityPolicy,

    /// Env: `REVIEW_REQUIRES_CONFIRMATION` (true/false)
    /// Default: `true`
    pub review_requires_confirmation: bool,

    /// Largest accepted image, in bytes, at most 100 MiB.
    /// Env: `MAX_IMAGE_SIZE`
    /// Default: 10 MiB
    pub max_image_size: usize,

    /// Sustained requests per second per client IP.
    /// Env: `RATE_LIMIT_RPS`
    /// Default: `10`
    pub rate_limit_rps: f64,

    /// Burst size per client IP.
    /// Env: `RATE_LIMIT_BURST`
    /// Default: `30`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            instance_name: convene_shared::constants::APP_NAME.to_string(),
            capacity_policy: CapacityPolicy::Unenforced,
            review_requires_confirmation: true,
            max_image_size: MAX_IMAGE_SIZE,
            rate_limit_rps: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = lookup("CAPACITY_POLICY") {
            match val.parse::<CapacityPolicy>() {
                Ok(policy) => config.capacity_policy = policy,
                Err(e) => tracing::warn!(error = %e, "Invalid CAPACITY_POLICY, using default"),
            }
        }

        if let Some(val) = lookup("REVIEW_REQUIRES_CONFIRMATION") {
            config.review_requires_confirmation = val != "false" && val != "0";
        }

        if let Some(val) = lookup("MAX_IMAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if (1..=IMAGE_SIZE_CEILING).contains(&n) => config.max_image_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_IMAGE_SIZE, using default"),
            }
        }

        if let Some(val) = lookup("RATE_LIMIT_RPS") {
            match val.parse::<f64>() {
                Ok(n) if n > 0.0 => config.rate_limit_rps = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_RPS, using default"),
            }
        }

        if let Some(val) = lookup("RATE_LIMIT_BURST") {
            match val.parse::<f64>() {
                Ok(n) if n >= 1.0 => config.rate_limit_burst = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_BURST, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// The business rules handed to the engine.
    pub fn policy(&self) -> Policy {
        Policy {
            capacity: self.capacity_policy,
            review_requires_confirmation: self.review_requires_confirmation,
            max_image_size: self.max_image_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert!(config.database_path.is_none());
        assert_eq!(config.policy(), Policy::default());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/convene.db"),
            ("CAPACITY_POLICY", "enforced"),
            ("REVIEW_REQUIRES_CONFIRMATION", "false"),
            ("MAX_IMAGE_SIZE", "1024"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/convene.db")));

        let policy = config.policy();
        assert!(policy.capacity.is_enforced());
        assert!(!policy.review_requires_confirmation);
        assert_eq!(policy.max_image_size, 1024);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("CAPACITY_POLICY", "strict"),
            ("RATE_LIMIT_RPS", "-3"),
            ("MAX_IMAGE_SIZE", "18446744073709551615"),
        ]);
        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert_eq!(config.capacity_policy, CapacityPolicy::Unenforced);
        assert_eq!(config.rate_limit_rps, 10.0);
        assert_eq!(config.max_image_size, MAX_IMAGE_SIZE);
    }
}
