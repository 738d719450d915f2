//! Configuration for registrationd

use registration_policy::AdminConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Password policy administration
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Token issuing
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            enable_cors: true,
        }
    }
}

/// Storage configuration, shared by users and policy parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Password policy administration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Deadline for one admin request in milliseconds
    #[serde(default = "default_policy_timeout")]
    pub request_timeout_ms: u64,

    /// Retry an unavailable store once
    #[serde(default = "default_true")]
    pub retry_unavailable: bool,

    /// Insert defaults for missing keys at start-up
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_policy_timeout(),
            retry_unavailable: true,
            seed_defaults: true,
        }
    }
}

impl PolicyConfig {
    pub fn admin_config(&self) -> AdminConfig {
        AdminConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry_unavailable: self.retry_unavailable,
        }
    }
}

/// Token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for HS256 tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_policy_timeout() -> u64 {
    5_000
}

fn default_jwt_secret() -> String {
    "development-secret-change-me".to_string()
}

fn default_token_ttl() -> u64 {
    3_600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables, e.g. REGISTRATION_AUTH__JWT_SECRET
        builder = builder.add_source(
            config::Environment::with_prefix("REGISTRATION")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert!(config.policy.seed_defaults);
        assert_eq!(config.auth.token_ttl_secs, 3_600);
    }

    #[test]
    fn test_policy_admin_config() {
        let config = PolicyConfig {
            request_timeout_ms: 250,
            retry_unavailable: false,
            seed_defaults: true,
        };
        let admin = config.admin_config();
        assert_eq!(admin.request_timeout, Duration::from_millis(250));
        assert!(!admin.retry_unavailable);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.server.enable_cors);
    }

    #[test]
    fn test_storage_config_is_tagged() {
        let json = serde_json::json!({
            "type": "postgres",
            "url": "postgres://localhost/registration"
        });
        let storage: StorageConfig = serde_json::from_value(json).unwrap();
        match storage {
            StorageConfig::Postgres {
                max_connections,
                connect_timeout_secs,
                ..
            } => {
                assert_eq!(max_connections, 10);
                assert_eq!(connect_timeout_secs, 5);
            }
            StorageConfig::Memory => panic!("expected postgres storage"),
        }
    }
}
