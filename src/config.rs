//! Runtime configuration, read from the environment once at startup.

use std::str::FromStr;

use thiserror::Error;

use crate::service::auth::MIN_PASSWORD_LEN;

pub const DEFAULT_CONTROLLER_EMAIL: &str = "admin@oes.edu";

/// Controller password used when TEST_MODE is on and none is configured.
pub const TEST_CONTROLLER_PASSWORD: &str = "admin123";

const DEFAULT_MAX_UPLOAD_SIZE: u64 = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub controller: ControllerCredentials,
    pub log_format: LogFormat,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum decoded size of a single document in bytes
    pub max_upload_size: u64,
    /// Number of recent change events kept for `/changes` clients
    pub change_feed_capacity: usize,
}

/// Login for the single exam-controller account.
#[derive(Clone)]
pub struct ControllerCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for ControllerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
    /// Google Cloud structured logging
    Gcp,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "gcp" | "stackdriver" => Ok(LogFormat::Gcp),
            other => Err(ConfigError::ValidationError(format!(
                "LOG_FORMAT must be text, json or gcp (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// TCP port for inter-node cluster communication
    pub cluster_port: u16,
    pub discovery: DiscoveryConfig,
    pub election_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    /// Peer HTTP addresses (`host:port`) or bare hosts
    pub peers: Vec<String>,
}

impl ClusterConfig {
    /// Peers rewritten to their cluster port.
    pub fn peer_cluster_addresses(&self) -> Vec<String> {
        self.peers
            .iter()
            .map(|peer| {
                let host = peer.rsplit_once(':').map_or(peer.as_str(), |(host, _)| host);
                format!("{host}:{}", self.cluster_port)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// DNS name to resolve for peer discovery (e.g., a Kubernetes headless service).
    pub dns_name: Option<String>,
    /// How often to poll for peer changes (seconds)
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the local document backend
    pub local_storage_path: String,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dns_name: None,
            poll_interval_seconds: 5,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_port: 9993,
            discovery: DiscoveryConfig::default(),
            election_timeout_ms: 3000,
            heartbeat_interval_ms: 300,
            peers: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./documents".to_string(),
            gcs_bucket: None,
            gcs_credentials_file: None,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parsed variable, falling back to `default` when unset or unparsable.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Comma-separated peers without blanks or this node itself.
fn parse_peers(raw: &str, node_id: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| *s != node_id && !s.starts_with(&format!("{node_id}:")))
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());
        let test_mode = env_flag("TEST_MODE");

        let controller = ControllerCredentials {
            email: env_string("CONTROLLER_EMAIL", DEFAULT_CONTROLLER_EMAIL),
            password: std::env::var("CONTROLLER_PASSWORD").unwrap_or_else(|_| {
                if test_mode {
                    TEST_CONTROLLER_PASSWORD.to_string()
                } else {
                    String::new()
                }
            }),
        };

        let backend = match env_string("STORAGE_BACKEND", "local").to_lowercase().as_str() {
            "gcs" => StorageBackend::Gcs,
            _ => StorageBackend::Local,
        };

        let config = Config {
            cluster: ClusterConfig {
                cluster_port: env_parse("CLUSTER_PORT", 9993),
                peers: parse_peers(&env_string("PEERS", ""), &node_id),
                discovery: DiscoveryConfig {
                    dns_name: std::env::var("DISCOVERY_DNS_NAME").ok(),
                    poll_interval_seconds: env_parse("DISCOVERY_POLL_INTERVAL", 5),
                },
                ..Default::default()
            },
            node: NodeConfig {
                bind_address: env_string("BIND_ADDRESS", "0.0.0.0:8080"),
                data_dir: env_string("DATA_DIR", "./data"),
                id: node_id,
            },
            storage: StorageConfig {
                backend,
                local_storage_path: env_string("LOCAL_STORAGE_PATH", "./documents"),
                gcs_bucket: std::env::var("GCS_BUCKET").ok(),
                gcs_credentials_file: std::env::var("GCS_CREDENTIALS_FILE").ok(),
            },
            controller,
            log_format: env_string("LOG_FORMAT", "").parse()?,
            test_mode,
            max_upload_size: env_parse("MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE),
            change_feed_capacity: env_parse("CHANGE_FEED_CAPACITY", 1024),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.node.id.is_empty() {
            return invalid("NODE_ID cannot be empty");
        }
        if self.storage.backend == StorageBackend::Gcs && self.storage.gcs_bucket.is_none() {
            return invalid("GCS_BUCKET is required when STORAGE_BACKEND=gcs");
        }
        if self.controller.email.trim().is_empty() {
            return invalid("CONTROLLER_EMAIL cannot be empty");
        }
        if self.controller.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ConfigError::ValidationError(format!(
                "CONTROLLER_PASSWORD must be set and at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.max_upload_size == 0 {
            return invalid("MAX_UPLOAD_SIZE must be greater than zero");
        }

        let cluster_size = self.cluster.peers.len() + 1;
        if cluster_size > 1 && cluster_size.is_multiple_of(2) {
            tracing::warn!(
                cluster_size,
                "Even cluster size may lead to split-brain; consider an odd number of nodes"
            );
        }

        Ok(())
    }

    /// Check if running in single-node mode.
    pub fn is_single_node(&self) -> bool {
        self.cluster.peers.is_empty() && self.cluster.discovery.dns_name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            cluster: ClusterConfig::default(),
            node: NodeConfig {
                bind_address: "127.0.0.1:8080".into(),
                data_dir: "./data".into(),
                id: "node-1".into(),
            },
            storage: StorageConfig::default(),
            controller: ControllerCredentials {
                email: DEFAULT_CONTROLLER_EMAIL.into(),
                password: TEST_CONTROLLER_PASSWORD.into(),
            },
            log_format: LogFormat::Text,
            test_mode: true,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            change_feed_capacity: 1024,
        }
    }

    #[test]
    fn test_sample_is_valid_single_node() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert!(config.is_single_node());
    }

    #[test]
    fn test_rejects_weak_controller_password() {
        let mut config = sample();
        config.controller.password = "abc".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gcs_requires_bucket() {
        let mut config = sample();
        config.storage.backend = StorageBackend::Gcs;
        assert!(config.validate().is_err());
        config.storage.gcs_bucket = Some("oes-documents".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_peers_skips_self() {
        let peers = parse_peers(" node-1:8080, node-2:8080,,node-3 ,node-1", "node-1");
        assert_eq!(peers, vec!["node-2:8080", "node-3"]);
    }

    #[test]
    fn test_peer_cluster_addresses() {
        let cluster = ClusterConfig {
            peers: vec!["node-2:8080".into(), "node-3".into()],
            ..ClusterConfig::default()
        };
        assert_eq!(
            cluster.peer_cluster_addresses(),
            vec!["node-2:9993", "node-3:9993"]
        );
        assert!(!Config {
            cluster,
            ..sample()
        }
        .is_single_node());
    }

    #[test]
    fn test_log_format() {
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("gcp".parse::<LogFormat>().unwrap(), LogFormat::Gcp);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
