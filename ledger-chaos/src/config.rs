//! Configuration loading for ledger-chaos.
//!
//! Harness settings come from a TOML file (default: `harness.toml`). The
//! service endpoint comes either from `endpoint.address` directly or from a
//! JSON endpoints file mapping instance ids to `{ "ip": ..., "port": ... }`.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ledger_client::{ClientConfig, ConnectPolicy, TcpTransportConfig};

use crate::workload::WorkloadParams;

/// Root configuration for ledger-chaos.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Where the ledger service listens.
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Workload shape.
    #[serde(default)]
    pub workload: WorkloadParams,
    /// Chaos injector configuration.
    #[serde(default)]
    pub chaos: ChaosConfig,
    /// RPC client tuning.
    #[serde(default)]
    pub client: ClientSettings,
}

/// Endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Explicit `ip:port`. Takes precedence over the endpoints file.
    pub address: Option<String>,
    /// JSON endpoints file (default: `config.json`).
    #[serde(default = "default_endpoints_file")]
    pub endpoints_file: PathBuf,
    /// Instance id to look up in the endpoints file (default: `1`).
    #[serde(default = "default_instance")]
    pub instance: String,
}

/// How the service process is started and killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaosBackend {
    /// External start script and kill command.
    Script,
    /// Docker container start/kill.
    Docker,
}

/// Chaos injector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChaosConfig {
    /// Process control backend (default: script).
    #[serde(default = "default_backend")]
    pub backend: ChaosBackend,
    /// Start command; must print the service pid (default: `test/server_start.sh`).
    #[serde(default = "default_start_command")]
    pub start_command: Vec<String>,
    /// Kill command; the pid is appended (default: `kill`).
    #[serde(default = "default_kill_command")]
    pub kill_command: Vec<String>,
    /// Container name for the docker backend.
    pub container: Option<String>,
    /// How long the service runs before it is killed (default: 2000).
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
}

/// RPC client tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Pause after a failed RPC (default: 500).
    #[serde(default = "default_failure_delay_ms")]
    pub failure_delay_ms: u64,
    /// First wait between failed dials (default: 10).
    #[serde(default = "default_connect_initial_delay_ms")]
    pub connect_initial_delay_ms: u64,
    /// Upper bound of the dial backoff (default: 1000).
    #[serde(default = "default_connect_max_delay_ms")]
    pub connect_max_delay_ms: u64,
    /// Random extra wait per dial retry (default: 10).
    #[serde(default = "default_connect_jitter_ms")]
    pub connect_jitter_ms: u64,
    /// Per-dial timeout; unset leaves it to the OS.
    pub connect_timeout_ms: Option<u64>,
}

// Default value functions
fn default_endpoints_file() -> PathBuf {
    PathBuf::from("config.json")
}

fn default_instance() -> String {
    "1".to_string()
}

fn default_backend() -> ChaosBackend {
    ChaosBackend::Script
}

fn default_start_command() -> Vec<String> {
    vec!["test/server_start.sh".to_string()]
}

fn default_kill_command() -> Vec<String> {
    vec!["kill".to_string()]
}

fn default_dwell_ms() -> u64 {
    2000
}

fn default_failure_delay_ms() -> u64 {
    500
}

fn default_connect_initial_delay_ms() -> u64 {
    10
}

fn default_connect_max_delay_ms() -> u64 {
    1000
}

fn default_connect_jitter_ms() -> u64 {
    10
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address: None,
            endpoints_file: default_endpoints_file(),
            instance: default_instance(),
        }
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            start_command: default_start_command(),
            kill_command: default_kill_command(),
            container: None,
            dwell_ms: default_dwell_ms(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            failure_delay_ms: default_failure_delay_ms(),
            connect_initial_delay_ms: default_connect_initial_delay_ms(),
            connect_max_delay_ms: default_connect_max_delay_ms(),
            connect_jitter_ms: default_connect_jitter_ms(),
            connect_timeout_ms: None,
        }
    }
}

impl ChaosConfig {
    /// Dwell window as a duration.
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

impl ClientSettings {
    /// Facade configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            failure_delay: Duration::from_millis(self.failure_delay_ms),
            connect: ConnectPolicy {
                initial_delay: Duration::from_millis(self.connect_initial_delay_ms),
                max_delay: Duration::from_millis(self.connect_max_delay_ms),
                jitter: Duration::from_millis(self.connect_jitter_ms),
            },
        }
    }

    /// Transport configuration.
    pub fn transport_config(&self) -> TcpTransportConfig {
        TcpTransportConfig {
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reject settings the harness cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let workload = &self.workload;
        if workload.accounts == 0 {
            return Err(ConfigError::Invalid("workload.accounts must be at least 1".into()));
        }
        if workload.initial_balance < 0 {
            return Err(ConfigError::Invalid(
                "workload.initial_balance must not be negative".into(),
            ));
        }
        if workload.max_amount < 1 {
            return Err(ConfigError::Invalid("workload.max_amount must be at least 1".into()));
        }
        if workload.progress_every == 0 {
            return Err(ConfigError::Invalid(
                "workload.progress_every must be at least 1".into(),
            ));
        }
        match self.chaos.backend {
            ChaosBackend::Script => {
                if self.chaos.start_command.is_empty() || self.chaos.kill_command.is_empty() {
                    return Err(ConfigError::Invalid(
                        "chaos.start_command and chaos.kill_command must not be empty".into(),
                    ));
                }
            }
            ChaosBackend::Docker => {
                if self.chaos.container.is_none() {
                    return Err(ConfigError::Invalid(
                        "chaos.container is required for the docker backend".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Resolve the service address, reading the endpoints file if needed.
    pub fn resolve_address(&self) -> Result<String, ConfigError> {
        if let Some(address) = &self.endpoint.address {
            return Ok(address.clone());
        }
        EndpointMap::from_file(&self.endpoint.endpoints_file)?.address(&self.endpoint.instance)
    }
}

/// Port as written in the endpoints file: `"50051"` or `50051`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Port {
    Number(u16),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
struct EndpointEntry {
    ip: String,
    port: Port,
}

/// Instance id → endpoint mapping.
#[derive(Debug, Clone)]
pub struct EndpointMap {
    path: PathBuf,
    entries: HashMap<String, EndpointEntry>,
}

impl EndpointMap {
    /// Load an endpoints file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(path, &content)
    }

    fn from_json(path: &Path, content: &str) -> Result<Self, ConfigError> {
        // Other top-level keys (e.g. "nservers") are not endpoints.
        let raw: HashMap<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|e| ConfigError::EndpointParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut entries = HashMap::new();
        for (instance, value) in raw {
            if !value.is_object() {
                continue;
            }
            let entry: EndpointEntry =
                serde_json::from_value(value).map_err(|e| ConfigError::EndpointParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            entries.insert(instance, entry);
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// `ip:port` of `instance`.
    pub fn address(&self, instance: &str) -> Result<String, ConfigError> {
        let entry = self
            .entries
            .get(instance)
            .ok_or_else(|| ConfigError::UnknownInstance {
                instance: instance.to_string(),
                path: self.path.clone(),
            })?;
        let port = match &entry.port {
            Port::Number(n) => n.to_string(),
            Port::Text(s) => s.clone(),
        };
        Ok(format!("{}:{}", entry.ip, port))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to parse the endpoints file.
    #[error("failed to parse endpoints file {path}: {source}")]
    EndpointParseError {
        /// Path to the endpoints file.
        path: PathBuf,
        /// Underlying JSON parse error.
        source: serde_json::Error,
    },
    /// Instance id missing from the endpoints file.
    #[error("instance {instance} not found in {path}")]
    UnknownInstance {
        /// Requested instance id.
        instance: String,
        /// Path to the endpoints file.
        path: PathBuf,
    },
    /// A setting is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
