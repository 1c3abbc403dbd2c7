//! Configuration for lockstep-sim

use lockstep_master::MasterConfig;
use serde::{Deserialize, Serialize};

/// Top-level simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Master orchestration settings
    #[serde(default)]
    pub master: MasterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Workload
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
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

/// Workload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of connected clients
    #[serde(default = "default_clients")]
    pub clients: usize,

    /// Total actions dispatched across all clients
    #[serde(default = "default_actions")]
    pub actions: usize,

    /// Actions dispatched between two deliveries. Values above 1 let clients
    /// race each other and exercise mismatch recovery.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// RNG seed; equal seeds replay equal runs
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(default = "default_resource_id")]
    pub resource_id: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clients: default_clients(),
            actions: default_actions(),
            batch_size: default_batch_size(),
            seed: default_seed(),
            resource_type: default_resource_type(),
            resource_id: default_resource_id(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_clients() -> usize {
    4
}

fn default_actions() -> usize {
    200
}

fn default_batch_size() -> usize {
    1
}

fn default_seed() -> u64 {
    7
}

fn default_resource_type() -> String {
    "counter".to_string()
}

fn default_resource_id() -> String {
    "sim".to_string()
}

impl SimConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `LOCKSTEP_*` environment variables (`__` separates nested keys, e.g.
    /// `LOCKSTEP_SIMULATION__BATCH_SIZE=4`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&SimConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LOCKSTEP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
