//! Layered service configuration.
//!
//! The default configuration is embedded at compile time from
//! `config/default.toml`. A file named by `--config` or by the
//! `SAFE_ROUTE_CONFIG` environment variable replaces it; any section or key
//! the file omits keeps its built-in default.

use std::path::{Path, PathBuf};

use safe_route_classifier::ClassifierConfig;
use safe_route_crowd::CrowdConfig;
use safe_route_fusion::{ChannelWeights, DecisionConfig};
use safe_route_routing::PenaltyPolicy;
use safe_route_sensor::SensorConfig;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SAFE_ROUTE_CONFIG";

/// The embedded default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config is not valid TOML for this layout.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Channel weights are malformed or do not sum to 1.0.
    #[error("Invalid channel weights: {message}")]
    InvalidWeights {
        /// What was wrong.
        message: String,
    },
}

fn default_graph_dir() -> PathBuf {
    PathBuf::from("data/graphs")
}

fn default_area() -> String {
    "guwahati".to_string()
}

const fn default_graph_timeout_ms() -> u64 {
    10_000
}

/// Routing section of the service configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// How multiple reports on one edge combine.
    pub penalty: PenaltyPolicy,
    /// Directory holding `<area>.json` road graphs.
    #[serde(default = "default_graph_dir")]
    pub graph_dir: PathBuf,
    /// Area used when a request names none.
    #[serde(default = "default_area")]
    pub default_area: String,
    /// Upper bound on loading one area's graph.
    #[serde(default = "default_graph_timeout_ms")]
    pub graph_timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            penalty: PenaltyPolicy::default(),
            graph_dir: default_graph_dir(),
            default_area: default_area(),
            graph_timeout_ms: default_graph_timeout_ms(),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SafeRouteConfig {
    /// Fusion blend weights.
    pub weights: ChannelWeights,
    /// Classifier gate settings.
    pub classifier: ClassifierConfig,
    /// Crowd report log settings.
    pub crowd: CrowdConfig,
    /// Sensor thresholds, feed, and stations.
    pub sensors: SensorConfig,
    /// Road graph location and penalty policy.
    pub routing: RoutingConfig,
    /// Decision proposal queue settings.
    pub decisions: DecisionConfig,
}

impl SafeRouteConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is malformed or the weights
    /// are invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded file is invalid.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Resolves the active configuration.
    ///
    /// `path` wins, then [`CONFIG_ENV`], then the embedded default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chosen source is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            log::info!("Loading config from {}", path.display());
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => {
                let path = PathBuf::from(path);
                log::info!("Loading config from {CONFIG_ENV}={}", path.display());
                Self::from_file(&path)
            }
            _ => {
                log::debug!("Using embedded default config");
                Self::embedded()
            }
        }
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWeights`] if the weights are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights
            .validate()
            .map_err(|e| ConfigError::InvalidWeights {
                message: e.to_string(),
            })
    }
}
