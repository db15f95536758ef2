//! Server configuration.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//!   1. Built-in defaults.
//!   2. The user config file, `<config dir>/gauge-lsp/config.toml`.
//!   3. The workspace config file, `<workspace root>/gauge-lsp.toml`.
//!   4. The `runner_request_timeout` environment variable (milliseconds),
//!      the same variable Gauge itself reads.
//!
//! Command-line flags are applied on top by `main`.
//!
//! ```toml
//! runner_request_timeout_ms = 10000
//! runner_address = "127.0.0.1:50051"
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use etcetera::BaseStrategy;
use serde::Deserialize;

/// Name of the per-workspace config file.
pub const WORKSPACE_CONFIG_FILE: &str = "gauge-lsp.toml";

/// Environment variable overriding the runner request timeout.
pub const RUNNER_REQUEST_TIMEOUT_ENV: &str = "runner_request_timeout";

const DEFAULT_RUNNER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long to wait for the runner to answer a step-name request.
    pub runner_request_timeout: Duration,
    /// Address of a runner to connect to at startup, if any.
    pub runner_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runner_request_timeout: DEFAULT_RUNNER_REQUEST_TIMEOUT,
            runner_address: None,
        }
    }
}

/// A config file as written on disk; every key is optional.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    runner_request_timeout_ms: Option<u64>,
    runner_address: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("runner_request_timeout must be a number of milliseconds, got {0:?}")]
    InvalidTimeout(String),
}

impl Config {
    /// Load the layered configuration for a workspace.
    pub fn load(workspace_root: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(user_file) = user_config_path() {
            config.merge_file(&user_file)?;
        }
        if let Some(root) = workspace_root {
            config.merge_file(&root.join(WORKSPACE_CONFIG_FILE))?;
        }
        if let Ok(raw) = std::env::var(RUNNER_REQUEST_TIMEOUT_ENV) {
            config.runner_request_timeout = parse_timeout_ms(&raw)?;
        }

        Ok(config)
    }

    /// Apply the settings found in `path`.  A missing file is not an error.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        self.merge_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn merge_str(&mut self, content: &str) -> Result<(), toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        if let Some(ms) = file.runner_request_timeout_ms {
            self.runner_request_timeout = Duration::from_millis(ms);
        }
        if let Some(addr) = file.runner_address {
            self.runner_address = Some(addr);
        }
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("gauge-lsp").join("config.toml"))
}

fn parse_timeout_ms(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidTimeout(raw.to_string()))
}
