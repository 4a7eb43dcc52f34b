use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of Actix Web workers for the API server.
pub const DEFAULT_WORKERS: usize = 4;
/// Default API listen port.
pub const DEFAULT_API_PORT: u16 = 3001;
/// Smallest accepted per-operation deadline, in milliseconds.
pub const MIN_OPERATION_TIMEOUT_MS: u64 = 5_000;

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Configuration for the HTTP API server.
///
/// # Examples
///
/// ```
/// use port_manager::config::ApiConfig;
///
/// let api = ApiConfig::default();
/// assert_eq!(api.port, 3001);
/// assert_eq!(api.address, "127.0.0.1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Address to bind to.
    #[serde(default = "default_address")]
    pub address: String,
    /// Port to listen on.
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Number of Actix Web workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_api_port(),
            workers: default_workers(),
        }
    }
}

/// Grace and settle windows used when terminating processes.
///
/// All values are milliseconds. The defaults are the windows the manager has
/// always used: 200ms grace before escalating, 100ms settle after a kill on
/// the graceful path, and 500ms settle after a force kill.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingConfig {
    /// Wait after SIGTERM before checking liveness.
    pub grace_ms: u64,
    /// Wait after escalating to SIGKILL on the graceful path.
    pub settle_ms: u64,
    /// Wait after a force kill of all targets.
    pub force_settle_ms: u64,
    /// Overall deadline of a single lifecycle operation.
    pub operation_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            grace_ms: 200,
            settle_ms: 100,
            force_settle_ms: 500,
            operation_timeout_ms: 10_000,
        }
    }
}

impl TimingConfig {
    /// Grace window as a [`Duration`].
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Graceful-path settle window as a [`Duration`].
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Force-path settle window as a [`Duration`].
    pub fn force_settle(&self) -> Duration {
        Duration::from_millis(self.force_settle_ms)
    }

    /// Per-operation deadline as a [`Duration`].
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_extra_path() -> Vec<String> {
    let home = home_dir();
    let home = home.display();
    vec![
        format!("{}/.cargo/bin", home),
        format!("{}/.bun/bin", home),
        format!("{}/bin", home),
        "/usr/local/bin".to_string(),
        "/usr/bin".to_string(),
        "/bin".to_string(),
        "/usr/sbin".to_string(),
        "/sbin".to_string(),
        "/opt/homebrew/bin".to_string(),
        "/usr/local/go/bin".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

/// How command files are launched.
///
/// Command files are shell scripts (`.command` / `.sh`) run through `shell`.
/// `extra_path` entries are prepended to `PATH` so tools installed in user
/// locations resolve even when the manager was started with a minimal
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Interpreter used to run command files.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Directories prepended to `PATH` for launched commands.
    #[serde(default = "default_extra_path")]
    pub extra_path: Vec<String>,
    /// Append stdout/stderr of launched commands to per-entry log files.
    /// When false, output is discarded.
    #[serde(default = "default_true")]
    pub log_output: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            extra_path: default_extra_path(),
            log_output: true,
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    home_dir().join(".port-manager")
}

/// Main configuration for the Port Manager.
///
/// # JSON Schema
///
/// Every field is optional:
///
/// ```json
/// {
///   "dataDir": "/home/me/.port-manager",
///   "api": { "address": "127.0.0.1", "port": 3001, "workers": 4 },
///   "timing": {
///     "graceMs": 200,
///     "settleMs": 100,
///     "forceSettleMs": 500,
///     "operationTimeoutMs": 10000
///   },
///   "launch": { "shell": "bash", "logOutput": true }
/// }
/// ```
///
/// # Examples
///
/// ```
/// use port_manager::config::Config;
///
/// let config = Config::parse_from_str(r#"{ "timing": { "graceMs": 50 } }"#).unwrap();
/// assert_eq!(config.timing.grace_ms, 50);
/// assert_eq!(config.timing.settle_ms, 100);
/// assert!(config.api.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding `ports.json` and the `logs/` directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP API settings. `None` disables the API server.
    #[serde(default)]
    pub api: Option<ApiConfig>,

    /// Termination windows and operation deadline.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Launch settings.
    #[serde(default)]
    pub launch: LaunchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api: Some(ApiConfig::default()),
            timing: TimingConfig::default(),
            launch: LaunchConfig::default(),
        }
    }
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON or does not match the
    /// schema.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Path of the JSON file holding the registered entries.
    pub fn ports_file(&self) -> PathBuf {
        self.data_dir.join("ports.json")
    }

    /// Directory receiving per-entry log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse_from_str("{}").unwrap();

        assert!(config.api.is_none());
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.launch.shell, "bash");
        assert!(config.launch.log_output);
        assert!(config.ports_file().ends_with("ports.json"));
    }

    #[test]
    fn test_parse_api_section() {
        let config = Config::parse_from_str(
            r#"{ "dataDir": "/tmp/pm", "api": { "port": 4100 } }"#,
        )
        .unwrap();

        let api = config.api.as_ref().unwrap();
        assert_eq!(api.port, 4100);
        assert_eq!(api.address, "127.0.0.1");
        assert_eq!(api.workers, DEFAULT_WORKERS);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pm"));
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/pm/logs"));
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let err = Config::parse_from_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
