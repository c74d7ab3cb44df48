//! `reqprof.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{LogLevel, ProfilerResult};

/// Environment name under which nothing is ever persisted.
pub const TESTING_ENVIRONMENT: &str = "testing";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfilerConfig {
    /// Master switch; when off every operation is a silent no-op.
    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// Root for persisted records. Records land in `<logdata_path>/debug/<session>/`.
    #[serde(default)]
    pub logdata_path: Option<PathBuf>,

    /// How many records `history_default` returns. 0 means unlimited.
    #[serde(default = "default_history_count")]
    pub history_count: usize,

    /// Garbage collection runs on roughly one in `gc_frequency` finalize calls.
    #[serde(default = "default_gc_frequency")]
    pub gc_frequency: u32,

    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,

    #[serde(default = "default_enabled_logs")]
    pub enabled_logs: Vec<LogLevel>,

    /// Glob patterns matched against the request path; matches are never recorded.
    #[serde(default = "default_excluded_urls")]
    pub excluded_urls: Vec<String>,

    #[serde(default = "default_error_log_path")]
    pub error_log_path: Option<PathBuf>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_history_count() -> usize {
    20
}

fn default_gc_frequency() -> u32 {
    10
}

fn default_expiration_secs() -> u64 {
    86_400
}

fn default_enabled_logs() -> Vec<LogLevel> {
    vec![LogLevel::Debug, LogLevel::Error, LogLevel::Info]
}

fn default_excluded_urls() -> Vec<String> {
    ["css", "js", "eot", "woff", "ttf", "svg", "map"]
        .iter()
        .map(|ext| format!("*.{ext}"))
        .collect()
}

fn default_error_log_path() -> Option<PathBuf> {
    Some(PathBuf::from("reqprof-errors.log"))
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            environment: default_environment(),
            logdata_path: None,
            history_count: default_history_count(),
            gc_frequency: default_gc_frequency(),
            expiration_secs: default_expiration_secs(),
            enabled_logs: default_enabled_logs(),
            excluded_urls: default_excluded_urls(),
            error_log_path: default_error_log_path(),
        }
    }
}

impl ProfilerConfig {
    pub fn from_toml_str(s: &str) -> ProfilerResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match Self::from_toml_str(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn is_testing(&self) -> bool {
        self.environment == TESTING_ENVIRONMENT
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    /// The configured log root, treating an empty path as unset.
    pub fn logdata_path(&self) -> Option<&Path> {
        self.logdata_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn error_log(&self) -> Option<&Path> {
        self.error_log_path.as_deref()
    }
}
