//! Crate-wide error types.

use thiserror::Error;

use std::io::Write as _;
use std::path::{Path, PathBuf};

pub type ProfilerResult<T> = Result<T, ProfilerError>;

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ProfilerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a config error and appends it to the operator-visible error log.
    ///
    /// The append is best-effort; a failure to write the log never replaces
    /// the original error.
    pub fn config(message: impl Into<String>, error_log: Option<&Path>) -> Self {
        let err = Self::Config(message.into());
        tracing::error!("{err}");
        if let Some(path) = error_log {
            append_error_log(path, &err);
        }
        err
    }
}

fn append_error_log(path: &Path, err: &ProfilerError) {
    let stamp = crate::format_date(time::OffsetDateTime::now_utc());
    let line = format!("{stamp} {err}\n");
    let written = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(line.as_bytes()));
    if let Err(e) = written {
        tracing::debug!("failed to append error log {}: {e}", path.display());
    }
}
