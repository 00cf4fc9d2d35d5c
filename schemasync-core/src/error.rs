//! Error types for schemasync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading the desired-state configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error; includes line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML parse error for in-memory text.
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document parsed but describes an object that cannot be reconciled.
    #[error("invalid definition for {database}.{object}: {reason}")]
    Invalid {
        database: String,
        object: String,
        reason: String,
    },

    /// The document is structurally unusable as a whole.
    #[error("invalid config: {0}")]
    Empty(&'static str),
}

pub(crate) fn invalid(database: &str, object: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        database: database.to_owned(),
        object: object.to_owned(),
        reason: reason.into(),
    }
}
