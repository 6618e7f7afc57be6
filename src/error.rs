#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

use crate::store::EntityKind;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} store is corrupted: {msg}")]
    StoreCorrupted { kind: EntityKind, msg: String },

    #[error(
        "project {project_id} was deleted but its tasks could not be removed; run `taskboard doctor --repair`: {source}"
    )]
    IntegrityFailure {
        project_id: String,
        #[source]
        source: Box<BoardError>,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },
}

impl BoardError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T, E = BoardError> = std::result::Result<T, E>;
