use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or building a machine description.
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("invalid machine description: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown {kind} \"{name}\"")]
    UnknownName { kind: &'static str, name: String },

    #[error("duplicate {kind} \"{name}\"")]
    Duplicate { kind: &'static str, name: String },

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Board(#[from] cabinet_core::Error),
}

pub type Result<T> = std::result::Result<T, DescriptionError>;
