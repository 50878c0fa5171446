// src/errors.rs

//! Library error type.
//!
//! Config loading and plan construction return [`AssetflowError`]; task
//! bodies use `anyhow` and end up in [`AssetflowError::Other`] when they
//! cross into the engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("{0}")]
    DagCycle(String),

    #[error("malformed config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;
