// src/errors.rs

//! Errors surfaced by the `calcdag` binary: configuration, I/O, HTTP and
//! rejected input. Store-level outcomes stay in `dag::StoreError`.

use thiserror::Error;

use crate::compiler::CompileError;

#[derive(Error, Debug)]
pub enum CalcdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid expression: {0}")]
    CompileError(#[from] CompileError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CalcdagError>;
