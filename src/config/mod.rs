// src/config/mod.rs

//! Configuration loading and validation for calcdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and overlay environment overrides (`loader.rs`).
//! - Validate durations, addresses and counts (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_with_env};
pub use model::{
    parse_duration, AgentConfig, ConfigFile, OperationTimes, OrchestratorConfig, RawConfigFile,
};
