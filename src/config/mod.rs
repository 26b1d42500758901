//! Configuration module for mural
//!
//! Handles loading, parsing, and validating the TOML configuration file. The
//! parsed [`Config`] is immutable and passed by reference into each component
//! at construction; no component reads the environment on its own.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{Config, OutputConfig, PipelineConfig, RemoteConfig, SourceConfig};
