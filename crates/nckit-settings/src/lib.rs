//! NCKit Settings Crate
//!
//! Job configuration files: machine profile, target controller, post
//! options and pipeline tolerances, stored as JSON or TOML.

pub mod config;
pub mod error;

pub use config::{ConfigFormat, JobConfig, PipelineSettings};
pub use error::{SettingsError, SettingsResult};
