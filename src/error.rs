//! Errors at the pipeline boundary
//!
//! Only structural failures end up here. Envelope violations, singularity
//! risk and degraded five-axis support are reported in the outputs.

use nckit_core::{GeometryError, LimitsError};
use nckit_post::PostError;
use nckit_settings::SettingsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Machine profile or motion data is malformed
    #[error("Machine error: {0}")]
    Machine(#[from] nckit_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Axis limit error: {0}")]
    Limits(#[from] LimitsError),

    #[error("Post error: {0}")]
    Post(#[from] PostError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// A request or response could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request needs rotary kinematics the machine does not have
    #[error("Machine '{machine}' has no five-axis kinematics")]
    NotFiveAxis { machine: String },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
