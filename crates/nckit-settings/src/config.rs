//! Job configuration
//!
//! A job file bundles everything one pipeline run needs besides the
//! toolpath itself: the machine, the target controller, the post options
//! and the pipeline tolerances. Files are JSON or TOML, chosen by
//! extension, and are validated on load and before save.

use crate::error::{SettingsError, SettingsResult};
use nckit_core::MachineProfile;
use nckit_kinematics::{
    EnvelopeCheck, EnvelopeValidator, LinearOffset, DEFAULT_SINGULARITY_EPSILON_DEG,
};
use nckit_post::{ControllerDialect, PostConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// On-disk encoding of a job file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(SettingsError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                ext
            })),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "JSON"),
            Self::Toml => write!(f, "TOML"),
        }
    }
}

/// Tolerances and gates applied by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Uncompensated tool-tip error accepted without RTCP (mm)
    pub tolerance_mm: f64,
    /// Tilt below which the C axis is reported as a singularity (degrees)
    pub singularity_epsilon_deg: f64,
    /// Suppress all output when a rapid leaves the envelope
    pub reject_on_critical: bool,
    pub envelope: EnvelopeCheck,
    /// Measured offset folded into every compensated position
    pub calibration_bias: Option<LinearOffset>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            tolerance_mm: 0.01,
            singularity_epsilon_deg: DEFAULT_SINGULARITY_EPSILON_DEG,
            reject_on_critical: true,
            envelope: EnvelopeCheck::default(),
            calibration_bias: None,
        }
    }
}

impl PipelineSettings {
    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if !self.tolerance_mm.is_finite() || self.tolerance_mm < 0.0 {
            return Err(SettingsError::invalid(
                "pipeline.tolerance_mm",
                format!("{} is not a tolerance (must be >= 0)", self.tolerance_mm),
            ));
        }
        if !self.singularity_epsilon_deg.is_finite() || self.singularity_epsilon_deg <= 0.0 {
            return Err(SettingsError::invalid(
                "pipeline.singularity_epsilon_deg",
                format!("{} must be > 0", self.singularity_epsilon_deg),
            ));
        }
        if let Some(bias) = &self.calibration_bias {
            for (axis, value) in [("dx", bias.dx), ("dy", bias.dy), ("dz", bias.dz)] {
                if !value.is_finite() {
                    return Err(SettingsError::invalid(
                        "pipeline.calibration_bias",
                        format!("{} is not finite", axis),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Complete job configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub dialect: ControllerDialect,
    pub machine: MachineProfile,
    #[serde(default)]
    pub post: PostConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl JobConfig {
    pub fn new(machine: MachineProfile, dialect: ControllerDialect) -> Self {
        Self {
            dialect,
            machine,
            post: PostConfig::default(),
            pipeline: PipelineSettings::default(),
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, format)?;
        info!(
            path = %path.display(),
            machine = %config.machine.name,
            dialect = %config.dialect,
            "Loaded job config"
        );
        Ok(config)
    }

    /// Parse and validate config text
    pub fn parse(content: &str, format: ConfigFormat) -> SettingsResult<Self> {
        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validated config text in the given format
    pub fn render(&self, format: ConfigFormat) -> SettingsResult<String> {
        self.validate()?;
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };
        Ok(content)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        let format = ConfigFormat::from_path(path)?;
        let content = self.render(format)?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), %format, "Saved job config");
        Ok(())
    }

    /// Validate configuration
    ///
    /// Checks the machine geometry, the post options, the pipeline
    /// tolerances and that the envelope margin leaves travel on every axis.
    pub fn validate(&self) -> SettingsResult<()> {
        self.machine.validate()?;
        self.post.validate()?;
        self.pipeline.validate()?;
        EnvelopeValidator::new(self.machine.travel_limits(), self.pipeline.envelope)
            .map_err(nckit_core::Error::from)?;
        Ok(())
    }
}
