//! Per-job post-processor options

use crate::error::{PostError, PostResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How rotary moves are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiveAxisMode {
    /// Rotary words are emitted as plain positioning
    #[default]
    None,
    /// Tool centre point management (`G43.4`, `TRAORI`, `M128`)
    Tcpm,
    /// Tool centre point control with vector input (`G43.5`)
    Tcp,
    /// Indexed work plane, linear motion only
    ThreePlusTwo,
}

impl fmt::Display for FiveAxisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Tcpm => write!(f, "TCPM"),
            Self::Tcp => write!(f, "TCP"),
            Self::ThreePlusTwo => write!(f, "3+2"),
        }
    }
}

/// Coolant selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coolant {
    #[default]
    Off,
    Flood,
    Mist,
    ThroughSpindle,
}

/// Work coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkOffset {
    #[default]
    G54,
    G55,
    G56,
    G57,
    G58,
    G59,
}

impl fmt::Display for WorkOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::G54 => "G54",
            Self::G55 => "G55",
            Self::G56 => "G56",
            Self::G57 => "G57",
            Self::G58 => "G58",
            Self::G59 => "G59",
        };
        f.write_str(code)
    }
}

/// Serialization options for one program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub program_name: String,
    pub program_number: u32,
    pub tool_number: u32,
    pub spindle_rpm: f64,
    pub coolant: Coolant,
    /// Literal coolant-on code replacing the dialect's
    pub coolant_code: Option<String>,
    pub work_offset: WorkOffset,
    pub use_canned_cycles: bool,
    pub use_tool_length_comp: bool,
    /// Coordinates are rounded to this many decimals (0..=6)
    pub decimal_places: u32,
    pub line_numbers: bool,
    pub line_number_start: u32,
    pub line_number_increment: u32,
    pub emit_safe_start: bool,
    /// Literal program-end code replacing the dialect's
    pub program_end: Option<String>,
    pub five_axis_mode: FiveAxisMode,
    /// Adaptive-control feed override, percent
    pub feed_override_pct: f64,
    /// Adaptive-control spindle override, percent
    pub spindle_override_pct: f64,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            program_name: "NCKIT".to_string(),
            program_number: 1,
            tool_number: 1,
            spindle_rpm: 1000.0,
            coolant: Coolant::Off,
            coolant_code: None,
            work_offset: WorkOffset::G54,
            use_canned_cycles: true,
            use_tool_length_comp: true,
            decimal_places: 3,
            line_numbers: false,
            line_number_start: 10,
            line_number_increment: 10,
            emit_safe_start: true,
            program_end: None,
            five_axis_mode: FiveAxisMode::None,
            feed_override_pct: 100.0,
            spindle_override_pct: 100.0,
        }
    }
}

impl PostConfig {
    pub const MAX_DECIMAL_PLACES: u32 = 6;

    /// Validate configuration
    pub fn validate(&self) -> PostResult<()> {
        if self.decimal_places > Self::MAX_DECIMAL_PLACES {
            return Err(PostError::invalid(
                "decimal_places",
                format!(
                    "{} exceeds the maximum of {}",
                    self.decimal_places,
                    Self::MAX_DECIMAL_PLACES
                ),
            ));
        }
        if self.line_numbers && self.line_number_increment == 0 {
            return Err(PostError::invalid(
                "line_number_increment",
                "must be positive when line numbers are enabled",
            ));
        }
        if !self.spindle_rpm.is_finite() || self.spindle_rpm <= 0.0 {
            return Err(PostError::invalid(
                "spindle_rpm",
                format!("{} is not a positive speed", self.spindle_rpm),
            ));
        }
        for (field, pct) in [
            ("feed_override_pct", self.feed_override_pct),
            ("spindle_override_pct", self.spindle_override_pct),
        ] {
            if !pct.is_finite() || pct <= 0.0 {
                return Err(PostError::invalid(
                    field,
                    format!("{} is not a positive percentage", pct),
                ));
            }
        }
        if self.program_identifier().is_empty() {
            return Err(PostError::invalid(
                "program_name",
                "must contain at least one letter or digit",
            ));
        }
        Ok(())
    }

    /// Program name reduced to `[A-Z0-9_]`
    pub fn program_identifier(&self) -> String {
        let ident: String = self
            .program_name
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        if ident.chars().all(|c| c == '_') {
            String::new()
        } else {
            ident
        }
    }

    /// Spindle speed after the override
    pub fn effective_rpm(&self) -> f64 {
        self.spindle_rpm * self.spindle_override_pct / 100.0
    }

    /// Programmed feed after the override
    pub fn effective_feed(&self, feed: f64) -> f64 {
        feed * self.feed_override_pct / 100.0
    }
}
