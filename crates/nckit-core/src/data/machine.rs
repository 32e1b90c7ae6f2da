//! Machine configuration models
//!
//! Travel limits, rotary kinematic topology and pivot geometry. These are
//! loaded once per machine profile and never mutated afterwards.

use super::Axis;
use crate::error::{ensure_finite, GeometryError, LimitsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed travel interval `[min, max]` for one axis
///
/// Millimeters for linear axes, degrees for rotary axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check that the bounds are finite and ordered
    pub fn validate(&self, axis: Axis) -> Result<(), LimitsError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(LimitsError::NonFinite {
                axis: axis.to_string(),
            });
        }
        if self.min > self.max {
            return Err(LimitsError::Inverted {
                axis: axis.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Distance beyond the nearer bound: positive above `max`, negative
    /// below `min`, `None` inside the range.
    pub fn overshoot(&self, value: f64) -> Option<f64> {
        if value > self.max {
            Some(value - self.max)
        } else if value < self.min {
            Some(value - self.min)
        } else {
            None
        }
    }

    /// Range pulled in by `margin` on both ends
    pub fn shrink(&self, axis: Axis, margin: f64) -> Result<AxisRange, LimitsError> {
        let shrunk = AxisRange::new(self.min + margin, self.max - margin);
        if shrunk.min > shrunk.max {
            return Err(LimitsError::MarginTooLarge {
                axis: axis.to_string(),
                margin,
            });
        }
        Ok(shrunk)
    }
}

/// Per-axis travel limits of a machine
///
/// Linear axes are always present; rotary axes only when the machine has them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
    #[serde(default)]
    pub a: Option<AxisRange>,
    #[serde(default)]
    pub c: Option<AxisRange>,
}

impl AxisLimits {
    /// Linear-only limits
    pub fn linear(x: AxisRange, y: AxisRange, z: AxisRange) -> Self {
        Self {
            x,
            y,
            z,
            a: None,
            c: None,
        }
    }

    pub fn with_a(mut self, a: AxisRange) -> Self {
        self.a = Some(a);
        self
    }

    pub fn with_c(mut self, c: AxisRange) -> Self {
        self.c = Some(c);
        self
    }

    /// Range configured for `axis`, if any
    pub fn range(&self, axis: Axis) -> Option<&AxisRange> {
        match axis {
            Axis::X => Some(&self.x),
            Axis::Y => Some(&self.y),
            Axis::Z => Some(&self.z),
            Axis::A => self.a.as_ref(),
            Axis::B => None,
            Axis::C => self.c.as_ref(),
        }
    }

    /// Every axis with a configured range, linear axes first
    pub fn configured_axes(&self) -> Vec<Axis> {
        [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::C]
            .into_iter()
            .filter(|axis| self.range(*axis).is_some())
            .collect()
    }

    pub fn validate(&self) -> Result<(), LimitsError> {
        for axis in self.configured_axes() {
            if let Some(range) = self.range(axis) {
                range.validate(axis)?;
            }
        }
        Ok(())
    }
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self::linear(
            AxisRange::new(0.0, 500.0),
            AxisRange::new(0.0, 400.0),
            AxisRange::new(-300.0, 100.0),
        )
    }
}

/// Which physical member carries each rotary axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicTopology {
    /// Trunnion: A tilt and C platter both on the table
    TableTable,
    /// Fork head: C swivel carrying an A tilt, both on the spindle
    HeadHead,
    /// A tilt in the head, C rotary table
    MixedAC,
    /// B tilt in the head, C rotary table
    MixedBC,
    /// A tilt on the table, C swivel on the head
    HeadTable,
}

impl KinematicTopology {
    pub fn all() -> &'static [KinematicTopology] {
        &[
            KinematicTopology::TableTable,
            KinematicTopology::HeadHead,
            KinematicTopology::MixedAC,
            KinematicTopology::MixedBC,
            KinematicTopology::HeadTable,
        ]
    }
}

impl fmt::Display for KinematicTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableTable => write!(f, "table-table"),
            Self::HeadHead => write!(f, "head-head"),
            Self::MixedAC => write!(f, "mixed A/C"),
            Self::MixedBC => write!(f, "mixed B/C"),
            Self::HeadTable => write!(f, "head-table"),
        }
    }
}

/// Distances locating the rotary pivot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotGeometry {
    /// Head pivot to spindle gauge line
    pub pivot_to_gauge_mm: f64,
    /// Table pivot below the table surface
    pub pivot_to_table_mm: f64,
    /// Nominal tool length
    pub tool_length_mm: f64,
    /// Measured gauge line to tool tip; zero falls back to `tool_length_mm`
    #[serde(default)]
    pub tool_gauge_length_mm: f64,
}

impl PivotGeometry {
    pub fn validate(&self) -> Result<(), GeometryError> {
        for (field, value) in [
            ("pivot_to_gauge_mm", self.pivot_to_gauge_mm),
            ("pivot_to_table_mm", self.pivot_to_table_mm),
            ("tool_length_mm", self.tool_length_mm),
            ("tool_gauge_length_mm", self.tool_gauge_length_mm),
        ] {
            ensure_finite(field, value)?;
            if value < 0.0 {
                return Err(GeometryError::NegativeLength {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Gauge line to tool tip
    pub fn effective_tool_length_mm(&self) -> f64 {
        if self.tool_gauge_length_mm > 0.0 {
            self.tool_gauge_length_mm
        } else {
            self.tool_length_mm
        }
    }

    /// Head pivot to tool tip, the lever arm of a tilting head
    pub fn head_lever_mm(&self) -> f64 {
        self.pivot_to_gauge_mm + self.effective_tool_length_mm()
    }
}

impl Default for PivotGeometry {
    fn default() -> Self {
        Self {
            pivot_to_gauge_mm: 150.0,
            pivot_to_table_mm: 100.0,
            tool_length_mm: 80.0,
            tool_gauge_length_mm: 0.0,
        }
    }
}

/// Rotary capability of a machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MachineKinematics {
    /// Linear axes only
    ThreeAxis,
    /// One indexing/rotary axis without tool-tip compensation
    FourAxis { rotary: Axis },
    /// Two rotary axes with a defined topology
    FiveAxis {
        topology: KinematicTopology,
        pivot: PivotGeometry,
        /// Tilt travel (degrees)
        rotary_a: AxisRange,
        /// Rotary travel (degrees)
        rotary_c: AxisRange,
    },
}

impl MachineKinematics {
    pub fn rotary_axes(&self) -> Vec<Axis> {
        match self {
            Self::ThreeAxis => Vec::new(),
            Self::FourAxis { rotary } => vec![*rotary],
            Self::FiveAxis { .. } => vec![Axis::A, Axis::C],
        }
    }

    pub fn topology(&self) -> Option<KinematicTopology> {
        match self {
            Self::FiveAxis { topology, .. } => Some(*topology),
            _ => None,
        }
    }
}

impl Default for MachineKinematics {
    fn default() -> Self {
        Self::ThreeAxis
    }
}

/// Static description of one machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineProfile {
    pub name: String,
    pub limits: AxisLimits,
    #[serde(default)]
    pub kinematics: MachineKinematics,
}

impl MachineProfile {
    pub fn new(name: impl Into<String>, limits: AxisLimits, kinematics: MachineKinematics) -> Self {
        Self {
            name: name.into(),
            limits,
            kinematics,
        }
    }

    /// Travel limits including the rotary ranges a five-axis machine declares
    ///
    /// Explicit `limits.a` / `limits.c` entries take precedence.
    pub fn travel_limits(&self) -> AxisLimits {
        let mut limits = self.limits.clone();
        if let MachineKinematics::FiveAxis {
            rotary_a, rotary_c, ..
        } = &self.kinematics
        {
            limits.a = limits.a.or(Some(*rotary_a));
            limits.c = limits.c.or(Some(*rotary_c));
        }
        limits
    }

    /// Validate limits and geometry
    pub fn validate(&self) -> crate::Result<()> {
        self.travel_limits().validate()?;
        match &self.kinematics {
            MachineKinematics::ThreeAxis => {}
            MachineKinematics::FourAxis { rotary } => {
                if !rotary.is_rotary() {
                    return Err(crate::Error::other(format!(
                        "Four-axis machine '{}' declares linear axis {} as rotary",
                        self.name, rotary
                    )));
                }
            }
            MachineKinematics::FiveAxis { pivot, .. } => pivot.validate()?,
        }
        Ok(())
    }
}

impl Default for MachineProfile {
    fn default() -> Self {
        Self::new("Generic VMC", AxisLimits::default(), MachineKinematics::ThreeAxis)
    }
}
