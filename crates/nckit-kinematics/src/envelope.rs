//! Work Envelope Validation
//!
//! Checks every axis command of a toolpath against the machine's physical
//! travel. Leaving the envelope is the reportable outcome, not an error:
//! only malformed configuration (inverted bounds, negative margins) and
//! non-finite coordinates fail.

use nckit_core::{Axis, AxisLimits, AxisRange, LimitsError, MotionPoint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Violation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    /// Any rapid overshoot is critical, whatever its magnitude
    pub fn for_move(is_rapid: bool) -> Self {
        if is_rapid {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One axis command outside its travel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeViolation {
    /// Index of the offending point in the input
    pub point_index: usize,
    pub axis: Axis,
    /// Commanded value
    pub value: f64,
    /// The bound that was crossed (after safety margin)
    pub limit: f64,
    /// Distance beyond `limit`: positive above max, negative below min
    pub overshoot_mm: f64,
    pub is_rapid: bool,
    pub severity: Severity,
}

/// Extent actually used on one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisExtent {
    pub axis: Axis,
    pub min: f64,
    pub max: f64,
}

/// Per-axis extents across all checked points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub extents: Vec<AxisExtent>,
}

impl BoundingBox {
    pub fn extent(&self, axis: Axis) -> Option<&AxisExtent> {
        self.extents.iter().find(|e| e.axis == axis)
    }
}

/// How much of an axis' travel the path uses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisUtilization {
    pub axis: Axis,
    pub used_range: f64,
    pub axis_range: f64,
    /// `used_range / axis_range * 100`, clamped to `[0, 100]`
    pub percent: f64,
}

/// Clearance and margin inputs to a validation run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvelopeCheck {
    #[serde(default)]
    pub tool_length_mm: f64,
    #[serde(default)]
    pub workpiece_height_mm: f64,
    #[serde(default)]
    pub fixture_height_mm: f64,
    /// Pulls every linear limit in by this distance before comparison
    #[serde(default)]
    pub safety_margin_mm: f64,
}

impl EnvelopeCheck {
    fn validate(&self) -> Result<(), LimitsError> {
        for (field, value) in [
            ("tool_length_mm", self.tool_length_mm),
            ("workpiece_height_mm", self.workpiece_height_mm),
            ("fixture_height_mm", self.fixture_height_mm),
            ("safety_margin_mm", self.safety_margin_mm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LimitsError::InvalidParameter {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    fn stack_height_mm(&self) -> f64 {
        self.tool_length_mm + self.workpiece_height_mm + self.fixture_height_mm
    }
}

/// Result of one validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeReport {
    pub violations: Vec<EnvelopeViolation>,
    /// True exactly when `violations` is empty
    pub is_valid: bool,
    /// `None` when no points were checked
    pub bounding_box: Option<BoundingBox>,
    pub utilization: Vec<AxisUtilization>,
    /// Effective Z travel minus tool + workpiece + fixture, when any of those is set
    pub z_clearance_mm: Option<f64>,
    pub warnings: Vec<String>,
    pub points_checked: usize,
}

impl EnvelopeReport {
    pub fn critical_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .count()
    }

    pub fn has_critical(&self) -> bool {
        self.critical_count() > 0
    }

    /// Violation with the largest absolute overshoot
    pub fn worst_violation(&self) -> Option<&EnvelopeViolation> {
        self.violations
            .iter()
            .max_by(|a, b| a.overshoot_mm.abs().total_cmp(&b.overshoot_mm.abs()))
    }
}

/// Validator bound to one machine's limits
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeValidator {
    limits: AxisLimits,
    effective: AxisLimits,
    check: EnvelopeCheck,
}

impl EnvelopeValidator {
    /// Validate configuration and precompute the margin-shrunk limits
    pub fn new(limits: AxisLimits, check: EnvelopeCheck) -> Result<Self, LimitsError> {
        limits.validate()?;
        check.validate()?;

        let margin = check.safety_margin_mm;
        let effective = AxisLimits {
            x: limits.x.shrink(Axis::X, margin)?,
            y: limits.y.shrink(Axis::Y, margin)?,
            z: limits.z.shrink(Axis::Z, margin)?,
            a: limits.a,
            c: limits.c,
        };

        Ok(Self {
            limits,
            effective,
            check,
        })
    }

    pub fn limits(&self) -> &AxisLimits {
        &self.limits
    }

    /// Limits after the safety margin
    pub fn effective_limits(&self) -> &AxisLimits {
        &self.effective
    }

    /// Check every point against the effective limits
    ///
    /// A NaN or infinite coordinate compares as inside any range, so it is
    /// rejected before any comparison.
    pub fn validate(&self, points: &[MotionPoint]) -> Result<EnvelopeReport, LimitsError> {
        let axes = self.limits.configured_axes();
        let mut violations = Vec::new();
        let mut extents: Vec<AxisExtent> = Vec::new();
        let mut warnings = Vec::new();

        for (index, point) in points.iter().enumerate() {
            ensure_finite_point(index, point)?;
            for &axis in &axes {
                let Some(value) = point.coordinate(axis) else {
                    continue;
                };
                widen(&mut extents, axis, value);
                self.check_value(&mut violations, index, axis, value, point.is_rapid());
            }

            // Cycles return to the retract plane at rapid
            if let Some(retract_z) = point.retract_z {
                widen(&mut extents, Axis::Z, retract_z);
                self.check_value(&mut violations, index, Axis::Z, retract_z, true);
            }
        }

        if points.is_empty() {
            warnings.push("Empty toolpath: nothing to validate".to_string());
        }

        let z_clearance_mm = self.z_clearance();
        if let Some(clearance) = z_clearance_mm {
            if clearance < 0.0 {
                warnings.push(format!(
                    "Z travel {:.3} mm cannot clear tool + workpiece + fixture stack of {:.3} mm",
                    self.effective.z.span(),
                    self.check.stack_height_mm()
                ));
            }
        }

        extents.sort_by_key(|e| e.axis);
        let utilization = extents
            .iter()
            .filter_map(|e| {
                self.limits
                    .range(e.axis)
                    .map(|range| utilization(e, range))
            })
            .collect();

        let critical = violations
            .iter()
            .filter(|v: &&EnvelopeViolation| v.severity == Severity::Critical)
            .count();
        if critical > 0 {
            warn!(
                critical,
                total = violations.len(),
                "Rapid traverse leaves the work envelope"
            );
        }
        info!(
            points = points.len(),
            violations = violations.len(),
            "Envelope validation complete"
        );

        Ok(EnvelopeReport {
            is_valid: violations.is_empty(),
            violations,
            bounding_box: if extents.is_empty() {
                None
            } else {
                Some(BoundingBox { extents })
            },
            utilization,
            z_clearance_mm,
            warnings,
            points_checked: points.len(),
        })
    }

    fn check_value(
        &self,
        violations: &mut Vec<EnvelopeViolation>,
        point_index: usize,
        axis: Axis,
        value: f64,
        is_rapid: bool,
    ) {
        let Some(range) = self.effective.range(axis) else {
            return;
        };
        let Some(overshoot) = range.overshoot(value) else {
            return;
        };
        let limit = if overshoot > 0.0 { range.max } else { range.min };
        debug!(point_index, %axis, value, overshoot, is_rapid, "Envelope violation");
        violations.push(EnvelopeViolation {
            point_index,
            axis,
            value,
            limit,
            overshoot_mm: overshoot,
            is_rapid,
            severity: Severity::for_move(is_rapid),
        });
    }

    fn z_clearance(&self) -> Option<f64> {
        let stack = self.check.stack_height_mm();
        if stack > 0.0 {
            Some(self.effective.z.span() - stack)
        } else {
            None
        }
    }
}

fn ensure_finite_point(point_index: usize, point: &MotionPoint) -> Result<(), LimitsError> {
    let coordinates = [
        (Axis::X, Some(point.x)),
        (Axis::Y, Some(point.y)),
        (Axis::Z, Some(point.z)),
        (Axis::Z, point.retract_z),
        (Axis::A, point.a),
        (Axis::C, point.c),
    ];
    match coordinates
        .into_iter()
        .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
    {
        Some((axis, _)) => Err(LimitsError::NonFiniteCoordinate {
            point_index,
            axis: axis.to_string(),
        }),
        None => Ok(()),
    }
}

fn widen(extents: &mut Vec<AxisExtent>, axis: Axis, value: f64) {
    match extents.iter_mut().find(|e| e.axis == axis) {
        Some(extent) => {
            extent.min = extent.min.min(value);
            extent.max = extent.max.max(value);
        }
        None => extents.push(AxisExtent {
            axis,
            min: value,
            max: value,
        }),
    }
}

fn utilization(extent: &AxisExtent, range: &AxisRange) -> AxisUtilization {
    let used_range = extent.max - extent.min;
    let axis_range = range.span();
    let percent = if axis_range > 0.0 {
        (used_range / axis_range * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    AxisUtilization {
        axis: extent.axis,
        used_range,
        axis_range,
        percent,
    }
}

/// One-shot validation with explicit clearance parameters
pub fn validate(
    limits: &AxisLimits,
    points: &[MotionPoint],
    tool_length_mm: f64,
    workpiece_height_mm: f64,
    fixture_height_mm: f64,
    safety_margin_mm: f64,
) -> Result<EnvelopeReport, LimitsError> {
    let check = EnvelopeCheck {
        tool_length_mm,
        workpiece_height_mm,
        fixture_height_mm,
        safety_margin_mm,
    };
    EnvelopeValidator::new(limits.clone(), check)?.validate(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_for_move() {
        assert_eq!(Severity::for_move(true), Severity::Critical);
        assert_eq!(Severity::for_move(false), Severity::Warning);
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_widen_tracks_min_and_max() {
        let mut extents = Vec::new();
        widen(&mut extents, Axis::X, 5.0);
        widen(&mut extents, Axis::X, -3.0);
        widen(&mut extents, Axis::X, 2.0);
        assert_eq!(extents.len(), 1);
        assert_eq!(extents[0].min, -3.0);
        assert_eq!(extents[0].max, 5.0);
    }

    #[test]
    fn test_utilization_is_clamped() {
        let extent = AxisExtent {
            axis: Axis::X,
            min: -100.0,
            max: 700.0,
        };
        let util = utilization(&extent, &AxisRange::new(0.0, 500.0));
        assert_eq!(util.percent, 100.0);

        let zero_span = utilization(&extent, &AxisRange::new(10.0, 10.0));
        assert_eq!(zero_span.percent, 0.0);
    }

    #[test]
    fn test_negative_margin_is_structural() {
        let check = EnvelopeCheck {
            safety_margin_mm: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            EnvelopeValidator::new(AxisLimits::default(), check),
            Err(LimitsError::InvalidParameter { .. })
        ));
    }
}
