//! RTCP Kinematic Compensation
//!
//! Translates programmed rotary angles into the linear-axis offsets that
//! keep the tool tip on the programmed coordinate while the table or head
//! rotates.
//!
//! Conventions:
//! - Program zero lies on the table surface, on the C-axis centre line.
//! - The table pivot sits `pivot_to_table_mm` below the table surface.
//! - A tilting head pivots `pivot_to_gauge_mm + tool length` above the tip;
//!   at zero angles the tool points along -Z.
//! - Rotations are right-handed about the machine axes.
//!
//! Table-side rotations move the part under a fixed tool, so the linear axes
//! must chase the rotated part point. Head-side rotations swing the tip
//! around the head pivot, so the linear axes must cancel that swing.

use nalgebra::{Point3, Rotation3, Vector3};
use nckit_core::error::{ensure_finite, GeometryError};
use nckit_core::{Axis, AxisLimits, KinematicTopology, MotionPoint, PivotGeometry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Tilt angle below which the C axis is treated as kinematically redundant
pub const DEFAULT_SINGULARITY_EPSILON_DEG: f64 = 0.5;

/// Linear offset in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearOffset {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl LinearOffset {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn magnitude(&self) -> f64 {
        (self.dx * self.dx + self.dy * self.dy + self.dz * self.dz).sqrt()
    }

    fn from_vector(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// One programmed tool-tip position with its rotary angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompensationInput {
    pub a_deg: f64,
    pub c_deg: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Calibration bias added to the programmed position before compensation
    #[serde(default)]
    pub bias: Option<LinearOffset>,
}

impl CompensationInput {
    pub fn new(a_deg: f64, c_deg: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            a_deg,
            c_deg,
            x,
            y,
            z,
            bias: None,
        }
    }

    pub fn with_bias(mut self, bias: LinearOffset) -> Self {
        self.bias = Some(bias);
        self
    }

    /// Input for a motion point, rotary axes it lacks read as zero
    pub fn from_point(point: &MotionPoint) -> Self {
        let (a_deg, c_deg) = point.rotary_or_zero();
        Self::new(a_deg, c_deg, point.x, point.y, point.z)
    }

    fn validate(&self) -> Result<(), GeometryError> {
        ensure_finite("a_deg", self.a_deg)?;
        ensure_finite("c_deg", self.c_deg)?;
        ensure_finite("x", self.x)?;
        ensure_finite("y", self.y)?;
        ensure_finite("z", self.z)?;
        if let Some(bias) = &self.bias {
            ensure_finite("bias.dx", bias.dx)?;
            ensure_finite("bias.dy", bias.dy)?;
            ensure_finite("bias.dz", bias.dz)?;
        }
        Ok(())
    }

    fn programmed(&self) -> Point3<f64> {
        let bias = self.bias.unwrap_or_default();
        Point3::new(self.x + bias.dx, self.y + bias.dy, self.z + bias.dz)
    }
}

/// Outcome of compensating one point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationResult {
    /// Linear-axis command X
    pub x: f64,
    /// Linear-axis command Y
    pub y: f64,
    /// Linear-axis command Z
    pub z: f64,
    /// Command minus programmed position
    pub compensation_vector: LinearOffset,
    pub kinematic_chain: String,
    /// Tip deviation if the linear axes were left at the programmed position
    pub tool_tip_error_without_rtcp_mm: f64,
    /// Whether the uncompensated error already fits the tolerance
    pub within_tolerance: bool,
}

/// Safety assessment of one compensated point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtcpValidation {
    pub safe: bool,
    pub axis_limits_ok: bool,
    pub singularity_risk: bool,
    pub warnings: Vec<String>,
}

/// Stateless RTCP compensator for one machine and tool
///
/// Geometry is checked once at construction; afterwards the value is
/// immutable and can be shared freely between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct RtcpCompensator {
    topology: KinematicTopology,
    pivot: PivotGeometry,
    singularity_epsilon_deg: f64,
    chain: String,
}

impl RtcpCompensator {
    /// Create a compensator, rejecting non-physical geometry
    pub fn new(topology: KinematicTopology, pivot: PivotGeometry) -> Result<Self, GeometryError> {
        pivot.validate()?;
        Ok(Self {
            topology,
            pivot,
            singularity_epsilon_deg: DEFAULT_SINGULARITY_EPSILON_DEG,
            chain: describe_chain(topology, &pivot),
        })
    }

    /// Override the singularity threshold
    pub fn with_singularity_epsilon(mut self, epsilon_deg: f64) -> Result<Self, GeometryError> {
        if !epsilon_deg.is_finite() || epsilon_deg <= 0.0 {
            return Err(GeometryError::InvalidTolerance {
                field: "singularity_epsilon_deg".to_string(),
                value: epsilon_deg,
            });
        }
        self.singularity_epsilon_deg = epsilon_deg;
        Ok(self)
    }

    pub fn topology(&self) -> KinematicTopology {
        self.topology
    }

    pub fn pivot(&self) -> &PivotGeometry {
        &self.pivot
    }

    pub fn kinematic_chain(&self) -> &str {
        &self.chain
    }

    /// Compensate one programmed position
    pub fn compensate(
        &self,
        input: &CompensationInput,
        tolerance_mm: f64,
    ) -> Result<CompensationResult, GeometryError> {
        input.validate()?;
        if !tolerance_mm.is_finite() || tolerance_mm < 0.0 {
            return Err(GeometryError::InvalidTolerance {
                field: "tolerance_mm".to_string(),
                value: tolerance_mm,
            });
        }

        let programmed = input.programmed();
        let delta = self.displacement(&programmed, input.a_deg, input.c_deg);
        let command = programmed + delta;
        let error = delta.norm();

        debug!(
            topology = %self.topology,
            a = input.a_deg,
            c = input.c_deg,
            error_mm = error,
            "RTCP compensation"
        );

        Ok(CompensationResult {
            x: command.x,
            y: command.y,
            z: command.z,
            compensation_vector: LinearOffset::from_vector(delta),
            kinematic_chain: self.chain.clone(),
            tool_tip_error_without_rtcp_mm: error,
            within_tolerance: error <= tolerance_mm,
        })
    }

    /// Compensate a motion point, producing a new point at the linear command
    pub fn compensate_point(
        &self,
        point: &MotionPoint,
        tolerance_mm: f64,
    ) -> Result<(MotionPoint, CompensationResult), GeometryError> {
        let result = self.compensate(&CompensationInput::from_point(point), tolerance_mm)?;
        Ok((point.with_position(result.x, result.y, result.z), result))
    }

    /// Compensate every point of a path in order
    pub fn compensate_path(
        &self,
        points: &[MotionPoint],
        tolerance_mm: f64,
    ) -> Result<Vec<(MotionPoint, CompensationResult)>, GeometryError> {
        points
            .iter()
            .map(|point| self.compensate_point(point, tolerance_mm))
            .collect()
    }

    /// Check a compensated point against travel limits and the tilt singularity
    ///
    /// Limit checks never stop compensation; this is the explicit safety gate.
    pub fn validate(
        &self,
        input: &CompensationInput,
        limits: &AxisLimits,
    ) -> Result<RtcpValidation, GeometryError> {
        let result = self.compensate(input, 0.0)?;
        let mut warnings = Vec::new();

        let commands = [
            (Axis::X, result.x),
            (Axis::Y, result.y),
            (Axis::Z, result.z),
            (Axis::A, input.a_deg),
            (Axis::C, input.c_deg),
        ];
        for (axis, value) in commands {
            let Some(range) = limits.range(axis) else {
                continue;
            };
            if !range.contains(value) {
                warnings.push(format!(
                    "{} command {:.3} {} outside [{:.3}, {:.3}]",
                    axis,
                    value,
                    axis.unit(),
                    range.min,
                    range.max
                ));
            }
        }
        let axis_limits_ok = warnings.is_empty();

        let singularity_risk = self.is_near_singularity(input.a_deg);
        if singularity_risk {
            warnings.push(format!(
                "Tilt {:.3} deg is within {:.3} deg of the C-axis singularity",
                input.a_deg, self.singularity_epsilon_deg
            ));
            warn!(a = input.a_deg, "RTCP point near kinematic singularity");
        }

        Ok(RtcpValidation {
            safe: axis_limits_ok,
            axis_limits_ok,
            singularity_risk,
            warnings,
        })
    }

    /// Whether a tilt angle leaves the C axis kinematically redundant
    pub fn is_near_singularity(&self, tilt_deg: f64) -> bool {
        tilt_deg.abs() < self.singularity_epsilon_deg
    }

    fn displacement(&self, programmed: &Point3<f64>, a_deg: f64, c_deg: f64) -> Vector3<f64> {
        let table_pivot = Point3::new(0.0, 0.0, -self.pivot.pivot_to_table_mm);
        let tool = Vector3::new(0.0, 0.0, -self.pivot.head_lever_mm());

        match self.topology {
            KinematicTopology::TableTable => {
                // C platter rides on the A trunnion
                let rotation = rot_x(a_deg) * rot_z(c_deg);
                table_shift(programmed, &table_pivot, &rotation)
            }
            KinematicTopology::HeadHead => {
                // A fork hangs from the C swivel
                let rotation = rot_z(c_deg) * rot_x(a_deg);
                head_shift(&tool, &rotation)
            }
            KinematicTopology::MixedAC => {
                table_shift(programmed, &table_pivot, &rot_z(c_deg))
                    + head_shift(&tool, &rot_x(a_deg))
            }
            KinematicTopology::MixedBC => {
                table_shift(programmed, &table_pivot, &rot_z(c_deg))
                    + head_shift(&tool, &rot_y(a_deg))
            }
            KinematicTopology::HeadTable => {
                table_shift(programmed, &table_pivot, &rot_x(a_deg))
                    + head_shift(&tool, &rot_z(c_deg))
            }
        }
    }
}

/// Compensate a single position without keeping a compensator around
#[allow(clippy::too_many_arguments)]
pub fn compensate(
    topology: KinematicTopology,
    pivot: &PivotGeometry,
    a_deg: f64,
    c_deg: f64,
    x: f64,
    y: f64,
    z: f64,
    tolerance_mm: f64,
) -> Result<CompensationResult, GeometryError> {
    RtcpCompensator::new(topology, *pivot)?
        .compensate(&CompensationInput::new(a_deg, c_deg, x, y, z), tolerance_mm)
}

fn rot_x(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), deg.to_radians())
}

fn rot_y(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), deg.to_radians())
}

fn rot_z(deg: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), deg.to_radians())
}

/// Where a part point ends up after the table rotates about `pivot`, relative to where it was
fn table_shift(point: &Point3<f64>, pivot: &Point3<f64>, rotation: &Rotation3<f64>) -> Vector3<f64> {
    let moved = pivot + rotation * (point - pivot);
    moved - point
}

/// Linear move that cancels the tip swing of a rotated head
fn head_shift(tool: &Vector3<f64>, rotation: &Rotation3<f64>) -> Vector3<f64> {
    tool - rotation * tool
}

fn describe_chain(topology: KinematicTopology, pivot: &PivotGeometry) -> String {
    let table = format!("pivot {:.3} mm below table", pivot.pivot_to_table_mm);
    let head = format!(
        "lever {:.3} mm (gauge {:.3} + tool {:.3})",
        pivot.head_lever_mm(),
        pivot.pivot_to_gauge_mm,
        pivot.effective_tool_length_mm()
    );
    match topology {
        KinematicTopology::TableTable => format!("table A(X) -> table C(Z), {}", table),
        KinematicTopology::HeadHead => format!("head C(Z) -> head A(X), {}", head),
        KinematicTopology::MixedAC => format!("head A(X) {} + table C(Z) {}", head, table),
        KinematicTopology::MixedBC => format!("head B(Y) {} + table C(Z) {}", head, table),
        KinematicTopology::HeadTable => format!("table A(X) {} + head C(Z) {}", table, head),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pivot() -> PivotGeometry {
        PivotGeometry {
            pivot_to_gauge_mm: 120.0,
            pivot_to_table_mm: 100.0,
            tool_length_mm: 80.0,
            tool_gauge_length_mm: 0.0,
        }
    }

    #[test]
    fn test_table_table_quarter_turn_about_a() {
        // Point on the table surface straight above the pivot line
        let comp = RtcpCompensator::new(KinematicTopology::TableTable, pivot()).unwrap();
        let result = comp
            .compensate(&CompensationInput::new(90.0, 0.0, 0.0, 0.0, 0.0), 0.01)
            .unwrap();

        // (0, 0, 100) from the pivot swings to (0, -100, 0)
        assert!((result.x - 0.0).abs() < 1e-9);
        assert!((result.y + 100.0).abs() < 1e-9);
        assert!((result.z + 100.0).abs() < 1e-9);
        assert!((result.tool_tip_error_without_rtcp_mm - 100.0 * 2f64.sqrt()).abs() < 1e-9);
        assert!(!result.within_tolerance);
    }

    #[test]
    fn test_head_head_tilt_moves_pivot_against_swing() {
        let comp = RtcpCompensator::new(KinematicTopology::HeadHead, pivot()).unwrap();
        let result = comp
            .compensate(&CompensationInput::new(90.0, 0.0, 10.0, 20.0, 30.0), 0.01)
            .unwrap();

        // Lever 200 mm: tip swings from -Z to +Y, pivot must move -Y and -Z
        assert!((result.compensation_vector.dx).abs() < 1e-9);
        assert!((result.compensation_vector.dy + 200.0).abs() < 1e-9);
        assert!((result.compensation_vector.dz + 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_head_c_swivel_alone_needs_no_correction() {
        let comp = RtcpCompensator::new(KinematicTopology::HeadHead, pivot()).unwrap();
        let result = comp
            .compensate(&CompensationInput::new(0.0, 75.0, 10.0, 20.0, 30.0), 0.001)
            .unwrap();
        assert!(result.tool_tip_error_without_rtcp_mm < 1e-9);
        assert!(result.within_tolerance);
    }

    #[test]
    fn test_bias_is_folded_into_programmed_position() {
        let comp = RtcpCompensator::new(KinematicTopology::MixedAC, pivot()).unwrap();
        let input =
            CompensationInput::new(0.0, 0.0, 5.0, 5.0, 5.0).with_bias(LinearOffset::new(0.1, -0.2, 0.0));
        let result = comp.compensate(&input, 0.01).unwrap();
        assert!((result.x - 5.1).abs() < 1e-12);
        assert!((result.y - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_chain_description_names_members() {
        let comp = RtcpCompensator::new(KinematicTopology::MixedBC, pivot()).unwrap();
        assert!(comp.kinematic_chain().contains("head B(Y)"));
        assert!(comp.kinematic_chain().contains("table C(Z)"));
    }

    #[test]
    fn test_rejects_non_finite_input_and_negative_tolerance() {
        let comp = RtcpCompensator::new(KinematicTopology::TableTable, pivot()).unwrap();
        let bad = CompensationInput::new(f64::NAN, 0.0, 0.0, 0.0, 0.0);
        assert!(comp.compensate(&bad, 0.01).is_err());

        let ok = CompensationInput::new(1.0, 0.0, 0.0, 0.0, 0.0);
        assert!(matches!(
            comp.compensate(&ok, -1.0),
            Err(GeometryError::InvalidTolerance { .. })
        ));
    }

    #[test]
    fn test_singularity_epsilon_must_be_positive() {
        let comp = RtcpCompensator::new(KinematicTopology::TableTable, pivot()).unwrap();
        assert!(comp.clone().with_singularity_epsilon(0.0).is_err());
        let comp = comp.with_singularity_epsilon(2.0).unwrap();
        assert!(comp.is_near_singularity(1.5));
        assert!(!comp.is_near_singularity(-2.5));
    }
}
