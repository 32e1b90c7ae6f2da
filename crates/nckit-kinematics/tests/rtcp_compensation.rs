use nckit_core::{AxisLimits, AxisRange, KinematicTopology, MotionPoint, PivotGeometry};
use nckit_kinematics::rtcp::{self, CompensationInput, RtcpCompensator};
use proptest::prelude::*;

fn trunnion_pivot() -> PivotGeometry {
    PivotGeometry {
        pivot_to_gauge_mm: 150.0,
        pivot_to_table_mm: 100.0,
        tool_length_mm: 75.0,
        tool_gauge_length_mm: 0.0,
    }
}

fn tip_error(topology: KinematicTopology, a_deg: f64) -> f64 {
    rtcp::compensate(topology, &trunnion_pivot(), a_deg, 0.0, 50.0, 20.0, 0.0, 0.01)
        .unwrap()
        .tool_tip_error_without_rtcp_mm
}

#[test]
fn test_identity_at_zero_angles_for_every_topology() {
    for &topology in KinematicTopology::all() {
        let result =
            rtcp::compensate(topology, &trunnion_pivot(), 0.0, 0.0, 123.4, -56.7, -8.9, 0.001)
                .unwrap();
        assert!((result.x - 123.4).abs() < 1e-9, "{topology}: x");
        assert!((result.y + 56.7).abs() < 1e-9, "{topology}: y");
        assert!((result.z + 8.9).abs() < 1e-9, "{topology}: z");
        assert!(result.tool_tip_error_without_rtcp_mm < 1e-9);
        assert!(result.within_tolerance);
    }
}

#[test]
fn test_c_rotation_moves_the_tip_only_off_its_axis() {
    let error = |topology, a_deg, c_deg, x, y| {
        rtcp::compensate(topology, &trunnion_pivot(), a_deg, c_deg, x, y, 0.0, 0.01)
            .unwrap()
            .tool_tip_error_without_rtcp_mm
    };

    // Table C sweeps off-centre points through a growing chord
    let at_30 = error(KinematicTopology::TableTable, 0.0, 30.0, 50.0, 20.0);
    let at_90 = error(KinematicTopology::TableTable, 0.0, 90.0, 50.0, 20.0);
    assert!(at_90 > at_30 && at_30 > 0.0, "{at_30} {at_90}");
    assert!(error(KinematicTopology::TableTable, 0.0, 90.0, 0.0, 0.0) < 1e-9);

    // Head C spins the tilted tool about the gauge axis
    let c_0 = error(KinematicTopology::HeadHead, 10.0, 0.0, 50.0, 20.0);
    let c_45 = error(KinematicTopology::HeadHead, 10.0, 45.0, 50.0, 20.0);
    assert!((c_0 - c_45).abs() < 1e-9, "{c_0} {c_45}");
    assert!(c_0 > 0.0);
}

#[test]
fn test_error_grows_with_tilt() {
    for &topology in KinematicTopology::all() {
        let at_0 = tip_error(topology, 0.0);
        let at_5 = tip_error(topology, 5.0);
        let at_45 = tip_error(topology, 45.0);
        assert!(at_45 > at_5, "{topology}: {at_45} <= {at_5}");
        assert!(at_5 > at_0, "{topology}: {at_5} <= {at_0}");
        assert!(at_0.abs() < 1e-9);
    }
}

#[test]
fn test_singularity_threshold() {
    let comp = RtcpCompensator::new(KinematicTopology::TableTable, trunnion_pivot()).unwrap();
    let limits = AxisLimits::default();

    let near = comp
        .validate(&CompensationInput::new(0.2, 30.0, 10.0, 10.0, 0.0), &limits)
        .unwrap();
    assert!(near.singularity_risk);

    for a_deg in [5.0, 10.0, 15.0] {
        let clear = comp
            .validate(&CompensationInput::new(a_deg, 30.0, 10.0, 10.0, 0.0), &limits)
            .unwrap();
        assert!(!clear.singularity_risk, "A={a_deg}");
    }
}

#[test]
fn test_singularity_independent_of_axis_limits() {
    let comp = RtcpCompensator::new(KinematicTopology::HeadHead, trunnion_pivot()).unwrap();
    let tight = AxisLimits::linear(
        AxisRange::new(0.0, 1.0),
        AxisRange::new(0.0, 1.0),
        AxisRange::new(0.0, 1.0),
    );

    let result = comp
        .validate(&CompensationInput::new(0.1, 0.0, 500.0, 500.0, 500.0), &tight)
        .unwrap();
    assert!(result.singularity_risk);
    assert!(!result.axis_limits_ok);
    assert!(!result.safe);
    assert!(result.warnings.iter().any(|w| w.starts_with("X command")));
}

#[test]
fn test_rotary_limits_reported_not_rejected() {
    let comp = RtcpCompensator::new(KinematicTopology::TableTable, trunnion_pivot()).unwrap();
    let limits = AxisLimits::default()
        .with_a(AxisRange::new(-30.0, 120.0))
        .with_c(AxisRange::new(-360.0, 360.0));

    let input = CompensationInput::new(-45.0, 0.0, 100.0, 100.0, 0.0);
    // Compensation still succeeds outside the A range
    assert!(comp.compensate(&input, 0.01).is_ok());

    let check = comp.validate(&input, &limits).unwrap();
    assert!(!check.axis_limits_ok);
    assert!(check.warnings.iter().any(|w| w.starts_with("A command")));
}

#[test]
fn test_negative_tool_length_is_structural() {
    let mut pivot = trunnion_pivot();
    pivot.tool_length_mm = -10.0;
    assert!(RtcpCompensator::new(KinematicTopology::HeadHead, pivot).is_err());
}

#[test]
fn test_compensate_path_produces_new_points() {
    let comp = RtcpCompensator::new(KinematicTopology::TableTable, trunnion_pivot()).unwrap();
    let path = vec![
        MotionPoint::rapid(0.0, 0.0, 50.0),
        MotionPoint::feed(40.0, 0.0, 0.0, 500.0).with_rotary(30.0, 90.0),
    ];

    let compensated = comp.compensate_path(&path, 0.01).unwrap();
    assert_eq!(compensated.len(), 2);
    assert_eq!(compensated[0].0, path[0]);
    assert_ne!(compensated[1].0.y, path[1].y);
    assert_eq!(compensated[1].0.a, Some(30.0));
    // Input untouched
    assert_eq!(path[1].x, 40.0);
}

proptest! {
    #[test]
    fn prop_zero_angles_are_identity(
        x in -1000.0f64..1000.0,
        y in -1000.0f64..1000.0,
        z in -500.0f64..500.0,
        topology_index in 0usize..5,
    ) {
        let topology = KinematicTopology::all()[topology_index];
        let result = rtcp::compensate(topology, &trunnion_pivot(), 0.0, 0.0, x, y, z, 0.001).unwrap();
        prop_assert!((result.x - x).abs() < 1e-9);
        prop_assert!((result.y - y).abs() < 1e-9);
        prop_assert!((result.z - z).abs() < 1e-9);
    }

    #[test]
    fn prop_error_equals_compensation_magnitude(
        a in -120.0f64..120.0,
        c in -360.0f64..360.0,
        topology_index in 0usize..5,
    ) {
        let topology = KinematicTopology::all()[topology_index];
        let result = rtcp::compensate(topology, &trunnion_pivot(), a, c, 25.0, -15.0, -5.0, 0.01).unwrap();
        let magnitude = result.compensation_vector.magnitude();
        prop_assert!((magnitude - result.tool_tip_error_without_rtcp_mm).abs() < 1e-9);
    }
}
