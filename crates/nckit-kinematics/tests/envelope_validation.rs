use nckit_core::{Axis, AxisLimits, AxisRange, LimitsError, MotionPoint};
use nckit_kinematics::envelope::{self, EnvelopeCheck, EnvelopeValidator, Severity};
use proptest::prelude::*;

fn mill_limits() -> AxisLimits {
    AxisLimits::linear(
        AxisRange::new(0.0, 500.0),
        AxisRange::new(0.0, 400.0),
        AxisRange::new(-300.0, 100.0),
    )
}

#[test]
fn test_overshoot_is_exact() {
    let points = vec![MotionPoint::feed(600.0, 100.0, -10.0, 300.0)];
    let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();

    assert_eq!(report.violations.len(), 1);
    let violation = &report.violations[0];
    assert_eq!(violation.axis, Axis::X);
    assert_eq!(violation.axis.to_string(), "X");
    assert_eq!(violation.overshoot_mm, 100.0);
    assert_eq!(violation.limit, 500.0);
    assert!(!report.is_valid);
}

#[test]
fn test_below_minimum_is_negative_overshoot() {
    let points = vec![MotionPoint::feed(10.0, 10.0, -325.0, 100.0)];
    let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].axis, Axis::Z);
    assert_eq!(report.violations[0].overshoot_mm, -25.0);
}

#[test]
fn test_rapid_overshoot_is_critical_feed_is_not() {
    let rapid = vec![MotionPoint::rapid(501.0, 10.0, 0.0)];
    let feed = vec![MotionPoint::feed(501.0, 10.0, 0.0, 800.0)];

    let rapid_report = envelope::validate(&mill_limits(), &rapid, 0.0, 0.0, 0.0, 0.0).unwrap();
    let feed_report = envelope::validate(&mill_limits(), &feed, 0.0, 0.0, 0.0, 0.0).unwrap();

    assert_eq!(rapid_report.violations[0].severity, Severity::Critical);
    assert!(rapid_report.violations[0].is_rapid);
    assert_eq!(feed_report.violations[0].severity, Severity::Warning);
    assert!(rapid_report.has_critical());
    assert!(!feed_report.has_critical());
}

#[test]
fn test_safety_margin_shrinks_limits() {
    let points = vec![MotionPoint::feed(497.0, 10.0, 0.0, 300.0)];
    let plain = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();
    let margined = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 5.0).unwrap();

    assert!(plain.is_valid);
    assert!(!margined.is_valid);
    assert_eq!(margined.violations[0].limit, 495.0);
    assert_eq!(margined.violations[0].overshoot_mm, 2.0);
}

#[test]
fn test_inverted_bounds_are_structural() {
    let mut limits = mill_limits();
    limits.y = AxisRange::new(400.0, 0.0);
    assert!(envelope::validate(&limits, &[], 0.0, 0.0, 0.0, 0.0).is_err());
}

#[test]
fn test_bounding_box_and_utilization() {
    let points = vec![
        MotionPoint::rapid(0.0, 0.0, 50.0),
        MotionPoint::feed(250.0, 100.0, -5.0, 200.0),
        MotionPoint::rapid(0.0, 0.0, 50.0),
    ];
    let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();

    let bbox = report.bounding_box.as_ref().unwrap();
    let x = bbox.extent(Axis::X).unwrap();
    assert_eq!((x.min, x.max), (0.0, 250.0));
    let z = bbox.extent(Axis::Z).unwrap();
    assert_eq!((z.min, z.max), (-5.0, 50.0));

    let x_util = report.utilization.iter().find(|u| u.axis == Axis::X).unwrap();
    assert_eq!(x_util.percent, 50.0);
    let y_util = report.utilization.iter().find(|u| u.axis == Axis::Y).unwrap();
    assert_eq!(y_util.percent, 25.0);
}

#[test]
fn test_rotary_c_is_checked_when_configured() {
    let limits = mill_limits().with_c(AxisRange::new(-180.0, 180.0));
    let points = vec![MotionPoint::feed(10.0, 10.0, 0.0, 100.0).with_rotary(0.0, 200.0)];
    let report = envelope::validate(&limits, &points, 0.0, 0.0, 0.0, 10.0).unwrap();

    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].axis, Axis::C);
    // Margin applies to linear travel only
    assert_eq!(report.violations[0].overshoot_mm, 20.0);
}

#[test]
fn test_retract_plane_is_checked_as_rapid() {
    let points = vec![MotionPoint::drill(10.0, 10.0, -20.0, 150.0, 100.0)];
    let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();

    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].axis, Axis::Z);
    assert_eq!(report.violations[0].severity, Severity::Critical);
}

#[test]
fn test_z_clearance_warning() {
    let validator = EnvelopeValidator::new(
        mill_limits(),
        EnvelopeCheck {
            tool_length_mm: 150.0,
            workpiece_height_mm: 200.0,
            fixture_height_mm: 100.0,
            safety_margin_mm: 0.0,
        },
    )
    .unwrap();
    let report = validator
        .validate(&[MotionPoint::rapid(0.0, 0.0, 0.0)])
        .unwrap();

    assert_eq!(report.z_clearance_mm, Some(-50.0));
    assert!(report.is_valid);
    assert!(report.warnings.iter().any(|w| w.contains("cannot clear")));
}

#[test]
fn test_empty_toolpath_is_valid_with_warning() {
    let report = envelope::validate(&mill_limits(), &[], 0.0, 0.0, 0.0, 0.0).unwrap();
    assert!(report.is_valid);
    assert!(report.bounding_box.is_none());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_non_finite_coordinate_is_rejected() {
    let err = envelope::validate(
        &mill_limits(),
        &[MotionPoint::rapid(f64::NAN, 0.0, 0.0)],
        0.0,
        0.0,
        0.0,
        0.0,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LimitsError::NonFiniteCoordinate { point_index: 0, ref axis } if axis == "X"
    ));

    let mut hole = MotionPoint::drill(10.0, 10.0, -5.0, 2.0, 100.0);
    hole.retract_z = Some(f64::INFINITY);
    let points = [MotionPoint::feed(10.0, 10.0, 0.0, 100.0), hole];
    let err = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap_err();
    assert!(matches!(
        err,
        LimitsError::NonFiniteCoordinate { point_index: 1, ref axis } if axis == "Z"
    ));
}

#[test]
fn test_worst_violation() {
    let points = vec![
        MotionPoint::feed(510.0, 10.0, 0.0, 100.0),
        MotionPoint::feed(10.0, -40.0, 0.0, 100.0),
    ];
    let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();
    let worst = report.worst_violation().unwrap();
    assert_eq!(worst.axis, Axis::Y);
    assert_eq!(worst.point_index, 1);
}

#[test]
fn test_report_serializes_for_dispatch() {
    let points = vec![MotionPoint::rapid(520.0, 10.0, 0.0)];
    let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["is_valid"], false);
    assert_eq!(value["violations"][0]["axis"], "X");
    assert_eq!(value["violations"][0]["severity"], "critical");
    assert_eq!(value["violations"][0]["overshoot_mm"], 20.0);
}

proptest! {
    #[test]
    fn prop_points_inside_are_valid(
        coords in prop::collection::vec((0.5f64..499.5, 0.5f64..399.5, -299.5f64..99.5, any::<bool>()), 0..40)
    ) {
        let points: Vec<MotionPoint> = coords
            .into_iter()
            .map(|(x, y, z, rapid)| {
                if rapid {
                    MotionPoint::rapid(x, y, z)
                } else {
                    MotionPoint::feed(x, y, z, 100.0)
                }
            })
            .collect();
        let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();
        prop_assert!(report.violations.is_empty());
        prop_assert!(report.is_valid);
    }

    #[test]
    fn prop_validity_matches_violations(
        xs in prop::collection::vec(-200.0f64..800.0, 1..30)
    ) {
        let points: Vec<MotionPoint> = xs.into_iter().map(|x| MotionPoint::rapid(x, 10.0, 0.0)).collect();
        let report = envelope::validate(&mill_limits(), &points, 0.0, 0.0, 0.0, 0.0).unwrap();
        prop_assert_eq!(report.is_valid, report.violations.is_empty());
    }
}
