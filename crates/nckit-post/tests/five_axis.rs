use nckit_core::MotionPoint;
use nckit_post::{process, ControllerDialect, FiveAxisMode, PostConfig};

fn rotary_moves() -> Vec<MotionPoint> {
    vec![
        MotionPoint::rapid(0.0, 0.0, 50.0),
        MotionPoint::feed(10.0, 0.0, 0.0, 300.0).with_rotary(10.0, 0.0),
        MotionPoint::feed(20.0, 0.0, 0.0, 300.0).with_rotary(20.0, 45.0),
        MotionPoint::feed(30.0, 0.0, 0.0, 300.0),
        MotionPoint::rapid(0.0, 0.0, 50.0),
    ]
}

fn config(mode: FiveAxisMode) -> PostConfig {
    PostConfig {
        five_axis_mode: mode,
        tool_number: 4,
        ..Default::default()
    }
}

#[test]
fn test_tcpm_wraps_rotary_section() {
    let output = process(&rotary_moves(), ControllerDialect::Fanuc, &config(FiveAxisMode::Tcpm)).unwrap();
    let lines: Vec<&str> = output.gcode.lines().collect();

    let on = lines.iter().position(|l| *l == "G43.4 H4").unwrap();
    assert!(lines[on + 1].contains("A10.000 C0.000"));
    let off = lines.iter().position(|l| *l == "G49").unwrap();
    assert!(off > on);
    assert!(lines[off - 1].contains("A20.000 C45.000"));
    // Length offset restored for the remaining three-axis moves
    assert_eq!(lines[off + 1], "G43 H4");
    assert_eq!(output.gcode.matches("G43.4").count(), 1);
    assert!(output.warnings.is_empty());
}

#[test]
fn test_tcpm_codes_per_dialect() {
    let expected = [
        (ControllerDialect::Fanuc, "G43.4 H4", "G49"),
        (ControllerDialect::Haas, "G234 H4", "G49"),
        (ControllerDialect::Siemens, "TRAORI", "TRAFOOF"),
        (ControllerDialect::Heidenhain, "M128 *", "M129 *"),
        (ControllerDialect::Mazak, "G43.4 H4", "G49"),
        (ControllerDialect::Okuma, "G169", "G170"),
    ];
    for (dialect, on, off) in expected {
        let output = process(&rotary_moves(), dialect, &config(FiveAxisMode::Tcpm)).unwrap();
        let lines: Vec<&str> = output.gcode.lines().collect();
        assert!(lines.contains(&on), "{} missing {}", dialect, on);
        assert!(lines.contains(&off), "{} missing {}", dialect, off);
    }
}

#[test]
fn test_unsupported_tcp_mode_warns() {
    let output = process(&rotary_moves(), ControllerDialect::Haas, &config(FiveAxisMode::Tcp)).unwrap();
    assert_eq!(output.warnings.len(), 1);
    assert!(output.warnings[0].contains("does not support TCP mode"));
    assert!(!output.gcode.contains("G234"));
    assert!(output.gcode.contains("A20.000 C45.000"));
}

#[test]
fn test_tcp_mode_on_fanuc() {
    let output = process(&rotary_moves(), ControllerDialect::Fanuc, &config(FiveAxisMode::Tcp)).unwrap();
    assert!(output.gcode.contains("\nG43.5 H4\n"));
    assert!(output.warnings.is_empty());
}

#[test]
fn test_three_plus_two_emits_tilted_plane() {
    let moves = vec![
        MotionPoint::rapid(0.0, 0.0, 50.0).with_rotary(30.0, 90.0),
        MotionPoint::feed(10.0, 0.0, 0.0, 300.0).with_rotary(30.0, 90.0),
        MotionPoint::feed(20.0, 0.0, 0.0, 300.0).with_rotary(30.0, 90.0),
    ];
    let output = process(&moves, ControllerDialect::Fanuc, &config(FiveAxisMode::ThreePlusTwo)).unwrap();

    assert_eq!(output.gcode.matches("G68.2").count(), 1);
    assert!(output
        .gcode
        .contains("G68.2 X0 Y0 Z0 I90.000 J30.000 K0\nG53.1\n"));
    assert!(output.gcode.contains("\nG69\n"));
    assert!(!output.gcode.contains(" A30.000"));

    let siemens = process(&moves, ControllerDialect::Siemens, &config(FiveAxisMode::ThreePlusTwo)).unwrap();
    assert!(siemens.gcode.contains("CYCLE800(1,\"\",0,57,0,0,0,30.000,0,90.000,0,0,0,-1,100,1)"));
    assert!(siemens.gcode.contains("\nCYCLE800()\n"));

    let heidenhain = process(&moves, ControllerDialect::Heidenhain, &config(FiveAxisMode::ThreePlusTwo)).unwrap();
    assert!(heidenhain.gcode.contains("PLANE SPATIAL SPA30.000 SPB0 SPC90.000 TURN FMAX *"));
    assert!(heidenhain.gcode.contains("PLANE RESET STAY *"));
}

#[test]
fn test_three_plus_two_reorients_between_planes() {
    let moves = vec![
        MotionPoint::feed(0.0, 0.0, 0.0, 300.0).with_rotary(15.0, 0.0),
        MotionPoint::feed(0.0, 0.0, 0.0, 300.0).with_rotary(-15.0, 0.0),
        MotionPoint::feed(0.0, 0.0, 0.0, 300.0).with_rotary(0.0, 0.0),
    ];
    let output = process(&moves, ControllerDialect::Mazak, &config(FiveAxisMode::ThreePlusTwo)).unwrap();
    assert_eq!(output.gcode.matches("G68.2").count(), 2);
    assert_eq!(output.gcode.matches("G69").count(), 2);
}

#[test]
fn test_three_plus_two_unsupported_on_okuma() {
    let output = process(&rotary_moves(), ControllerDialect::Okuma, &config(FiveAxisMode::ThreePlusTwo)).unwrap();
    assert_eq!(output.warnings.len(), 1);
    assert!(output.gcode.contains("A10.000"));
}

#[test]
fn test_rotary_words_without_five_axis_mode() {
    let output = process(&rotary_moves(), ControllerDialect::Fanuc, &PostConfig::default()).unwrap();
    assert!(output.gcode.contains("G01 X10.000 Y0.000 Z0.000 A10.000 C0.000 F300.0"));
    assert!(!output.gcode.contains("G43.4"));
}

#[test]
fn test_three_plus_two_coordinates_are_in_plane_frame() {
    let moves = vec![
        MotionPoint::feed(0.0, 50.0, 0.0, 300.0).with_rotary(30.0, 0.0),
        MotionPoint::feed(10.0, 0.0, 0.0, 300.0).with_rotary(30.0, 90.0),
    ];
    let output = process(&moves, ControllerDialect::Fanuc, &config(FiveAxisMode::ThreePlusTwo)).unwrap();

    // Turned about X by 30 deg: Y shortens to 50 cos 30, Z drops by 50 sin 30
    assert!(output.gcode.contains("G01 X0.000 Y43.301 Z-25.000 F300.0"));
    // Turned about Z by 90 deg first, so part X lies along plane -Y
    assert!(output.gcode.contains("X0.000 Y-8.660 Z5.000"));
    assert!(!output.gcode.contains("Y50.000"));
}

#[test]
fn test_three_plus_two_hole_depth_follows_tool_axis() {
    let moves = vec![MotionPoint::drill(0.0, 50.0, -10.0, 2.0, 100.0).with_rotary(30.0, 0.0)];
    let output = process(&moves, ControllerDialect::Fanuc, &config(FiveAxisMode::ThreePlusTwo)).unwrap();

    // Bottom (0, 50, -10) lands at Y 38.301 Z -33.660 in the plane; R sits 12 above it
    assert!(output.gcode.contains("X0.000 Y38.301"));
    assert!(output.gcode.contains("G99 G81 Z-33.660 R-21.660 F100.0 K0"));
}
