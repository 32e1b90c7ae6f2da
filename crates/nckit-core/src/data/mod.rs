//! Data models for programmed motion
//!
//! This module provides:
//! - Axis identifiers for linear (X, Y, Z) and rotary (A, B, C) axes
//! - Move kinds produced by the upstream CAM stage
//! - `MotionPoint`, a single programmed position with its move parameters
//! - Machine configuration models (see [`machine`])
//!
//! Motion points are read-only inputs. Every transform in NCKit produces a
//! new point instead of rewriting the one it was given.

pub mod machine;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// Linear X
    X,
    /// Linear Y
    Y,
    /// Linear Z
    Z,
    /// Rotary about X
    A,
    /// Rotary about Y
    B,
    /// Rotary about Z
    C,
}

impl Axis {
    /// The three linear axes in program order
    pub const LINEAR: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Whether the axis is rotary (values in degrees)
    pub fn is_rotary(self) -> bool {
        matches!(self, Axis::A | Axis::B | Axis::C)
    }

    /// Unit label for values on this axis
    pub fn unit(self) -> &'static str {
        if self.is_rotary() {
            "deg"
        } else {
            "mm"
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::A => "A",
            Axis::B => "B",
            Axis::C => "C",
        };
        f.write_str(letter)
    }
}

/// Kind of programmed move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    /// Rapid traverse positioning
    Rapid,
    /// Linear feed / contour move
    Feed,
    /// Drilled hole
    Drill,
    /// Tapped hole
    Tap,
    /// Bored hole
    Bore,
    /// Reamed hole
    Ream,
    /// Chamfer contour
    Chamfer,
    /// Thread-milling contour
    Thread,
}

impl MoveKind {
    /// Hole-making kinds that can be collapsed into canned cycles
    pub fn is_hole(self) -> bool {
        matches!(
            self,
            MoveKind::Drill | MoveKind::Tap | MoveKind::Bore | MoveKind::Ream
        )
    }

    /// Kinds that are emitted as contour moves at feed
    pub fn is_contour(self) -> bool {
        matches!(self, MoveKind::Feed | MoveKind::Chamfer | MoveKind::Thread)
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rapid => write!(f, "rapid"),
            Self::Feed => write!(f, "feed"),
            Self::Drill => write!(f, "drill"),
            Self::Tap => write!(f, "tap"),
            Self::Bore => write!(f, "bore"),
            Self::Ream => write!(f, "ream"),
            Self::Chamfer => write!(f, "chamfer"),
            Self::Thread => write!(f, "thread"),
        }
    }
}

/// A single programmed position
///
/// Linear coordinates are in millimeters, rotary coordinates in degrees.
/// For hole kinds `z` is the hole bottom and `retract_z` the retract plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionPoint {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
    /// A-axis position, when the move carries one
    #[serde(default)]
    pub a: Option<f64>,
    /// C-axis position, when the move carries one
    #[serde(default)]
    pub c: Option<f64>,
    /// Move classification
    pub kind: MoveKind,
    /// Feed rate in mm/min
    #[serde(default)]
    pub feed_rate: Option<f64>,
    /// Thread pitch for taps, mm per revolution
    #[serde(default)]
    pub tap_pitch_mm: Option<f64>,
    /// Retract plane for hole kinds
    #[serde(default)]
    pub retract_z: Option<f64>,
    /// Peck increment for drilled holes
    #[serde(default)]
    pub peck_depth_mm: Option<f64>,
    /// Dwell at hole bottom in seconds
    #[serde(default)]
    pub dwell_s: Option<f64>,
}

impl MotionPoint {
    fn base(kind: MoveKind, x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            a: None,
            c: None,
            kind,
            feed_rate: None,
            tap_pitch_mm: None,
            retract_z: None,
            peck_depth_mm: None,
            dwell_s: None,
        }
    }

    /// Rapid traverse to a position
    pub fn rapid(x: f64, y: f64, z: f64) -> Self {
        Self::base(MoveKind::Rapid, x, y, z)
    }

    /// Linear feed move
    pub fn feed(x: f64, y: f64, z: f64, feed_rate: f64) -> Self {
        Self::base(MoveKind::Feed, x, y, z).with_feed(feed_rate)
    }

    /// Chamfer contour move
    pub fn chamfer(x: f64, y: f64, z: f64, feed_rate: f64) -> Self {
        Self::base(MoveKind::Chamfer, x, y, z).with_feed(feed_rate)
    }

    /// Thread-milling contour move
    pub fn thread(x: f64, y: f64, z: f64, feed_rate: f64) -> Self {
        Self::base(MoveKind::Thread, x, y, z).with_feed(feed_rate)
    }

    /// Drilled hole at (x, y) down to `bottom_z`
    pub fn drill(x: f64, y: f64, bottom_z: f64, retract_z: f64, feed_rate: f64) -> Self {
        Self::hole(MoveKind::Drill, x, y, bottom_z, retract_z).with_feed(feed_rate)
    }

    /// Bored hole at (x, y) down to `bottom_z`
    pub fn bore(x: f64, y: f64, bottom_z: f64, retract_z: f64, feed_rate: f64) -> Self {
        Self::hole(MoveKind::Bore, x, y, bottom_z, retract_z).with_feed(feed_rate)
    }

    /// Reamed hole at (x, y) down to `bottom_z`
    pub fn ream(x: f64, y: f64, bottom_z: f64, retract_z: f64, feed_rate: f64) -> Self {
        Self::hole(MoveKind::Ream, x, y, bottom_z, retract_z).with_feed(feed_rate)
    }

    /// Tapped hole; the feed is derived from pitch and spindle speed at post time
    pub fn tap(x: f64, y: f64, bottom_z: f64, retract_z: f64, pitch_mm: f64) -> Self {
        let mut point = Self::hole(MoveKind::Tap, x, y, bottom_z, retract_z);
        point.tap_pitch_mm = Some(pitch_mm);
        point
    }

    fn hole(kind: MoveKind, x: f64, y: f64, bottom_z: f64, retract_z: f64) -> Self {
        let mut point = Self::base(kind, x, y, bottom_z);
        point.retract_z = Some(retract_z);
        point
    }

    /// Attach rotary coordinates
    pub fn with_rotary(mut self, a_deg: f64, c_deg: f64) -> Self {
        self.a = Some(a_deg);
        self.c = Some(c_deg);
        self
    }

    /// Set the feed rate
    pub fn with_feed(mut self, feed_rate: f64) -> Self {
        self.feed_rate = Some(feed_rate);
        self
    }

    /// Set the peck increment
    pub fn with_peck(mut self, peck_depth_mm: f64) -> Self {
        self.peck_depth_mm = Some(peck_depth_mm);
        self
    }

    /// Set the bottom dwell
    pub fn with_dwell(mut self, dwell_s: f64) -> Self {
        self.dwell_s = Some(dwell_s);
        self
    }

    /// A copy of this point moved to new linear coordinates
    pub fn with_position(mut self, x: f64, y: f64, z: f64) -> Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    /// Whether this move is a rapid traverse
    pub fn is_rapid(&self) -> bool {
        self.kind == MoveKind::Rapid
    }

    /// Whether the move carries any rotary coordinate
    pub fn has_rotary(&self) -> bool {
        self.a.is_some() || self.c.is_some()
    }

    /// Rotary angles with missing axes read as zero
    pub fn rotary_or_zero(&self) -> (f64, f64) {
        (self.a.unwrap_or(0.0), self.c.unwrap_or(0.0))
    }

    /// Coordinate value on the given axis, if the move carries it
    pub fn coordinate(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => Some(self.x),
            Axis::Y => Some(self.y),
            Axis::Z => Some(self.z),
            Axis::A => self.a,
            Axis::B => None,
            Axis::C => self.c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_display_and_units() {
        assert_eq!(Axis::X.to_string(), "X");
        assert_eq!(Axis::C.to_string(), "C");
        assert_eq!(Axis::Z.unit(), "mm");
        assert_eq!(Axis::A.unit(), "deg");
        assert!(!Axis::Y.is_rotary());
    }

    #[test]
    fn test_move_kind_classes() {
        assert!(MoveKind::Drill.is_hole());
        assert!(MoveKind::Ream.is_hole());
        assert!(!MoveKind::Chamfer.is_hole());
        assert!(MoveKind::Thread.is_contour());
        assert!(!MoveKind::Rapid.is_contour());
    }

    #[test]
    fn test_with_position_leaves_original_untouched() {
        let original = MotionPoint::feed(1.0, 2.0, 3.0, 100.0).with_rotary(10.0, 20.0);
        let moved = original.with_position(4.0, 5.0, 6.0);

        assert_eq!(original.x, 1.0);
        assert_eq!(moved.x, 4.0);
        assert_eq!(moved.a, Some(10.0));
        assert_eq!(moved.feed_rate, Some(100.0));
    }

    #[test]
    fn test_hole_constructors() {
        let tap = MotionPoint::tap(10.0, 10.0, -12.0, 2.0, 1.25);
        assert_eq!(tap.kind, MoveKind::Tap);
        assert_eq!(tap.retract_z, Some(2.0));
        assert_eq!(tap.tap_pitch_mm, Some(1.25));
        assert_eq!(tap.feed_rate, None);

        let drill = MotionPoint::drill(0.0, 0.0, -5.0, 2.0, 120.0).with_peck(1.5);
        assert_eq!(drill.peck_depth_mm, Some(1.5));
        assert_eq!(drill.coordinate(Axis::Z), Some(-5.0));
        assert_eq!(drill.coordinate(Axis::C), None);
    }

    #[test]
    fn test_motion_point_serde_kind_names() {
        let json = serde_json::to_string(&MotionPoint::rapid(0.0, 0.0, 50.0)).unwrap();
        assert!(json.contains("\"kind\":\"rapid\""));

        let parsed: MotionPoint =
            serde_json::from_str(r#"{"x":1.0,"y":2.0,"z":-1.0,"kind":"chamfer","feed_rate":300.0}"#)
                .unwrap();
        assert_eq!(parsed.kind, MoveKind::Chamfer);
        assert_eq!(parsed.a, None);
    }
}
