//! Dialect-independent program blocks
//!
//! The emitter decides *what* happens (motion, cycles, mode switches) as a
//! sequence of [`Block`]s; a [`crate::render::BlockRenderer`] decides how each
//! one is spelled for a given controller.

use crate::config::{Coolant, FiveAxisMode, WorkOffset};
use nckit_core::{MotionPoint, MoveKind};
use serde::{Deserialize, Serialize};

/// Commanded axis position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: Option<f64>,
    pub c: Option<f64>,
}

impl Position {
    pub fn linear(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            a: None,
            c: None,
        }
    }

    pub fn with_rotary(mut self, a: Option<f64>, c: Option<f64>) -> Self {
        self.a = a;
        self.c = c;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpindleDirection {
    Clockwise,
    CounterClockwise,
}

/// Canned cycle family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    Drill,
    DwellDrill,
    PeckDrill,
    Tap,
    Ream,
    Bore,
    DwellBore,
}

impl CycleKind {
    /// Cycle implied by a hole move, `None` for anything else
    pub fn for_point(point: &MotionPoint) -> Option<Self> {
        let has_dwell = point.dwell_s.is_some_and(|d| d > 0.0);
        let has_peck = point.peck_depth_mm.is_some_and(|p| p > 0.0);
        match point.kind {
            MoveKind::Drill if has_peck => Some(Self::PeckDrill),
            MoveKind::Drill if has_dwell => Some(Self::DwellDrill),
            MoveKind::Drill => Some(Self::Drill),
            MoveKind::Tap => Some(Self::Tap),
            MoveKind::Ream => Some(Self::Ream),
            MoveKind::Bore if has_dwell => Some(Self::DwellBore),
            MoveKind::Bore => Some(Self::Bore),
            _ => None,
        }
    }

    pub fn uses_dwell(self) -> bool {
        matches!(self, Self::DwellDrill | Self::DwellBore)
    }
}

/// Everything a cycle definition carries; consecutive holes with equal
/// specs share one definition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleSpec {
    pub kind: CycleKind,
    pub bottom_z: f64,
    pub retract_z: f64,
    /// Effective feed; for taps this is pitch times spindle speed
    pub feed: Option<f64>,
    pub peck_mm: Option<f64>,
    pub dwell_s: Option<f64>,
    pub pitch_mm: Option<f64>,
    pub rpm: f64,
}

impl CycleSpec {
    /// Hole depth below the retract plane, positive downward
    pub fn depth(&self) -> f64 {
        self.retract_z - self.bottom_z
    }
}

/// One abstract program block
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Program framing, written without line numbers
    ProgramOpen { name: String, number: u32 },
    Comment(String),
    SafeStart,
    WorkOffset(WorkOffset),
    ToolChange { tool: u32, rpm: f64 },
    ToolLengthComp { tool: u32 },
    SpindleOn { rpm: f64, direction: SpindleDirection },
    SpindleStop,
    CoolantOn { coolant: Coolant, code: Option<String> },
    CoolantOff,
    Rapid(Position),
    /// `feed` is `None` when the modal feed already applies
    Linear { to: Position, feed: Option<f64> },
    Dwell { seconds: f64 },
    /// Controller-side tool-tip compensation on (`Tcpm` or `Tcp`)
    TcpmOn { mode: FiveAxisMode, tool: u32 },
    TcpmOff { mode: FiveAxisMode },
    TiltPlane { a_deg: f64, c_deg: f64 },
    TiltPlaneCancel,
    CycleDefine(CycleSpec),
    CycleLocation { x: f64, y: f64 },
    CycleCancel,
    ProgramEnd { code: Option<String> },
    ProgramClose { name: String, number: u32 },
}

impl Block {
    /// Framing lines bypass numbering and terminators
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::ProgramOpen { .. } | Self::ProgramClose { .. })
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }
}
