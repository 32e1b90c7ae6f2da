//! # NCKit Core
//!
//! Core types shared by the NCKit motion pipeline.
//! Provides the motion-point model consumed from upstream CAM, the static
//! machine description (travel limits, kinematic topology, pivot geometry)
//! and the structural error types.

pub mod data;
pub mod error;

pub use data::machine::{
    AxisLimits, AxisRange, KinematicTopology, MachineKinematics, MachineProfile, PivotGeometry,
};
pub use data::{Axis, MotionPoint, MoveKind};

pub use error::{Error, GeometryError, LimitsError, Result};
