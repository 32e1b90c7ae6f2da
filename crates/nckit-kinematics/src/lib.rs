//! # NCKit Kinematics
//!
//! The two motion-safety stages that run before any code is emitted:
//!
//! - **RTCP compensation** ([`rtcp`]): turns programmed tool-tip positions
//!   with rotary angles into linear-axis commands for each kinematic
//!   topology, with singularity detection.
//! - **Work envelope validation** ([`envelope`]): checks every axis command
//!   against physical travel, grading rapid overshoots as critical.
//!
//! Both are pure functions of their inputs; the compensator and validator
//! values are immutable after construction.

pub mod envelope;
pub mod rtcp;

pub use envelope::{
    AxisExtent, AxisUtilization, BoundingBox, EnvelopeCheck, EnvelopeReport, EnvelopeValidator,
    EnvelopeViolation, Severity,
};
pub use rtcp::{
    CompensationInput, CompensationResult, LinearOffset, RtcpCompensator, RtcpValidation,
    DEFAULT_SINGULARITY_EPSILON_DEG,
};
