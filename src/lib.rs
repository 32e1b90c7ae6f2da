//! # NCKit
//!
//! Motion-safety and G-code generation for multi-axis CNC machines.
//!
//! ## Architecture
//!
//! NCKit is organized as a workspace with multiple crates:
//!
//! 1. **nckit-core** - Motion points, machine profiles, structural errors
//! 2. **nckit-kinematics** - RTCP compensation and work envelope validation
//! 3. **nckit-post** - Controller dialect tables and the streaming post-processor
//! 4. **nckit-settings** - Job configuration files (JSON / TOML)
//! 5. **nckit** - The compensate → validate → emit pipeline and request engine
//!
//! ## Features
//!
//! - **Kinematic Topologies**: table-table, head-head, mixed A/C and B/C, head-table
//! - **Envelope Checks**: exact signed overshoot, rapid moves graded critical
//! - **Controllers**: Fanuc, Haas, Siemens, Heidenhain, Mazak, Okuma
//! - **Five-Axis Output**: TCPM / TCP activation and 3+2 tilted work planes
//! - **Canned Cycles**: drill, peck, dwell, tap, ream and bore families
//!
//! ```
//! use nckit::{ControllerDialect, MachineProfile, MotionPoint, Pipeline, PipelineSettings, PostConfig};
//!
//! let pipeline = Pipeline::new(MachineProfile::default(), PipelineSettings::default()).unwrap();
//! let moves = [
//!     MotionPoint::rapid(10.0, 10.0, 50.0),
//!     MotionPoint::feed(100.0, 50.0, -5.0, 200.0),
//! ];
//! let output = pipeline
//!     .run(&moves, ControllerDialect::Fanuc, &PostConfig::default())
//!     .unwrap();
//! assert!(output.is_safe());
//! assert!(output.gcode.unwrap().contains("M30"));
//! ```

pub mod engine;
pub mod error;
pub mod pipeline;

pub use engine::{Engine, Request, Response};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{run_job, CompensatedPath, Pipeline, PipelineOutput, PointCompensation};

pub use nckit_core::{
    Axis, AxisLimits, AxisRange, KinematicTopology, MachineKinematics, MachineProfile, MotionPoint,
    MoveKind, PivotGeometry,
};
pub use nckit_kinematics::{
    CompensationInput, CompensationResult, EnvelopeCheck, EnvelopeReport, EnvelopeViolation,
    LinearOffset, RtcpCompensator, RtcpValidation, Severity,
};
pub use nckit_post::{
    ControllerDialect, Coolant, FiveAxisMode, PostConfig, PostOutput, PostProcessor, WorkOffset,
};
pub use nckit_settings::{ConfigFormat, JobConfig, PipelineSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
/// - INFO as the default level
///
/// Fails if a global subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Initialize logging as one JSON object per event
///
/// For services whose log output is collected by a machine.
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
