//! # NCKit Post
//!
//! Turns a validated move list into controller-native NC text for Fanuc,
//! Haas, Siemens, Heidenhain, Mazak and Okuma controls.
//!
//! Generation runs in two stages. The [`emitter`] decides what the program
//! does as a sequence of dialect-independent [`Block`]s (safe start, tool
//! change, moves, canned cycles, TCPM switching); a [`BlockRenderer`] per
//! controller spells each block using that controller's static
//! [`DialectTable`]. Output is produced lazily, line by line.
//!
//! ```
//! use nckit_core::MotionPoint;
//! use nckit_post::{ControllerDialect, PostConfig, PostProcessor};
//!
//! let post = PostProcessor::new(ControllerDialect::Fanuc, PostConfig::default()).unwrap();
//! let output = post.process(&[MotionPoint::rapid(0.0, 0.0, 50.0)]);
//! assert!(output.gcode.contains("G00 X0.000 Y0.000 Z50.000"));
//! ```

pub mod block;
pub mod config;
pub mod dialect;
pub mod emitter;
pub mod error;
pub mod postprocessor;
pub mod render;

pub use block::{Block, CycleKind, CycleSpec, Position, SpindleDirection};
pub use config::{Coolant, FiveAxisMode, PostConfig, WorkOffset};
pub use dialect::{ControllerDialect, CycleCodes, DialectTable};
pub use emitter::{BlockStream, LineStream};
pub use error::{PostError, PostResult};
pub use postprocessor::{process, PostOutput, PostProcessor, PostSummary};
pub use render::{renderer_for, BlockRenderer, NumberFormat};
