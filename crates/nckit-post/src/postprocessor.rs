//! Post-processor entry points

use crate::config::PostConfig;
use crate::dialect::ControllerDialect;
use crate::emitter::LineStream;
use crate::error::PostResult;
use nckit_core::MotionPoint;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A complete program and its findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostOutput {
    pub gcode: String,
    pub controller: ControllerDialect,
    pub line_count: usize,
    /// Each distinct cycle code emitted, in first-use order
    pub canned_cycles_used: Vec<String>,
    pub warnings: Vec<String>,
}

/// Findings of a streamed run, without the program text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub controller: ControllerDialect,
    pub line_count: usize,
    pub canned_cycles_used: Vec<String>,
    pub warnings: Vec<String>,
}

impl PostSummary {
    fn with_gcode(self, gcode: String) -> PostOutput {
        PostOutput {
            gcode,
            controller: self.controller,
            line_count: self.line_count,
            canned_cycles_used: self.canned_cycles_used,
            warnings: self.warnings,
        }
    }
}

/// Post-processor for one controller and job configuration
///
/// Immutable once built; one value can serve any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessor {
    dialect: ControllerDialect,
    config: PostConfig,
}

impl PostProcessor {
    /// Validate the configuration and bind it to a dialect
    pub fn new(dialect: ControllerDialect, config: PostConfig) -> PostResult<Self> {
        config.validate()?;
        Ok(Self { dialect, config })
    }

    /// Same as [`PostProcessor::new`] with the dialect given by name
    pub fn from_name(dialect: &str, config: PostConfig) -> PostResult<Self> {
        Self::new(dialect.parse()?, config)
    }

    pub fn dialect(&self) -> ControllerDialect {
        self.dialect
    }

    pub fn config(&self) -> &PostConfig {
        &self.config
    }

    /// Lazily rendered program lines
    pub fn stream<'a>(&'a self, moves: &'a [MotionPoint]) -> LineStream<'a> {
        LineStream::new(moves, self.dialect, &self.config)
    }

    /// Render the whole program into memory
    pub fn process(&self, moves: &[MotionPoint]) -> PostOutput {
        let mut lines = self.stream(moves);
        let mut gcode = String::new();
        for line in lines.by_ref() {
            gcode.push_str(&line);
            gcode.push('\n');
        }
        lines.finish().with_gcode(gcode)
    }

    /// Stream the program into `writer`, one line at a time
    pub fn write_to<W: Write>(&self, moves: &[MotionPoint], mut writer: W) -> PostResult<PostSummary> {
        let mut lines = self.stream(moves);
        for line in lines.by_ref() {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(lines.finish())
    }
}

/// One-shot post-processing
pub fn process(
    moves: &[MotionPoint],
    dialect: ControllerDialect,
    config: &PostConfig,
) -> PostResult<PostOutput> {
    Ok(PostProcessor::new(dialect, config.clone())?.process(moves))
}
