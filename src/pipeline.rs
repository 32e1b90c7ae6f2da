//! Compensate, validate, emit
//!
//! A [`Pipeline`] is built once per machine and settings and is immutable
//! afterwards. Each [`Pipeline::run`] takes a programmed toolpath through
//! the three stages:
//!
//! 1. rotary points are RTCP-compensated on five-axis machines,
//! 2. the resulting axis commands are checked against machine travel,
//! 3. the program is rendered for the target controller.
//!
//! When the controller handles rotary motion itself (TCPM, TCP or a tilted
//! work plane it supports) the programmed coordinates are emitted and the
//! controller compensates; otherwise the compensated commands are emitted.
//! Envelope checking always uses the compensated commands, since those are
//! what the machine axes physically travel.

use crate::error::PipelineResult;
use nckit_core::{Axis, MachineKinematics, MachineProfile, MotionPoint};
use nckit_kinematics::{
    CompensationInput, CompensationResult, EnvelopeReport, EnvelopeValidator, RtcpCompensator,
};
use nckit_post::{ControllerDialect, FiveAxisMode, PostConfig, PostProcessor};
use nckit_settings::{JobConfig, PipelineSettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Compensation of one rotary point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCompensation {
    /// Index into the programmed toolpath
    pub index: usize,
    pub result: CompensationResult,
}

/// Axis commands for a toolpath plus what compensation found on the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensatedPath {
    /// One command per programmed point, in order
    pub commands: Vec<MotionPoint>,
    pub compensations: Vec<PointCompensation>,
    /// Rotary points whose tilt is near the C-axis singularity
    pub singularity_points: Vec<usize>,
    pub warnings: Vec<String>,
}

/// Everything one run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Program text, absent when the toolpath was rejected
    pub gcode: Option<String>,
    pub controller: ControllerDialect,
    pub line_count: usize,
    pub canned_cycles_used: Vec<String>,
    pub compensations: Vec<PointCompensation>,
    pub singularity_points: Vec<usize>,
    pub envelope: EnvelopeReport,
    /// Whether the coordinates in `gcode` are the compensated commands
    pub emitted_compensated: bool,
    pub rejected: bool,
    pub warnings: Vec<String>,
}

impl PipelineOutput {
    /// A program was produced and no axis command left the envelope
    pub fn is_safe(&self) -> bool {
        !self.rejected && self.envelope.is_valid
    }
}

/// Compensation and validation stages bound to one machine
#[derive(Debug, Clone)]
pub struct Pipeline {
    machine: MachineProfile,
    settings: PipelineSettings,
    compensator: Option<RtcpCompensator>,
    validator: EnvelopeValidator,
}

impl Pipeline {
    /// Validate the machine and settings and prepare both stages
    pub fn new(machine: MachineProfile, settings: PipelineSettings) -> PipelineResult<Self> {
        machine.validate()?;
        settings.validate()?;

        let compensator = match &machine.kinematics {
            MachineKinematics::FiveAxis {
                topology, pivot, ..
            } => Some(
                RtcpCompensator::new(*topology, *pivot)?
                    .with_singularity_epsilon(settings.singularity_epsilon_deg)?,
            ),
            _ => None,
        };
        let validator = EnvelopeValidator::new(machine.travel_limits(), settings.envelope)?;

        debug!(
            machine = %machine.name,
            chain = compensator.as_ref().map(|c| c.kinematic_chain()).unwrap_or("none"),
            "Pipeline ready"
        );

        Ok(Self {
            machine,
            settings,
            compensator,
            validator,
        })
    }

    pub fn from_job(job: &JobConfig) -> PipelineResult<Self> {
        Self::new(job.machine.clone(), job.pipeline)
    }

    pub fn machine(&self) -> &MachineProfile {
        &self.machine
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// The RTCP compensator, present on five-axis machines only
    pub fn compensator(&self) -> Option<&RtcpCompensator> {
        self.compensator.as_ref()
    }

    pub fn validator(&self) -> &EnvelopeValidator {
        &self.validator
    }

    /// Turn programmed points into axis commands
    ///
    /// Points without rotary coordinates, and every point on a machine
    /// without five-axis kinematics, pass through unchanged.
    pub fn compensate(&self, moves: &[MotionPoint]) -> PipelineResult<CompensatedPath> {
        let mut commands = Vec::with_capacity(moves.len());
        let mut compensations = Vec::new();
        let mut singularity_points = Vec::new();
        let mut warnings = Vec::new();

        let rotary_axes = self.machine.kinematics.rotary_axes();
        let unknown_rotary = moves
            .iter()
            .filter(|p| {
                (p.a.is_some() && !rotary_axes.contains(&Axis::A))
                    || (p.c.is_some() && !rotary_axes.contains(&Axis::C))
            })
            .count();
        if unknown_rotary > 0 {
            warnings.push(format!(
                "{} moves carry rotary coordinates machine '{}' does not have",
                unknown_rotary, self.machine.name
            ));
        }

        for (index, point) in moves.iter().enumerate() {
            let Some(compensator) = self.compensator.as_ref().filter(|_| point.has_rotary())
            else {
                commands.push(*point);
                continue;
            };

            let mut input = CompensationInput::from_point(point);
            if let Some(bias) = self.settings.calibration_bias {
                input = input.with_bias(bias);
            }
            let result = compensator.compensate(&input, self.settings.tolerance_mm)?;
            if compensator.is_near_singularity(input.a_deg) {
                singularity_points.push(index);
            }
            let mut command = point.with_position(result.x, result.y, result.z);
            // Hole depth must survive compensation, so the retract plane is
            // carried through the same rotation
            if let Some(retract_z) = point.retract_z {
                let retract = CompensationInput {
                    z: retract_z,
                    ..input
                };
                command.retract_z =
                    Some(compensator.compensate(&retract, self.settings.tolerance_mm)?.z);
            }
            commands.push(command);
            compensations.push(PointCompensation { index, result });
        }

        if let Some(&first) = singularity_points.first() {
            warn!(
                count = singularity_points.len(),
                first, "Rotary moves near kinematic singularity"
            );
            warnings.push(format!(
                "{} rotary moves within {:.3} deg of the C-axis singularity (first at move {})",
                singularity_points.len(),
                self.settings.singularity_epsilon_deg,
                first
            ));
        }

        Ok(CompensatedPath {
            commands,
            compensations,
            singularity_points,
            warnings,
        })
    }

    /// Check axis commands against the machine envelope
    pub fn validate(&self, commands: &[MotionPoint]) -> PipelineResult<EnvelopeReport> {
        Ok(self.validator.validate(commands)?)
    }

    /// Run all three stages
    pub fn run(
        &self,
        moves: &[MotionPoint],
        dialect: ControllerDialect,
        post_config: &PostConfig,
    ) -> PipelineResult<PipelineOutput> {
        let post = PostProcessor::new(dialect, post_config.clone())?;

        let path = self.compensate(moves)?;
        let envelope = self.validate(&path.commands)?;
        let mut warnings = path.warnings;

        if !envelope.is_valid {
            warnings.push(format!(
                "{} envelope violations ({} critical)",
                envelope.violations.len(),
                envelope.critical_count()
            ));
        }

        let mode = post_config.five_axis_mode;
        let controller_compensates =
            mode != FiveAxisMode::None && dialect.table().supports_mode(mode);
        let emitted_compensated = !path.compensations.is_empty() && !controller_compensates;

        if self.settings.reject_on_critical && envelope.has_critical() {
            let reason = match envelope.worst_violation() {
                Some(worst) => format!(
                    "Program rejected: {} rapid moves leave the work envelope (worst {} {:+.3} {} at move {})",
                    envelope.critical_count(),
                    worst.axis,
                    worst.overshoot_mm,
                    worst.axis.unit(),
                    worst.point_index
                ),
                None => "Program rejected: rapid moves leave the work envelope".to_string(),
            };
            warn!(
                machine = %self.machine.name,
                critical = envelope.critical_count(),
                "Program rejected"
            );
            warnings.push(reason);
            return Ok(PipelineOutput {
                gcode: None,
                controller: dialect,
                line_count: 0,
                canned_cycles_used: Vec::new(),
                compensations: path.compensations,
                singularity_points: path.singularity_points,
                envelope,
                emitted_compensated: false,
                rejected: true,
                warnings,
            });
        }

        let program = if controller_compensates {
            post.process(moves)
        } else {
            post.process(&path.commands)
        };
        warnings.extend(program.warnings);

        info!(
            machine = %self.machine.name,
            controller = %dialect,
            moves = moves.len(),
            compensated = path.compensations.len(),
            violations = envelope.violations.len(),
            lines = program.line_count,
            "Pipeline run complete"
        );

        Ok(PipelineOutput {
            gcode: Some(program.gcode),
            controller: dialect,
            line_count: program.line_count,
            canned_cycles_used: program.canned_cycles_used,
            compensations: path.compensations,
            singularity_points: path.singularity_points,
            envelope,
            emitted_compensated,
            rejected: false,
            warnings,
        })
    }

    /// Run a job file's dialect and post options against this pipeline
    pub fn run_job(&self, job: &JobConfig, moves: &[MotionPoint]) -> PipelineResult<PipelineOutput> {
        self.run(moves, job.dialect, &job.post)
    }
}

/// Build a pipeline for a job and run it once
pub fn run_job(job: &JobConfig, moves: &[MotionPoint]) -> PipelineResult<PipelineOutput> {
    job.validate()?;
    Pipeline::from_job(job)?.run_job(job, moves)
}

