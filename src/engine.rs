//! Typed request dispatch
//!
//! An upstream dispatcher hands the core one [`Request`] at a time,
//! usually deserialized from JSON. Each request is self-contained, so the
//! [`Engine`] keeps no state and any number of requests may run in
//! parallel.

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{run_job, PipelineOutput};
use nckit_core::{
    AxisLimits, KinematicTopology, MachineKinematics, MachineProfile, MotionPoint, PivotGeometry,
};
use nckit_kinematics::{
    CompensationInput, CompensationResult, EnvelopeCheck, EnvelopeReport, EnvelopeValidator,
    RtcpCompensator, RtcpValidation,
};
use nckit_post::{ControllerDialect, PostConfig, PostOutput, PostProcessor};
use nckit_settings::JobConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One operation of the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// RTCP-compensate a single programmed position
    Compensate {
        topology: KinematicTopology,
        pivot: PivotGeometry,
        input: CompensationInput,
        tolerance_mm: f64,
    },
    /// Check one rotary position of a five-axis machine
    ValidateRotary {
        machine: MachineProfile,
        input: CompensationInput,
        #[serde(default)]
        singularity_epsilon_deg: Option<f64>,
    },
    /// Check a point stream against travel limits
    ValidateEnvelope {
        limits: AxisLimits,
        points: Vec<MotionPoint>,
        #[serde(default)]
        check: EnvelopeCheck,
    },
    /// Render a move list for one controller
    PostProcess {
        moves: Vec<MotionPoint>,
        dialect: ControllerDialect,
        #[serde(default)]
        config: PostConfig,
    },
    /// Compensate, validate and post-process a job
    Run {
        job: JobConfig,
        moves: Vec<MotionPoint>,
    },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Compensate { .. } => "compensate",
            Self::ValidateRotary { .. } => "validate_rotary",
            Self::ValidateEnvelope { .. } => "validate_envelope",
            Self::PostProcess { .. } => "post_process",
            Self::Run { .. } => "run",
        }
    }
}

/// Result of one [`Request`], same variant order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum Response {
    Compensation(CompensationResult),
    RotaryValidation(RtcpValidation),
    Envelope(EnvelopeReport),
    Program(PostOutput),
    Pipeline(Box<PipelineOutput>),
}

/// Stateless request executor
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Execute one request
    ///
    /// Structural problems (unknown geometry, inverted limits, invalid
    /// config) are errors; unsafe motion is reported in the response.
    pub fn execute(&self, request: &Request) -> PipelineResult<Response> {
        debug!(action = request.action(), "Executing request");
        match request {
            Request::Compensate {
                topology,
                pivot,
                input,
                tolerance_mm,
            } => {
                let compensator = RtcpCompensator::new(*topology, *pivot)?;
                Ok(Response::Compensation(
                    compensator.compensate(input, *tolerance_mm)?,
                ))
            }
            Request::ValidateRotary {
                machine,
                input,
                singularity_epsilon_deg,
            } => {
                machine.validate()?;
                let MachineKinematics::FiveAxis {
                    topology, pivot, ..
                } = &machine.kinematics
                else {
                    return Err(PipelineError::NotFiveAxis {
                        machine: machine.name.clone(),
                    });
                };
                let mut compensator = RtcpCompensator::new(*topology, *pivot)?;
                if let Some(epsilon) = singularity_epsilon_deg {
                    compensator = compensator.with_singularity_epsilon(*epsilon)?;
                }
                Ok(Response::RotaryValidation(
                    compensator.validate(input, &machine.travel_limits())?,
                ))
            }
            Request::ValidateEnvelope {
                limits,
                points,
                check,
            } => {
                let validator = EnvelopeValidator::new(limits.clone(), *check)?;
                Ok(Response::Envelope(validator.validate(points)?))
            }
            Request::PostProcess {
                moves,
                dialect,
                config,
            } => {
                let post = PostProcessor::new(*dialect, config.clone())?;
                Ok(Response::Program(post.process(moves)))
            }
            Request::Run { job, moves } => Ok(Response::Pipeline(Box::new(run_job(job, moves)?))),
        }
    }

    /// Decode a JSON request, execute it and encode the response
    pub fn execute_json(&self, request: &str) -> PipelineResult<String> {
        let request: Request = serde_json::from_str(request)?;
        let response = self.execute(&request)?;
        Ok(serde_json::to_string(&response)?)
    }

    /// Execute requests in order, stopping at the first structural error
    pub fn execute_all(&self, requests: &[Request]) -> PipelineResult<Vec<Response>> {
        requests.iter().map(|r| self.execute(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_is_tagged_by_action() {
        let json = r#"{
            "action": "compensate",
            "topology": "head_head",
            "pivot": {
                "pivot_to_gauge_mm": 120.0,
                "pivot_to_table_mm": 100.0,
                "tool_length_mm": 80.0
            },
            "input": {"a_deg": 0.0, "c_deg": 0.0, "x": 10.0, "y": 20.0, "z": 30.0},
            "tolerance_mm": 0.01
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request.action(), "compensate");

        let Response::Compensation(result) = Engine::new().execute(&request).unwrap() else {
            panic!("expected a compensation response");
        };
        assert!((result.x - 10.0).abs() < 1e-9);
        assert!((result.y - 20.0).abs() < 1e-9);
        assert!((result.z - 30.0).abs() < 1e-9);
        assert!(result.within_tolerance);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let json = r#"{"action": "simulate", "moves": []}"#;
        assert!(serde_json::from_str::<Request>(json).is_err());
        assert!(matches!(
            Engine::new().execute_json(json),
            Err(PipelineError::Json(_))
        ));
    }

    #[test]
    fn test_response_serializes_with_kind() {
        let response = Engine::new()
            .execute(&Request::PostProcess {
                moves: vec![MotionPoint::rapid(0.0, 0.0, 50.0)],
                dialect: ControllerDialect::Haas,
                config: PostConfig::default(),
            })
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["kind"], "program");
        assert_eq!(value["result"]["controller"], "haas");
    }
}
