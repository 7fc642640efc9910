// engine.rs - CommandGoalEngine: score members by running an external program.
//
// For each member the engine runs `program args... <member_id>` and reads a
// single JSON reply from stdout:
//
//   {"status": "scored", "score": 72.5}
//   {"status": "no_goal"}
//
// A non-zero exit or an unreadable reply is a scoring failure for that
// member only.

use std::io::ErrorKind;
use std::process::Command;

use serde::{Deserialize, Serialize};

use gs_batch::{GoalAssessment, GoalEngine, GoalEngineError, GoalScore, MemberId};

use crate::error::{ConnectorError, Result};

/// The external scoring command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the member id.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

fn default_program() -> String {
    "goal-engine".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum EngineReply {
    Scored { score: f64 },
    NoGoal,
}

pub struct CommandGoalEngine {
    config: EngineConfig,
}

impl CommandGoalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the scoring command for one member.
    pub fn assess(&self, member_id: &MemberId) -> Result<GoalAssessment> {
        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(member_id.as_str())
            .output()
            .map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    ConnectorError::CommandNotFound(self.config.program.clone())
                } else {
                    ConnectorError::LaunchFailed {
                        program: self.config.program.clone(),
                        source,
                    }
                }
            })?;

        if !output.status.success() {
            return Err(ConnectorError::EngineFailed {
                member_id: member_id.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply: EngineReply =
            serde_json::from_str(stdout.trim()).map_err(|e| ConnectorError::BadReply {
                member_id: member_id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(match reply {
            EngineReply::Scored { score } if score.is_finite() => {
                GoalAssessment::Scored(GoalScore { value: score })
            }
            EngineReply::Scored { score } => {
                return Err(ConnectorError::BadReply {
                    member_id: member_id.to_string(),
                    reason: format!("score {score} is not a finite number"),
                })
            }
            EngineReply::NoGoal => GoalAssessment::NoApplicableGoal,
        })
    }
}

impl GoalEngine for CommandGoalEngine {
    fn score_member(&self, member_id: &MemberId) -> std::result::Result<GoalAssessment, GoalEngineError> {
        self.assess(member_id)
            .map_err(|e| GoalEngineError::new(e.to_string()))
    }
}
