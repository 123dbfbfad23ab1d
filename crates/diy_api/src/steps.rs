//! Step-by-step execution tracking for a project.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::models::{Project, ProjectStep, Tool};

/// Display status of a step in the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}

/// What happened when the current step was marked done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAdvance {
    /// Moved on to the step with this id
    Advanced(String),
    /// The last step was just completed
    ProjectCompleted,
    /// Nothing left to complete
    AlreadyComplete,
}

/// Tracks which step of a project the user is working on.
#[derive(Debug, Clone)]
pub struct StepTracker {
    project_id: String,
    steps: Vec<ProjectStep>,
    current: usize,
}

impl StepTracker {
    /// Build a tracker over a set of steps, ordered by step number.
    ///
    /// The current step is the first active one, else the first incomplete
    /// one, else the last.
    pub fn new(project_id: impl Into<String>, mut steps: Vec<ProjectStep>) -> ApiResult<Self> {
        let project_id = project_id.into();
        if steps.is_empty() {
            return Err(ApiError::NoSteps(project_id));
        }

        steps.sort_by_key(|s| s.step_number);
        let current = steps
            .iter()
            .position(|s| s.is_active)
            .or_else(|| steps.iter().position(|s| !s.is_completed))
            .unwrap_or(steps.len() - 1);
        if !steps[current].is_completed {
            steps[current].is_active = true;
        }

        Ok(Self {
            project_id,
            steps,
            current,
        })
    }

    /// Steps stored on the project record.
    pub fn from_project(project: &Project) -> ApiResult<Self> {
        Self::new(project.id.clone(), project.steps.clone())
    }

    /// Steps from a generate-steps result.
    ///
    /// Accepts either `{"steps": [...]}` or a bare array.
    pub fn from_generated(project_id: impl Into<String>, result: &Value) -> ApiResult<Self> {
        let project_id = project_id.into();
        let raw = match result {
            Value::Array(_) => result.clone(),
            Value::Object(map) => match map.get("steps") {
                Some(steps) => steps.clone(),
                None => return Err(ApiError::NoSteps(project_id)),
            },
            _ => return Err(ApiError::NoSteps(project_id)),
        };

        let steps: Vec<ProjectStep> = serde_json::from_value(raw).map_err(|e| ApiError::Decode {
            operation: "generate steps".to_string(),
            message: e.to_string(),
        })?;
        Self::new(project_id, steps)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn steps(&self) -> &[ProjectStep] {
        &self.steps
    }

    pub fn current(&self) -> &ProjectStep {
        &self.steps[self.current]
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.steps.len()
    }

    /// Whether every step has been completed.
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.is_completed)
    }

    /// Mark the current step done and move to the next incomplete one.
    ///
    /// Steps are taken in step-number order, gaps included. An earlier step
    /// left incomplete is picked up once nothing remains after the current.
    pub fn complete_current(&mut self) -> StepAdvance {
        if self.current().is_completed {
            return StepAdvance::AlreadyComplete;
        }

        let finished = &mut self.steps[self.current];
        finished.is_active = false;
        finished.is_completed = true;
        debug!("Completed step {} of project {}", finished.step_number, self.project_id);

        let after = self.current + 1;
        let next = (after..self.steps.len())
            .chain(0..self.current)
            .find(|&i| !self.steps[i].is_completed);
        match next {
            Some(next) => {
                self.steps[next].is_active = true;
                self.current = next;
                StepAdvance::Advanced(self.steps[next].id.clone())
            }
            None => {
                info!("Project {} completed", self.project_id);
                StepAdvance::ProjectCompleted
            }
        }
    }

    /// `(current step number, total steps)`
    pub fn progress(&self) -> (u32, usize) {
        (self.current().step_number, self.steps.len())
    }

    /// Share of the plan reached, in `0.0..=1.0`.
    pub fn percent(&self) -> f64 {
        let (current, total) = self.progress();
        (f64::from(current) / total as f64).min(1.0)
    }

    pub fn status_of(step: &ProjectStep) -> StepStatus {
        if step.is_completed {
            StepStatus::Completed
        } else if step.is_active {
            StepStatus::Active
        } else {
            StepStatus::Pending
        }
    }

    /// Tools the current step needs, resolved against the toolroom.
    ///
    /// Ids with no matching tool are skipped.
    pub fn required_tools<'a>(&self, tools: &'a [Tool]) -> Vec<&'a Tool> {
        self.current()
            .required_tools
            .iter()
            .filter_map(|id| tools.iter().find(|t| &t.id == id))
            .collect()
    }
}
