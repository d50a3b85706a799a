use serde::{Deserialize, Serialize};

/// Runtime status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl StepStatus {
    /// Label shown next to the step.
    pub fn display_label(&self) -> &'static str {
        match self {
            StepStatus::Idle => "Pending",
            StepStatus::Running => "Executing",
            StepStatus::Success => "Completed",
            StepStatus::Error => "Failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A step's id and label together with its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSnapshot {
    pub id: String,
    pub label: String,
    pub state: StepState,
}

/// Point-in-time view of a runner, steps in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub steps: Vec<StepSnapshot>,
    pub is_executing: bool,
    pub active_step_id: Option<String>,
    pub log: Vec<String>,
    pub error: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub progress: u8,
}

impl WorkflowSnapshot {
    pub fn state_of(&self, step_id: &str) -> Option<&StepState> {
        self.steps.iter().find(|s| s.id == step_id).map(|s| &s.state)
    }

    pub fn status_of(&self, step_id: &str) -> Option<StepStatus> {
        self.state_of(step_id).map(|s| s.status)
    }
}

/// Notifications published by a runner as state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// The step list changed and all state was reinitialised.
    StepsChanged,
    RunStarted,
    StepStarted {
        step_id: String,
    },
    StepSucceeded {
        step_id: String,
        tx_hash: Option<String>,
        message: Option<String>,
    },
    StepFailed {
        step_id: String,
        error: String,
    },
    RunCompleted,
    RunCancelled,
    Reset,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Every step succeeded.
    Completed,
    /// A step failed; later steps did not run.
    Failed { step_id: String, message: String },
    /// The run was abandoned by a reset or a step-list change.
    Cancelled,
}

/// `round(100 * completed / total)`, 0 for an empty list.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}
