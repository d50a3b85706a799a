use crate::routing::RoutingError;
use crate::wallet::WalletError;
use thiserror::Error;

/// Why a single step failed. Any `StepError` halts the workflow at that step.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StepError {
    #[error("{0}")]
    Configuration(String),

    #[error("Wallet client and an active account are required.")]
    MissingAccount,

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Step {step_id} is missing {expected} metadata.")]
    MissingMetadata {
        step_id: String,
        expected: &'static str,
    },

    #[error("A route quote is required before executing the route.")]
    MissingRoute,

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("{0}")]
    Failed(String),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }
}

/// Reasons a run is refused before any step executes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Workflow has no steps")]
    NoSteps,

    #[error("Workflow is already running")]
    AlreadyRunning,

    #[error("Step id {0} is used more than once")]
    DuplicateStepId(String),
}
