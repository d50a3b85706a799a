//! Transaction workflow orchestration.
//!
//! A workflow is an ordered list of [`WorkflowStep`]s executed one at a time
//! by a [`WorkflowRunner`]. Steps either carry their own [`StepExecutor`] or
//! fall back to the generic [`ExecutionProvider`].

mod context;
mod error;
mod provider;
mod runner;
mod state;
mod step;

pub use context::WorkflowContext;
pub use error::{StepError, WorkflowError};
pub use provider::{
    synthesize_tx_hash, ExecutionProvider, MockExecutionProvider, StepExecutor,
    DEFAULT_MOCK_LATENCY,
};
pub use runner::WorkflowRunner;
pub use state::{
    progress_percent, StepSnapshot, StepState, StepStatus, WorkflowEvent, WorkflowOutcome,
    WorkflowSnapshot,
};
pub use step::{
    sanitize_step_id, steps_signature, ContractCallMetadata, RouteExecutionMetadata,
    RouteQuoteMetadata, StepAction, StepMetadata, TokenApprovalMetadata, TypedMetadata,
    WorkflowStep, WorkflowStepResult,
};
