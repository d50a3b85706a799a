//! Execution capabilities for steps.

use super::context::WorkflowContext;
use super::error::StepError;
use super::step::{WorkflowStep, WorkflowStepResult};
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Generic executor exposed by a wallet or backend integration.
///
/// Returning `Err` halts the workflow. Conditions the workflow should recover
/// from must be reported as `Ok` with an explanatory message instead.
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Execute a step that has no custom executor.
    async fn execute_step(&self, step: &WorkflowStep) -> Result<WorkflowStepResult, StepError>;
}

/// Bespoke execution logic attached to a single step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(
        &self,
        provider: &dyn ExecutionProvider,
        step: &WorkflowStep,
        ctx: &mut WorkflowContext,
    ) -> Result<WorkflowStepResult, StepError>;
}

pub const DEFAULT_MOCK_LATENCY: Duration = Duration::from_millis(1200);

/// Simulated provider for interactive previews without a wallet.
pub struct MockExecutionProvider {
    latency: Duration,
}

impl MockExecutionProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for MockExecutionProvider {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_LATENCY)
    }
}

#[async_trait]
impl ExecutionProvider for MockExecutionProvider {
    fn name(&self) -> &str {
        "Mock Wallet Provider"
    }

    async fn execute_step(&self, step: &WorkflowStep) -> Result<WorkflowStepResult, StepError> {
        tokio::time::sleep(self.latency).await;
        Ok(WorkflowStepResult::with_hash(
            synthesize_tx_hash(&step.id),
            format!("{} executed via mock provider", step.label),
        ))
    }
}

/// `0x` + the first six characters of the step id + the current unix millis in hex.
pub fn synthesize_tx_hash(step_id: &str) -> String {
    let prefix: String = step_id.chars().take(6).collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("0x{}{:x}", prefix, millis)
}
