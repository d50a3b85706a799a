use super::WalletSession;
use crate::chain::short_address;
use crate::workflow::{
    synthesize_tx_hash, ExecutionProvider, StepError, WorkflowStep, WorkflowStepResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Generic executor for steps without a custom executor, bound to a
/// connected wallet.
pub struct WalletExecutionProvider {
    wallet: Arc<dyn WalletSession>,
    name: String,
    latency: Duration,
}

impl WalletExecutionProvider {
    /// `None` when the wallet has no active account.
    pub fn new(wallet: Arc<dyn WalletSession>, latency: Duration) -> Option<Self> {
        let account = wallet.account()?;
        Some(Self {
            name: format!("Wallet {}", short_address(&account)),
            wallet,
            latency,
        })
    }
}

#[async_trait]
impl ExecutionProvider for WalletExecutionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute_step(&self, step: &WorkflowStep) -> Result<WorkflowStepResult, StepError> {
        let chain = match self.wallet.chain_id().await {
            Ok(id) => id.to_string(),
            Err(e) => {
                debug!("Could not read wallet chain id: {}", e);
                "?".to_string()
            }
        };

        tokio::time::sleep(self.latency).await;

        Ok(WorkflowStepResult::with_hash(
            synthesize_tx_hash(&step.id),
            format!("{} executed on chain #{}", step.label, chain),
        ))
    }
}
