//! Step builders and their wallet-backed executors.
//!
//! Builders produce plain step descriptors carrying typed metadata. Once a
//! wallet with an account is connected, [`ExecutorBindings::bind`] attaches
//! the matching executor to every step whose metadata it recognises. Steps
//! left unbound run through the generic execution provider.

mod approval;
mod contract_call;
mod route;

pub use approval::{create_token_approval_step, TokenApprovalExecutor, TokenApprovalParams};
pub use contract_call::{
    create_contract_call_step, parse_function_signature, ContractCallExecutor,
    ContractCallParams, FunctionSignature,
};
pub use route::{
    create_route_workflow_steps, RouteExecuteExecutor, RouteParams, RouteQuoteExecutor,
    DEFAULT_SLIPPAGE, EXECUTE_STEP_ID, QUOTE_STEP_ID, REJECTED_MESSAGE, REJECTED_TX_PLACEHOLDER,
};

use crate::routing::RoutingClient;
use crate::wallet::{ChainReader, WalletSession};
use crate::workflow::{StepExecutor, StepMetadata, TypedMetadata, WorkflowStep};
use std::sync::Arc;
use tracing::debug;

/// Capabilities of the active wallet session, used to build executors.
#[derive(Clone)]
pub struct ExecutorBindings {
    pub wallet: Arc<dyn WalletSession>,
    pub reader: Arc<dyn ChainReader>,
    pub router: Arc<dyn RoutingClient>,
}

impl ExecutorBindings {
    pub fn new(
        wallet: Arc<dyn WalletSession>,
        reader: Arc<dyn ChainReader>,
        router: Arc<dyn RoutingClient>,
    ) -> Self {
        Self {
            wallet,
            reader,
            router,
        }
    }

    /// The executor for a step's metadata, if it is one of ours.
    pub fn executor_for(&self, step: &WorkflowStep) -> Option<Arc<dyn StepExecutor>> {
        let StepMetadata::Typed(metadata) = step.metadata.as_ref()? else {
            return None;
        };
        let executor: Arc<dyn StepExecutor> = match metadata {
            TypedMetadata::TokenApproval(_) => Arc::new(TokenApprovalExecutor::new(
                self.wallet.clone(),
                self.reader.clone(),
            )),
            TypedMetadata::ContractCall(_) => {
                Arc::new(ContractCallExecutor::new(self.wallet.clone()))
            }
            TypedMetadata::RouteQuote(_) => Arc::new(RouteQuoteExecutor::new(
                self.wallet.clone(),
                self.router.clone(),
            )),
            TypedMetadata::RouteExecution(_) => Arc::new(RouteExecuteExecutor::new(
                self.wallet.clone(),
                self.router.clone(),
            )),
        };
        Some(executor)
    }

    /// Attaches executors to recognised steps.
    ///
    /// Without an active account the steps are returned unchanged. Steps
    /// that already carry an executor keep it.
    pub fn bind(&self, steps: Vec<WorkflowStep>) -> Vec<WorkflowStep> {
        if self.wallet.account().is_none() {
            debug!("No active wallet account, leaving steps to the execution provider");
            return steps;
        }
        steps
            .into_iter()
            .map(|mut step| {
                if step.executor.is_none() {
                    step.executor = self.executor_for(&step);
                }
                step
            })
            .collect()
    }
}
