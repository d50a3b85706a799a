//! Arbitrary contract-write steps.

use crate::chain::Chain;
use crate::wallet::{ensure_wallet_on_chain, ContractWrite, WalletSession};
use crate::workflow::{
    sanitize_step_id, ContractCallMetadata, ExecutionProvider, StepAction, StepError,
    StepExecutor, TypedMetadata, WorkflowContext, WorkflowStep, WorkflowStepResult,
};
use alloy_primitives::Address;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ContractCallParams {
    pub chain: Chain,
    pub contract_address: Address,
    /// e.g. `deposit(uint256,address,uint16)`, with or without the `function` keyword.
    pub function_signature: String,
    pub args: Vec<serde_json::Value>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub success_message: Option<String>,
}

/// A parsed `function name(type a, type b)` signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Always starts with `function `.
    pub normalized: String,
    pub name: String,
    pub param_types: Vec<String>,
}

fn signature_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^function\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)").unwrap()
    })
}

pub fn parse_function_signature(signature: &str) -> Result<FunctionSignature, StepError> {
    let trimmed = signature.trim();
    let normalized = if trimmed.starts_with("function") {
        trimmed.to_string()
    } else {
        format!("function {}", trimmed)
    };

    let captures = signature_regex()
        .captures(&normalized)
        .ok_or_else(|| StepError::Configuration(format!("Invalid function signature: {}", signature)))?;

    let name = captures[1].to_string();
    let param_types = captures[2]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.split_whitespace().next().unwrap_or(p).to_string())
        .collect();

    Ok(FunctionSignature {
        normalized,
        name,
        param_types,
    })
}

pub fn create_contract_call_step(params: ContractCallParams) -> Result<WorkflowStep, StepError> {
    let chain_id = params
        .chain
        .id()
        .ok_or_else(|| StepError::UnsupportedChain(params.chain.to_string()))?;
    let signature = parse_function_signature(&params.function_signature)?;

    if signature.param_types.len() != params.args.len() {
        return Err(StepError::Configuration(format!(
            "{} expects {} arguments, got {}",
            signature.name,
            signature.param_types.len(),
            params.args.len()
        )));
    }

    let id = sanitize_step_id(&format!(
        "contract-call-{}-{}-{}",
        params.chain, params.contract_address, signature.name
    ));

    let metadata = ContractCallMetadata {
        chain: params.chain,
        chain_id,
        contract_address: params.contract_address,
        function_signature: signature.normalized,
        function_name: signature.name.clone(),
        args: params.args,
        success_message: params.success_message,
    };

    Ok(WorkflowStep::new(
        id,
        params
            .label
            .unwrap_or_else(|| format!("Call {}", signature.name)),
        StepAction::Contract,
    )
    .with_description(
        params
            .description
            .unwrap_or_else(|| format!("Invoke {} on {}", signature.name, params.chain)),
    )
    .with_chains(params.chain, params.chain)
    .with_metadata(TypedMetadata::ContractCall(metadata)))
}

pub struct ContractCallExecutor {
    wallet: Arc<dyn WalletSession>,
}

impl ContractCallExecutor {
    pub fn new(wallet: Arc<dyn WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl StepExecutor for ContractCallExecutor {
    async fn execute(
        &self,
        _provider: &dyn ExecutionProvider,
        step: &WorkflowStep,
        _ctx: &mut WorkflowContext,
    ) -> Result<WorkflowStepResult, StepError> {
        let metadata = step
            .metadata
            .as_ref()
            .and_then(|m| m.contract_call())
            .ok_or_else(|| StepError::MissingMetadata {
                step_id: step.id.clone(),
                expected: "contractCall",
            })?;
        if self.wallet.account().is_none() {
            return Err(StepError::MissingAccount);
        }

        ensure_wallet_on_chain(self.wallet.as_ref(), metadata.chain_id).await?;

        let tx_hash = self
            .wallet
            .write_contract(ContractWrite {
                chain_id: metadata.chain_id,
                address: metadata.contract_address,
                function_signature: metadata.function_signature.clone(),
                function_name: metadata.function_name.clone(),
                args: metadata.args.clone(),
            })
            .await?;
        info!(
            "Called {} on {}: {}",
            metadata.function_name, metadata.contract_address, tx_hash
        );

        let message = metadata.success_message.clone().unwrap_or_else(|| {
            format!(
                "Called {} on {}",
                metadata.function_name, metadata.contract_address
            )
        });
        Ok(WorkflowStepResult::with_hash(tx_hash, message))
    }
}
