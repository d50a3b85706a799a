//! ERC-20 allowance check with an exact-amount approval fallback.

use crate::chain::{is_native_token, Chain};
use crate::units::parse_amount;
use crate::wallet::{ensure_wallet_on_chain, ChainReader, ContractWrite, TokenDecimalsCache, WalletSession};
use crate::workflow::{
    sanitize_step_id, ExecutionProvider, StepAction, StepError, StepExecutor,
    TokenApprovalMetadata, TypedMetadata, WorkflowContext, WorkflowStep, WorkflowStepResult,
};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TokenApprovalParams {
    pub chain: Chain,
    pub token_address: Address,
    pub spender_address: Address,
    /// Human units.
    pub amount: String,
    pub token_symbol: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub success_message: Option<String>,
}

/// Builds an approval-check step, or `None` for native tokens which need no approval.
///
/// The required amount is converted to base units here, using the token's
/// on-chain decimals. Whether an approval is actually sent is decided when
/// the step executes.
pub async fn create_token_approval_step(
    params: TokenApprovalParams,
    decimals: &TokenDecimalsCache,
) -> Result<Option<WorkflowStep>, StepError> {
    if is_native_token(&params.token_address) {
        return Ok(None);
    }

    let chain_id = params
        .chain
        .id()
        .ok_or_else(|| StepError::UnsupportedChain(params.chain.to_string()))?;
    let token_decimals = decimals
        .decimals(params.chain, params.token_address)
        .await?;
    let required_amount = parse_amount(&params.amount, token_decimals)
        .map_err(|e| StepError::Configuration(e.to_string()))?;

    let symbol = params.token_symbol.as_deref().unwrap_or("token").to_string();
    let spender = params.spender_address.to_string();
    let id = sanitize_step_id(&format!(
        "approve-{}-{}-{}",
        params.chain, params.token_address, params.spender_address
    ));

    let metadata = TokenApprovalMetadata {
        chain: params.chain,
        chain_id,
        token_address: params.token_address,
        spender_address: params.spender_address,
        decimals: token_decimals,
        required_amount,
        token_symbol: params.token_symbol.clone(),
        success_message: params.success_message,
    };

    let mut step = WorkflowStep::new(
        id,
        params
            .label
            .unwrap_or_else(|| format!("Approve {}", symbol)),
        StepAction::Approve,
    )
    .with_description(
        params
            .description
            .unwrap_or_else(|| format!("Ensure {} can spend {}", &spender[..6], symbol)),
    )
    .with_chains(params.chain, params.chain)
    .with_amount(params.amount)
    .with_metadata(TypedMetadata::TokenApproval(metadata));
    step.token_in = params.token_symbol;
    Ok(Some(step))
}

/// Reads the current allowance and approves exactly the required amount if
/// it is short. Sufficient allowance is a successful no-op without a hash.
pub struct TokenApprovalExecutor {
    wallet: Arc<dyn WalletSession>,
    reader: Arc<dyn ChainReader>,
}

impl TokenApprovalExecutor {
    pub fn new(wallet: Arc<dyn WalletSession>, reader: Arc<dyn ChainReader>) -> Self {
        Self { wallet, reader }
    }
}

#[async_trait]
impl StepExecutor for TokenApprovalExecutor {
    async fn execute(
        &self,
        _provider: &dyn ExecutionProvider,
        step: &WorkflowStep,
        _ctx: &mut WorkflowContext,
    ) -> Result<WorkflowStepResult, StepError> {
        let metadata = step
            .metadata
            .as_ref()
            .and_then(|m| m.token_approval())
            .ok_or_else(|| StepError::MissingMetadata {
                step_id: step.id.clone(),
                expected: "tokenApproval",
            })?;
        let owner = self.wallet.account().ok_or(StepError::MissingAccount)?;

        let allowance = self
            .reader
            .allowance(
                metadata.chain,
                metadata.token_address,
                owner,
                metadata.spender_address,
            )
            .await?;

        if allowance >= metadata.required_amount {
            debug!(
                "Allowance {} covers required {} for {}",
                allowance, metadata.required_amount, metadata.spender_address
            );
            return Ok(WorkflowStepResult::message_only(
                metadata
                    .success_message
                    .clone()
                    .unwrap_or_else(|| "Allowance already sufficient.".to_string()),
            ));
        }

        ensure_wallet_on_chain(self.wallet.as_ref(), metadata.chain_id).await?;

        let tx_hash = self
            .wallet
            .write_contract(ContractWrite::erc20_approve(
                metadata.chain_id,
                metadata.token_address,
                metadata.spender_address,
                metadata.required_amount,
            ))
            .await?;
        info!(
            "Approved {} of {} for {}: {}",
            metadata.required_amount, metadata.token_address, metadata.spender_address, tx_hash
        );

        let message = metadata.success_message.clone().unwrap_or_else(|| {
            format!(
                "Approved {} for router {}",
                metadata.token_symbol.as_deref().unwrap_or("token"),
                metadata.spender_address
            )
        });
        Ok(WorkflowStepResult::with_hash(tx_hash, message))
    }
}
