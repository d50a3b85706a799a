//! Step descriptors.

use super::provider::StepExecutor;
use crate::chain::Chain;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The kind of action a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Approve,
    Bridge,
    Swap,
    Stake,
    Unstake,
    Compound,
    Contract,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Approve => "approve",
            StepAction::Bridge => "bridge",
            StepAction::Swap => "swap",
            StepAction::Stake => "stake",
            StepAction::Unstake => "unstake",
            StepAction::Compound => "compound",
            StepAction::Contract => "contract",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(StepAction::Approve),
            "bridge" => Some(StepAction::Bridge),
            "swap" => Some(StepAction::Swap),
            "stake" => Some(StepAction::Stake),
            "unstake" => Some(StepAction::Unstake),
            "compound" => Some(StepAction::Compound),
            "contract" => Some(StepAction::Contract),
            _ => None,
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for an ERC-20 allowance check and, if needed, an exact approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenApprovalMetadata {
    pub chain: Chain,
    pub chain_id: u64,
    pub token_address: Address,
    pub spender_address: Address,
    pub decimals: u8,
    /// Base units.
    pub required_amount: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
}

/// Parameters for one arbitrary contract write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallMetadata {
    pub chain: Chain,
    pub chain_id: u64,
    pub contract_address: Address,
    /// Normalised, always starts with `function `.
    pub function_signature: String,
    pub function_name: String,
    pub args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
}

/// Parameters for requesting a route quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuoteMetadata {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token_address: Address,
    pub to_token_address: Address,
    pub decimals: u8,
    /// Base units.
    pub from_amount: U256,
    pub slippage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteExecutionMetadata {
    pub route_description: String,
}

/// Metadata shapes the built-in adapters understand, keyed by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypedMetadata {
    TokenApproval(TokenApprovalMetadata),
    ContractCall(ContractCallMetadata),
    RouteQuote(RouteQuoteMetadata),
    RouteExecution(RouteExecutionMetadata),
}

/// Action-specific step parameters.
///
/// Anything that does not parse as a [`TypedMetadata`] is kept as `Opaque`
/// and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepMetadata {
    Typed(TypedMetadata),
    Opaque(serde_json::Value),
}

impl StepMetadata {
    pub fn token_approval(&self) -> Option<&TokenApprovalMetadata> {
        match self {
            StepMetadata::Typed(TypedMetadata::TokenApproval(m)) => Some(m),
            _ => None,
        }
    }

    pub fn contract_call(&self) -> Option<&ContractCallMetadata> {
        match self {
            StepMetadata::Typed(TypedMetadata::ContractCall(m)) => Some(m),
            _ => None,
        }
    }

    pub fn route_quote(&self) -> Option<&RouteQuoteMetadata> {
        match self {
            StepMetadata::Typed(TypedMetadata::RouteQuote(m)) => Some(m),
            _ => None,
        }
    }
}

impl From<TypedMetadata> for StepMetadata {
    fn from(value: TypedMetadata) -> Self {
        StepMetadata::Typed(value)
    }
}

/// One atomic action in a workflow.
///
/// Everything except `executor` is part of the step's visible identity: two
/// step lists that serialise identically are considered the same list.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub label: String,
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_chain: Option<Chain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_chain: Option<Chain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_out: Option<String>,
    /// Human-readable nominal amount, not base units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StepMetadata>,
    /// Custom executor. When absent the provider's generic executor runs the step.
    #[serde(skip)]
    pub executor: Option<Arc<dyn StepExecutor>>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, label: impl Into<String>, action: StepAction) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action,
            description: None,
            from_chain: None,
            to_chain: None,
            token_in: None,
            token_out: None,
            amount: None,
            metadata: None,
            executor: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_chains(mut self, from: Chain, to: Chain) -> Self {
        self.from_chain = Some(from);
        self.to_chain = Some(to);
        self
    }

    pub fn with_tokens(mut self, token_in: impl Into<String>, token_out: impl Into<String>) -> Self {
        self.token_in = Some(token_in.into());
        self.token_out = Some(token_out.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<StepMetadata>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn StepExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }
}

impl fmt::Debug for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStep")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("action", &self.action)
            .field("description", &self.description)
            .field("from_chain", &self.from_chain)
            .field("to_chain", &self.to_chain)
            .field("token_in", &self.token_in)
            .field("token_out", &self.token_out)
            .field("amount", &self.amount)
            .field("metadata", &self.metadata)
            .field("has_executor", &self.executor.is_some())
            .finish()
    }
}

/// Outcome of one executed step. No hash is a valid outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkflowStepResult {
    pub fn with_hash(tx_hash: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
            message: Some(message.into()),
        }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            tx_hash: None,
            message: Some(message.into()),
        }
    }
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `-`.
pub fn sanitize_step_id(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Structural signature of a step list over its visible fields.
pub fn steps_signature(steps: &[WorkflowStep]) -> String {
    serde_json::to_string(steps).unwrap_or_default()
}
