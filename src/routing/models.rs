//! Route and quote shapes as returned by the LI.FI API.

use crate::wallet::TransactionRequest;
use serde::{Deserialize, Serialize};

/// Parameters for a single-route quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub from_chain: u64,
    pub to_chain: u64,
    pub from_token: String,
    pub to_token: String,
    pub from_address: String,
    pub to_address: String,
    /// Base units.
    pub from_amount: String,
    pub slippage: f64,
}

impl QuoteRequest {
    /// Query parameters for `GET /quote`.
    pub fn query_pairs(&self, integrator: &str) -> Vec<(&'static str, String)> {
        vec![
            ("fromChain", self.from_chain.to_string()),
            ("toChain", self.to_chain.to_string()),
            ("fromToken", self.from_token.clone()),
            ("toToken", self.to_token.clone()),
            ("fromAddress", self.from_address.clone()),
            ("toAddress", self.to_address.clone()),
            ("fromAmount", self.from_amount.clone()),
            ("slippage", self.slippage.to_string()),
            ("integrator", integrator.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: String,
    pub chain_id: u64,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "priceUSD", skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<String>,
}

/// What a step moves: source and destination chain, token and amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAction {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token: TokenInfo,
    pub to_token: TokenInfo,
    pub from_amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEstimate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub from_amount: String,
    pub to_amount: String,
    pub to_amount_min: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDetails {
    pub key: String,
    pub name: String,
    #[serde(default, rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,
    ActionRequired,
    Done,
    Failed,
}

/// One tracked sub-operation of a step (allowance, swap, cross-chain transfer, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Execution record attached to a step once it has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecution {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub process: Vec<Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_token: Option<TokenInfo>,
}

/// One step of a route. A quote is a single step with a prepared transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_details: Option<ToolDetails>,
    pub action: RouteAction,
    pub estimate: StepEstimate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_request: Option<TransactionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<StepExecution>,
}

pub type Quote = RouteStep;

impl RouteStep {
    /// Display name of the tool providing this step.
    pub fn tool_name(&self) -> &str {
        self.tool_details
            .as_ref()
            .map(|d| d.name.as_str())
            .unwrap_or(&self.tool)
    }

    /// Wraps a quote into a single-step route ready for execution.
    pub fn into_route(self) -> Route {
        Route {
            id: self.id.clone(),
            from_chain_id: self.action.from_chain_id,
            to_chain_id: self.action.to_chain_id,
            from_token: self.action.from_token.clone(),
            to_token: self.action.to_token.clone(),
            from_amount: self.action.from_amount.clone(),
            to_amount: self.estimate.to_amount.clone(),
            to_amount_min: self.estimate.to_amount_min.clone(),
            from_address: self.action.from_address.clone(),
            to_address: self.action.to_address.clone(),
            steps: vec![self],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token: TokenInfo,
    pub to_token: TokenInfo,
    pub from_amount: String,
    pub to_amount: String,
    pub to_amount_min: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    pub steps: Vec<RouteStep>,
}

impl Route {
    /// Chain the wallet must be on before execution starts.
    pub fn first_chain_id(&self) -> Option<u64> {
        self.steps.first().map(|s| s.action.from_chain_id)
    }

    /// Last process of the last step, where the final hash is recorded.
    pub fn last_process(&self) -> Option<&Process> {
        self.steps.last()?.execution.as_ref()?.process.last()
    }
}

/// Response of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substatus_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving: Option<TransferLeg>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLeg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE_JSON: &str = r#"{
        "id": "quote-1",
        "type": "lifi",
        "tool": "stargate",
        "toolDetails": { "key": "stargate", "name": "Stargate", "logoURI": "https://x/logo.png" },
        "action": {
            "fromChainId": 42161,
            "toChainId": 1,
            "fromToken": { "address": "0x0000000000000000000000000000000000000000", "chainId": 42161, "symbol": "ETH", "decimals": 18 },
            "toToken": { "address": "0xdC035D45d973E3EC169d2276DDab16f1e407384F", "chainId": 1, "symbol": "USDS", "decimals": 18, "priceUSD": "1.00" },
            "fromAmount": "1000000000000",
            "slippage": 0.003
        },
        "estimate": {
            "fromAmount": "1000000000000",
            "toAmount": "2500000000000000",
            "toAmountMin": "2492500000000000",
            "approvalAddress": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE"
        },
        "transactionRequest": { "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE", "data": "0xabcd", "value": "0x0", "chainId": 42161 }
    }"#;

    #[test]
    fn test_quote_deserializes_and_converts_to_route() {
        let quote: Quote = serde_json::from_str(QUOTE_JSON).unwrap();
        assert_eq!(quote.tool_name(), "Stargate");
        assert_eq!(quote.action.to_token.price_usd.as_deref(), Some("1.00"));

        let route = quote.into_route();
        assert_eq!(route.first_chain_id(), Some(42161));
        assert_eq!(route.to_amount_min, "2492500000000000");
        assert_eq!(route.steps.len(), 1);
        assert!(route.last_process().is_none());
    }
}
