//! Wallet and chain-read capabilities.
//!
//! The wallet itself (signing, account management, chain switching) lives
//! outside this crate. Everything here talks to it through two narrow traits:
//! - [`WalletSession`]: the connected account, chain switching and writes
//! - [`ChainReader`]: read-only contract state (allowance, decimals)

mod decimals;
mod execution_provider;
mod rpc_reader;

pub use decimals::TokenDecimalsCache;
pub use execution_provider::WalletExecutionProvider;
pub use rpc_reader::JsonRpcChainReader;

use crate::chain::Chain;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 "unrecognized chain id".
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Errors surfaced by wallet and RPC operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WalletError {
    #[error("User rejected the request")]
    UserRejectedSignature,

    #[error("Wallet has no active account")]
    NoAccount,

    #[error("Connected wallet cannot switch chains programmatically.")]
    ChainSwitchUnsupported,

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl WalletError {
    /// Maps an EIP-1193 / JSON-RPC error object onto a typed error.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        match code {
            USER_REJECTED_CODE => WalletError::UserRejectedSignature,
            UNRECOGNIZED_CHAIN_CODE => WalletError::UnsupportedChain(message.into()),
            _ => WalletError::Rpc {
                code,
                message: message.into(),
            },
        }
    }

    pub fn is_user_rejected(&self) -> bool {
        matches!(self, WalletError::UserRejectedSignature)
    }
}

/// A contract write the wallet should encode, sign and submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractWrite {
    pub chain_id: u64,
    pub address: Address,
    /// Human-readable signature, e.g. `function approve(address,uint256)`.
    pub function_signature: String,
    pub function_name: String,
    pub args: Vec<serde_json::Value>,
}

impl ContractWrite {
    /// An ERC-20 `approve(spender, amount)` call for exactly `amount`.
    pub fn erc20_approve(chain_id: u64, token: Address, spender: Address, amount: U256) -> Self {
        Self {
            chain_id,
            address: token,
            function_signature: "function approve(address spender, uint256 amount)".to_string(),
            function_name: "approve".to_string(),
            args: vec![
                serde_json::Value::String(spender.to_string()),
                serde_json::Value::String(amount.to_string()),
            ],
        }
    }
}

/// A raw transaction prepared by a router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas_limit: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// The connected wallet for one session.
///
/// Chain switches mutate the session in place; callers keep the same handle.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// The active account, if the wallet has one.
    fn account(&self) -> Option<Address>;

    /// The chain the wallet is currently on.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Ask the wallet to switch to another chain.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Sign and submit a contract write. Returns the transaction hash.
    async fn write_contract(&self, call: ContractWrite) -> Result<String, WalletError>;

    /// Sign and submit a prepared transaction. Returns the transaction hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<String, WalletError>;
}

/// Read-only on-chain state.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn allowance(
        &self,
        chain: Chain,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError>;

    async fn decimals(&self, chain: Chain, token: Address) -> Result<u8, WalletError>;
}

/// Switches the wallet to `chain_id` unless it is already there.
pub async fn ensure_wallet_on_chain(
    wallet: &dyn WalletSession,
    chain_id: u64,
) -> Result<(), WalletError> {
    let current = wallet.chain_id().await?;
    if current == chain_id {
        return Ok(());
    }
    debug!("Switching wallet from chain {} to {}", current, chain_id);
    wallet.switch_chain(chain_id).await
}
