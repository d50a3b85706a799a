use crate::chain::Chain;
use crate::workflow::StepAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Wallets
// =============================================================================

/// A wallet address a user has connected on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: String,
    pub user_id: String,
    pub address: String,
    pub chain: Chain,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Positions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub id: String,
    pub wallet_id: String,
    pub chain: Chain,
    pub token_symbol: String,
    pub token_address: String,
    /// Human-readable balance, kept as text to avoid float rounding.
    pub balance: String,
    pub usd_value: Option<f64>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Balance snapshot for one token held by a wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub wallet_id: String,
    pub chain: Chain,
    pub token_symbol: String,
    pub token_address: String,
    pub balance: String,
    pub usd_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingPosition {
    pub id: String,
    pub wallet_id: String,
    pub chain: Chain,
    pub protocol: String,
    pub token_symbol: String,
    pub staked_amount: String,
    pub rewards_earned: String,
    pub apy: Option<f64>,
    pub usd_value: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub last_claim: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStakingPosition {
    pub wallet_id: String,
    pub chain: Chain,
    pub protocol: String,
    pub token_symbol: String,
    pub staked_amount: String,
    pub rewards_earned: String,
    pub apy: Option<f64>,
    pub usd_value: Option<f64>,
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirming,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirming => "confirming",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "confirming" => Some(TransactionStatus::Confirming),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    /// Still waiting on the chain.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Pending | TransactionStatus::Confirming
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub user_id: String,
    pub wallet_id: Option<String>,
    pub tx_hash: Option<String>,
    pub action: StepAction,
    pub status: TransactionStatus,
    pub from_chain: Chain,
    pub to_chain: Option<Chain>,
    pub from_token: String,
    pub to_token: Option<String>,
    pub from_amount: String,
    pub to_amount: Option<String>,
    pub gas_fee: Option<f64>,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: String,
    pub wallet_id: Option<String>,
    pub tx_hash: Option<String>,
    pub action: StepAction,
    pub status: TransactionStatus,
    pub from_chain: Chain,
    pub to_chain: Option<Chain>,
    pub from_token: String,
    pub to_token: Option<String>,
    pub from_amount: String,
    pub to_amount: Option<String>,
    pub gas_fee: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}

impl NewTransaction {
    pub fn pending(
        user_id: impl Into<String>,
        action: StepAction,
        from_chain: Chain,
        from_token: impl Into<String>,
        from_amount: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            wallet_id: None,
            tx_hash: None,
            action,
            status: TransactionStatus::Pending,
            from_chain,
            to_chain: None,
            from_token: from_token.into(),
            to_token: None,
            from_amount: from_amount.into(),
            to_amount: None,
            gas_fee: None,
            metadata: None,
        }
    }
}

/// Aggregate counts over a user's transaction history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Pending or confirming.
    pub pending: usize,
    pub avg_gas_fee: f64,
}

impl ActivityStats {
    /// Completed share of all transactions, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}
