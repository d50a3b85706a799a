mod models;
mod schema;
mod sqlite_portfolio_store;

pub use models::*;
pub use schema::PORTFOLIO_VERSIONED_SCHEMAS;
pub use sqlite_portfolio_store::SqlitePortfolioStore;

use crate::chain::Chain;
use anyhow::Result;

pub trait PortfolioStore: Send + Sync {
    // Wallets
    /// Connects a wallet. The first wallet of a user becomes primary; connecting
    /// the same (user, address, chain) twice is an error.
    fn add_wallet(&self, user_id: &str, address: &str, chain: Chain) -> Result<WalletRecord>;
    fn get_wallet(&self, wallet_id: &str) -> Result<Option<WalletRecord>>;
    /// Primary wallet first, then by connection time.
    fn list_wallets(&self, user_id: &str) -> Result<Vec<WalletRecord>>;
    /// Returns false if the wallet does not belong to the user.
    fn set_primary_wallet(&self, user_id: &str, wallet_id: &str) -> Result<bool>;
    /// Removes a wallet with its positions. If it was primary, the oldest
    /// remaining wallet of the user is promoted.
    fn remove_wallet(&self, wallet_id: &str) -> Result<bool>;

    // Positions
    fn upsert_position(&self, update: &PositionUpdate) -> Result<PortfolioPosition>;
    fn list_positions(&self, wallet_id: &str) -> Result<Vec<PortfolioPosition>>;
    /// Sum of the USD value of all token and staking positions of a user.
    fn total_usd_value(&self, user_id: &str) -> Result<f64>;

    // Staking
    fn add_staking_position(&self, position: &NewStakingPosition) -> Result<StakingPosition>;
    fn list_staking_positions(&self, wallet_id: &str) -> Result<Vec<StakingPosition>>;

    // Transactions
    fn record_transaction(&self, tx: &NewTransaction) -> Result<TransactionRecord>;
    /// Sets `completed_at` on completion and stores `error_message` when given.
    /// Returns false if no such transaction exists.
    fn update_transaction_status(
        &self,
        id: &str,
        status: TransactionStatus,
        tx_hash: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<bool>;
    fn get_transaction(&self, id: &str) -> Result<Option<TransactionRecord>>;
    /// Newest first.
    fn list_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<TransactionRecord>>;
    fn activity_stats(&self, user_id: &str) -> Result<ActivityStats>;
}
