use super::models::{
    ActivityStats, NewStakingPosition, NewTransaction, PortfolioPosition, PositionUpdate,
    StakingPosition, TransactionRecord, TransactionStatus, WalletRecord,
};
use super::schema::PORTFOLIO_VERSIONED_SCHEMAS;
use super::PortfolioStore;
use crate::chain::Chain;
use crate::sqlite_persistence::open_versioned;
use crate::workflow::StepAction;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

const WALLET_COLUMNS: &str = "id, user_id, address, chain, is_primary, created_at, updated_at";
const POSITION_COLUMNS: &str = "id, wallet_id, chain, token_symbol, token_address, balance, \
     usd_value, last_updated, created_at";
const STAKING_COLUMNS: &str = "id, wallet_id, chain, protocol, token_symbol, staked_amount, \
     rewards_earned, apy, usd_value, started_at, last_claim, created_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, wallet_id, tx_hash, action, status, from_chain, \
     to_chain, from_token, to_token, from_amount, to_amount, gas_fee, error_message, metadata, \
     created_at, updated_at, completed_at";

pub struct SqlitePortfolioStore {
    conn: Arc<Mutex<Connection>>,
}

fn conversion_error(column: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        Type::Text,
        format!("invalid {} value: {}", column, value).into(),
    )
}

impl SqlitePortfolioStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, PORTFOLIO_VERSIONED_SCHEMAS, "portfolio")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fixed-width RFC 3339 so text ordering matches time ordering.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_chain(column: &str, value: String) -> rusqlite::Result<Chain> {
        Chain::parse(&value).ok_or_else(|| conversion_error(column, &value))
    }

    fn row_to_wallet(row: &rusqlite::Row) -> rusqlite::Result<WalletRecord> {
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        Ok(WalletRecord {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            address: row.get("address")?,
            chain: Self::parse_chain("chain", row.get("chain")?)?,
            is_primary: row.get::<_, i64>("is_primary")? != 0,
            created_at: Self::parse_datetime(&created_at),
            updated_at: Self::parse_datetime(&updated_at),
        })
    }

    fn row_to_position(row: &rusqlite::Row) -> rusqlite::Result<PortfolioPosition> {
        let last_updated: String = row.get("last_updated")?;
        let created_at: String = row.get("created_at")?;
        Ok(PortfolioPosition {
            id: row.get("id")?,
            wallet_id: row.get("wallet_id")?,
            chain: Self::parse_chain("chain", row.get("chain")?)?,
            token_symbol: row.get("token_symbol")?,
            token_address: row.get("token_address")?,
            balance: row.get("balance")?,
            usd_value: row.get("usd_value")?,
            last_updated: Self::parse_datetime(&last_updated),
            created_at: Self::parse_datetime(&created_at),
        })
    }

    fn row_to_staking(row: &rusqlite::Row) -> rusqlite::Result<StakingPosition> {
        let started_at: String = row.get("started_at")?;
        let last_claim: Option<String> = row.get("last_claim")?;
        let created_at: String = row.get("created_at")?;
        Ok(StakingPosition {
            id: row.get("id")?,
            wallet_id: row.get("wallet_id")?,
            chain: Self::parse_chain("chain", row.get("chain")?)?,
            protocol: row.get("protocol")?,
            token_symbol: row.get("token_symbol")?,
            staked_amount: row.get("staked_amount")?,
            rewards_earned: row.get("rewards_earned")?,
            apy: row.get("apy")?,
            usd_value: row.get("usd_value")?,
            started_at: Self::parse_datetime(&started_at),
            last_claim: last_claim.as_deref().map(Self::parse_datetime),
            created_at: Self::parse_datetime(&created_at),
        })
    }

    fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<TransactionRecord> {
        let action: String = row.get("action")?;
        let status: String = row.get("status")?;
        let to_chain: Option<String> = row.get("to_chain")?;
        let metadata: Option<String> = row.get("metadata")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        let completed_at: Option<String> = row.get("completed_at")?;

        Ok(TransactionRecord {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            wallet_id: row.get("wallet_id")?,
            tx_hash: row.get("tx_hash")?,
            action: StepAction::parse(&action).ok_or_else(|| conversion_error("action", &action))?,
            status: TransactionStatus::parse(&status).unwrap_or(TransactionStatus::Failed),
            from_chain: Self::parse_chain("from_chain", row.get("from_chain")?)?,
            to_chain: to_chain
                .map(|c| Self::parse_chain("to_chain", c))
                .transpose()?,
            from_token: row.get("from_token")?,
            to_token: row.get("to_token")?,
            from_amount: row.get("from_amount")?,
            to_amount: row.get("to_amount")?,
            gas_fee: row.get("gas_fee")?,
            error_message: row.get("error_message")?,
            metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
            created_at: Self::parse_datetime(&created_at),
            updated_at: Self::parse_datetime(&updated_at),
            completed_at: completed_at.as_deref().map(Self::parse_datetime),
        })
    }

    fn wallet_by_id(conn: &Connection, wallet_id: &str) -> Result<Option<WalletRecord>> {
        let wallet = conn
            .query_row(
                &format!("SELECT {} FROM wallets WHERE id = ?1", WALLET_COLUMNS),
                params![wallet_id],
                Self::row_to_wallet,
            )
            .optional()?;
        Ok(wallet)
    }

    fn transaction_by_id(conn: &Connection, id: &str) -> Result<Option<TransactionRecord>> {
        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE id = ?1",
                    TRANSACTION_COLUMNS
                ),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }
}

impl PortfolioStore for SqlitePortfolioStore {
    fn add_wallet(&self, user_id: &str, address: &str, chain: Chain) -> Result<WalletRecord> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let already_connected: bool = tx
            .query_row(
                "SELECT 1 FROM wallets WHERE user_id = ?1 AND address = ?2 AND chain = ?3",
                params![user_id, address, chain.as_str()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if already_connected {
            bail!("This wallet is already connected");
        }

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM wallets WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        let now = Self::format_datetime(&Utc::now());
        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO wallets (id, user_id, address, chain, is_primary, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![id, user_id, address, chain.as_str(), existing == 0, now],
        )
        .context("Failed to insert wallet")?;

        let wallet = Self::wallet_by_id(&tx, &id)?.context("Inserted wallet not found")?;
        tx.commit()?;

        info!(user_id, wallet_id = %wallet.id, chain = %chain, "Wallet connected");
        Ok(wallet)
    }

    fn get_wallet(&self, wallet_id: &str) -> Result<Option<WalletRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::wallet_by_id(&conn, wallet_id)
    }

    fn list_wallets(&self, user_id: &str) -> Result<Vec<WalletRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM wallets WHERE user_id = ?1
             ORDER BY is_primary DESC, created_at ASC, rowid ASC",
            WALLET_COLUMNS
        ))?;
        let wallets = stmt
            .query_map(params![user_id], Self::row_to_wallet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(wallets)
    }

    fn set_primary_wallet(&self, user_id: &str, wallet_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let belongs: bool = tx
            .query_row(
                "SELECT 1 FROM wallets WHERE id = ?1 AND user_id = ?2",
                params![wallet_id, user_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !belongs {
            return Ok(false);
        }

        let now = Self::format_datetime(&Utc::now());
        tx.execute(
            "UPDATE wallets SET is_primary = (id = ?2), updated_at = ?3 WHERE user_id = ?1",
            params![user_id, wallet_id, now],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn remove_wallet(&self, wallet_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let Some(wallet) = Self::wallet_by_id(&tx, wallet_id)? else {
            return Ok(false);
        };
        tx.execute("DELETE FROM wallets WHERE id = ?1", params![wallet_id])?;

        if wallet.is_primary {
            let promoted = tx.execute(
                "UPDATE wallets SET is_primary = 1, updated_at = ?2 WHERE id = (
                     SELECT id FROM wallets WHERE user_id = ?1
                     ORDER BY created_at ASC, rowid ASC LIMIT 1
                 )",
                params![wallet.user_id, Self::format_datetime(&Utc::now())],
            )?;
            if promoted > 0 {
                debug!(user_id = %wallet.user_id, "Promoted oldest wallet to primary");
            }
        }
        tx.commit()?;
        Ok(true)
    }

    fn upsert_position(&self, update: &PositionUpdate) -> Result<PortfolioPosition> {
        let conn = self.conn.lock().unwrap();
        let now = Self::format_datetime(&Utc::now());
        conn.execute(
            "INSERT INTO portfolio_positions
                 (id, wallet_id, chain, token_symbol, token_address, balance, usd_value,
                  last_updated, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(wallet_id, chain, token_address) DO UPDATE SET
                 token_symbol = excluded.token_symbol,
                 balance = excluded.balance,
                 usd_value = excluded.usd_value,
                 last_updated = excluded.last_updated",
            params![
                Uuid::new_v4().to_string(),
                update.wallet_id,
                update.chain.as_str(),
                update.token_symbol,
                update.token_address,
                update.balance,
                update.usd_value,
                now
            ],
        )
        .with_context(|| format!("Failed to upsert position for wallet {}", update.wallet_id))?;

        let position = conn.query_row(
            &format!(
                "SELECT {} FROM portfolio_positions
                 WHERE wallet_id = ?1 AND chain = ?2 AND token_address = ?3",
                POSITION_COLUMNS
            ),
            params![update.wallet_id, update.chain.as_str(), update.token_address],
            Self::row_to_position,
        )?;
        Ok(position)
    }

    fn list_positions(&self, wallet_id: &str) -> Result<Vec<PortfolioPosition>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM portfolio_positions WHERE wallet_id = ?1
             ORDER BY usd_value DESC, token_symbol ASC",
            POSITION_COLUMNS
        ))?;
        let positions = stmt
            .query_map(params![wallet_id], Self::row_to_position)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(positions)
    }

    fn total_usd_value(&self, user_id: &str) -> Result<f64> {
        let conn = self.conn.lock().unwrap();
        let total: f64 = conn.query_row(
            "SELECT
                 COALESCE((SELECT SUM(p.usd_value) FROM portfolio_positions p
                           JOIN wallets w ON w.id = p.wallet_id WHERE w.user_id = ?1), 0)
               + COALESCE((SELECT SUM(s.usd_value) FROM staking_positions s
                           JOIN wallets w ON w.id = s.wallet_id WHERE w.user_id = ?1), 0)",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn add_staking_position(&self, position: &NewStakingPosition) -> Result<StakingPosition> {
        let conn = self.conn.lock().unwrap();
        let now = Self::format_datetime(&Utc::now());
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO staking_positions
                 (id, wallet_id, chain, protocol, token_symbol, staked_amount, rewards_earned,
                  apy, usd_value, started_at, last_claim, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?10)",
            params![
                id,
                position.wallet_id,
                position.chain.as_str(),
                position.protocol,
                position.token_symbol,
                position.staked_amount,
                position.rewards_earned,
                position.apy,
                position.usd_value,
                now
            ],
        )
        .with_context(|| {
            format!(
                "Failed to add staking position for wallet {}",
                position.wallet_id
            )
        })?;

        let staking = conn.query_row(
            &format!(
                "SELECT {} FROM staking_positions WHERE id = ?1",
                STAKING_COLUMNS
            ),
            params![id],
            Self::row_to_staking,
        )?;
        Ok(staking)
    }

    fn list_staking_positions(&self, wallet_id: &str) -> Result<Vec<StakingPosition>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM staking_positions WHERE wallet_id = ?1 ORDER BY started_at DESC",
            STAKING_COLUMNS
        ))?;
        let positions = stmt
            .query_map(params![wallet_id], Self::row_to_staking)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(positions)
    }

    fn record_transaction(&self, new_tx: &NewTransaction) -> Result<TransactionRecord> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = Self::format_datetime(&now);
        let completed_at = (new_tx.status == TransactionStatus::Completed).then(|| now_str.clone());
        let metadata = new_tx
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO transactions
                 (id, user_id, wallet_id, tx_hash, action, status, from_chain, to_chain,
                  from_token, to_token, from_amount, to_amount, gas_fee, error_message,
                  metadata, created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, NULL,
                     ?14, ?15, ?15, ?16)",
            params![
                id,
                new_tx.user_id,
                new_tx.wallet_id,
                new_tx.tx_hash,
                new_tx.action.as_str(),
                new_tx.status.as_str(),
                new_tx.from_chain.as_str(),
                new_tx.to_chain.map(|c| c.as_str()),
                new_tx.from_token,
                new_tx.to_token,
                new_tx.from_amount,
                new_tx.to_amount,
                new_tx.gas_fee,
                metadata,
                now_str,
                completed_at
            ],
        )
        .context("Failed to record transaction")?;

        debug!(tx_id = %id, action = %new_tx.action, status = new_tx.status.as_str(), "Recorded transaction");
        Self::transaction_by_id(&conn, &id)?.context("Recorded transaction not found")
    }

    fn update_transaction_status(
        &self,
        id: &str,
        status: TransactionStatus,
        tx_hash: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Self::format_datetime(&Utc::now());
        let completed_at = (status == TransactionStatus::Completed).then(|| now.clone());
        let updated = conn.execute(
            "UPDATE transactions SET
                 status = ?2,
                 tx_hash = COALESCE(?3, tx_hash),
                 error_message = COALESCE(?4, error_message),
                 completed_at = COALESCE(?5, completed_at),
                 updated_at = ?6
             WHERE id = ?1",
            params![id, status.as_str(), tx_hash, error_message, completed_at, now],
        )?;
        Ok(updated > 0)
    }

    fn get_transaction(&self, id: &str) -> Result<Option<TransactionRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::transaction_by_id(&conn, id)
    }

    fn list_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            TRANSACTION_COLUMNS
        ))?;
        let txs = stmt
            .query_map(params![user_id, limit as i64], Self::row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    fn activity_stats(&self, user_id: &str) -> Result<ActivityStats> {
        let conn = self.conn.lock().unwrap();
        let (total, completed, failed, pending, avg_gas_fee): (i64, i64, i64, i64, f64) = conn
            .query_row(
                "SELECT
                     COUNT(*),
                     COALESCE(SUM(status = 'completed'), 0),
                     COALESCE(SUM(status = 'failed'), 0),
                     COALESCE(SUM(status IN ('pending', 'confirming')), 0),
                     COALESCE(AVG(COALESCE(gas_fee, 0)), 0)
                 FROM transactions WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )?;
        Ok(ActivityStats {
            total: total as usize,
            completed: completed as usize,
            failed: failed as usize,
            pending: pending as usize,
            avg_gas_fee,
        })
    }
}
