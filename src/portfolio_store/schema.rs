//! SQLite schema of the portfolio database.

use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

const WALLET_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "wallets",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRANSACTION_WALLET_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "wallets",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};

// =============================================================================
// Version 1
// =============================================================================

const WALLETS_TABLE_V1: Table = Table {
    name: "wallets",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("address", &SqlType::Text, non_null = true),
        sqlite_column!("chain", &SqlType::Text, non_null = true),
        sqlite_column!("is_primary", &SqlType::Integer, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_wallets_user_id", "user_id")],
    unique_constraints: &[&["user_id", "address", "chain"]],
};

const PORTFOLIO_POSITIONS_TABLE_V1: Table = Table {
    name: "portfolio_positions",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "wallet_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&WALLET_FOREIGN_KEY)
        ),
        sqlite_column!("chain", &SqlType::Text, non_null = true),
        sqlite_column!("token_symbol", &SqlType::Text, non_null = true),
        sqlite_column!("token_address", &SqlType::Text, non_null = true),
        sqlite_column!("balance", &SqlType::Text, non_null = true),
        sqlite_column!("usd_value", &SqlType::Real),
        sqlite_column!("last_updated", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["wallet_id", "chain", "token_address"]],
};

const STAKING_POSITIONS_TABLE_V1: Table = Table {
    name: "staking_positions",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "wallet_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&WALLET_FOREIGN_KEY)
        ),
        sqlite_column!("chain", &SqlType::Text, non_null = true),
        sqlite_column!("protocol", &SqlType::Text, non_null = true),
        sqlite_column!("token_symbol", &SqlType::Text, non_null = true),
        sqlite_column!("staked_amount", &SqlType::Text, non_null = true),
        sqlite_column!("rewards_earned", &SqlType::Text, non_null = true),
        sqlite_column!("apy", &SqlType::Real),
        sqlite_column!("usd_value", &SqlType::Real),
        sqlite_column!("started_at", &SqlType::Text, non_null = true),
        sqlite_column!("last_claim", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_staking_positions_wallet_id", "wallet_id")],
    unique_constraints: &[],
};

const TRANSACTIONS_TABLE_V1: Table = Table {
    name: "transactions",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "wallet_id",
            &SqlType::Text,
            foreign_key = Some(&TRANSACTION_WALLET_FOREIGN_KEY)
        ),
        sqlite_column!("tx_hash", &SqlType::Text),
        sqlite_column!("action", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("from_chain", &SqlType::Text, non_null = true),
        sqlite_column!("to_chain", &SqlType::Text),
        sqlite_column!("from_token", &SqlType::Text, non_null = true),
        sqlite_column!("to_token", &SqlType::Text),
        sqlite_column!("from_amount", &SqlType::Text, non_null = true),
        sqlite_column!("to_amount", &SqlType::Text),
        sqlite_column!("gas_fee", &SqlType::Real),
        sqlite_column!("error_message", &SqlType::Text),
        sqlite_column!("metadata", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
        sqlite_column!("completed_at", &SqlType::Text),
    ],
    indices: &[
        ("idx_transactions_user_created", "user_id, created_at DESC"),
        ("idx_transactions_status", "status"),
    ],
    unique_constraints: &[],
};

pub const PORTFOLIO_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        WALLETS_TABLE_V1,
        PORTFOLIO_POSITIONS_TABLE_V1,
        STAKING_POSITIONS_TABLE_V1,
        TRANSACTIONS_TABLE_V1,
    ],
    migration: None,
}];
