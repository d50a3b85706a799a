//! Multichain DeFi workflow orchestration: step descriptors, approval and
//! route adapters, a sequential runner, plus the yield-data and portfolio
//! plumbing around them.

pub mod adapters;
pub mod chain;
pub mod cli_style;
pub mod config;
pub mod portfolio_store;
pub mod routing;
pub mod sqlite_persistence;
pub mod units;
pub mod wallet;
pub mod workflow;
pub mod yields;

// Re-export commonly used types for convenience
pub use chain::Chain;
pub use portfolio_store::{PortfolioStore, SqlitePortfolioStore};
pub use workflow::{
    ExecutionProvider, MockExecutionProvider, WorkflowOutcome, WorkflowRunner, WorkflowStep,
};
