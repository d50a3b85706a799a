//! Cross-chain swap and bridge routing.
//!
//! [`RoutingClient`] is the quoting/execution surface the route adapter
//! drives. [`LifiClient`] implements it against the LI.FI REST API using a
//! wallet session supplied at construction.

mod lifi;
mod models;

pub use lifi::{LifiClient, LifiConfig};
pub use models::{
    ExecutionStatus, Process, Quote, QuoteRequest, Route, RouteAction, RouteStep, StepEstimate,
    StepExecution, TokenInfo, ToolDetails, TransferLeg, TransferStatus,
};

use crate::wallet::WalletError;
use alloy_primitives::U256;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("User rejected the request")]
    UserRejectedSignature,

    #[error("Routing API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Routing API unreachable: {0}")]
    Connection(String),

    #[error("Invalid routing response: {0}")]
    InvalidResponse(String),

    #[error("Exchange rate update was not accepted")]
    ExchangeRateUpdateRejected,

    #[error("Route step {0} has no transaction to submit")]
    MissingTransactionRequest(String),

    #[error("Route step {step_id} failed: {message}")]
    StepFailed { step_id: String, message: String },

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl RoutingError {
    /// True when the wallet user declined to sign, directly or through a
    /// wrapped wallet error.
    pub fn is_user_rejected(&self) -> bool {
        match self {
            RoutingError::UserRejectedSignature => true,
            RoutingError::Wallet(e) => e.is_user_rejected(),
            _ => false,
        }
    }
}

/// Callbacks invoked while a route executes.
#[async_trait]
pub trait RouteExecutionHooks: Send {
    /// The next step needs the wallet on `chain_id`.
    async fn switch_chain(&mut self, chain_id: u64) -> Result<(), RoutingError>;

    /// The route's execution state changed.
    fn update_route(&mut self, route: &Route);

    /// The guaranteed output dropped between quote and execution. Returning
    /// false aborts the route.
    async fn accept_exchange_rate_update(&mut self, previous_min: U256, new_min: U256) -> bool;
}

#[async_trait]
pub trait RoutingClient: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError>;

    /// Executes every step of `route` in order and returns the final route state.
    async fn execute_route(
        &self,
        route: Route,
        hooks: &mut dyn RouteExecutionHooks,
    ) -> Result<Route, RoutingError>;
}
