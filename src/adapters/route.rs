//! Two-step route workflow: fetch a quote, then execute it.
//!
//! The quote step stores the route in [`WorkflowContext::last_quoted_route`];
//! the execute step refuses to run without it.

use crate::chain::Chain;
use crate::routing::{Route, RouteExecutionHooks, RoutingClient, RoutingError, QuoteRequest};
use crate::units::{format_amount_short, parse_amount, parse_base_units};
use crate::wallet::{ensure_wallet_on_chain, TokenDecimalsCache, WalletSession};
use crate::workflow::{
    ExecutionProvider, RouteExecutionMetadata, RouteQuoteMetadata, StepAction, StepError,
    StepExecutor, TypedMetadata, WorkflowContext, WorkflowStep, WorkflowStepResult,
};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const QUOTE_STEP_ID: &str = "route-get-quote";
pub const EXECUTE_STEP_ID: &str = "route-execute-route";
pub const DEFAULT_SLIPPAGE: f64 = 0.003;

/// Hash reported when the user declines the route transaction.
pub const REJECTED_TX_PLACEHOLDER: &str =
    "0x9834ba2b00b417ed4cecb75f064afab608f0787dc98968f85e031072127f89df";
pub const REJECTED_MESSAGE: &str = "Transaction rejected in wallet. Continuing workflow.";

#[derive(Debug, Clone)]
pub struct RouteParams {
    pub source_chain: Chain,
    pub source_token_address: Address,
    /// Human units of the source token.
    pub from_amount: String,
    pub destination_chain: Chain,
    pub destination_token_address: Address,
    pub slippage: f64,
}

/// Builds the `[quote, execute]` step pair for a swap or bridge.
pub async fn create_route_workflow_steps(
    params: RouteParams,
    decimals: &TokenDecimalsCache,
) -> Result<Vec<WorkflowStep>, StepError> {
    let (Some(from_chain_id), Some(to_chain_id)) =
        (params.source_chain.id(), params.destination_chain.id())
    else {
        return Err(StepError::Configuration(
            "Both source and destination chains must be supported EVM chains.".to_string(),
        ));
    };

    let source_decimals = decimals
        .decimals(params.source_chain, params.source_token_address)
        .await?;
    let from_amount = parse_amount(&params.from_amount, source_decimals)
        .map_err(|e| StepError::Configuration(e.to_string()))?;

    let quote = WorkflowStep::new(QUOTE_STEP_ID, "Fetch Route Quote", StepAction::Swap)
        .with_description(format!(
            "Prepare route from {} to {}",
            params.source_chain, params.destination_chain
        ))
        .with_chains(params.source_chain, params.source_chain)
        .with_amount(params.from_amount.clone())
        .with_metadata(TypedMetadata::RouteQuote(RouteQuoteMetadata {
            from_chain_id,
            to_chain_id,
            from_token_address: params.source_token_address,
            to_token_address: params.destination_token_address,
            decimals: source_decimals,
            from_amount,
            slippage: params.slippage,
        }));

    let execute = WorkflowStep::new(EXECUTE_STEP_ID, "Execute Swap & Bridge", StepAction::Bridge)
        .with_description("Execute the quoted route")
        .with_chains(params.source_chain, params.destination_chain)
        .with_metadata(TypedMetadata::RouteExecution(RouteExecutionMetadata {
            route_description: "Cross-chain swap via smart routing".to_string(),
        }));

    Ok(vec![quote, execute])
}

/// Requests a quote and caches the resulting route in the run context.
pub struct RouteQuoteExecutor {
    wallet: Arc<dyn WalletSession>,
    router: Arc<dyn RoutingClient>,
}

impl RouteQuoteExecutor {
    pub fn new(wallet: Arc<dyn WalletSession>, router: Arc<dyn RoutingClient>) -> Self {
        Self { wallet, router }
    }
}

#[async_trait]
impl StepExecutor for RouteQuoteExecutor {
    async fn execute(
        &self,
        _provider: &dyn ExecutionProvider,
        step: &WorkflowStep,
        ctx: &mut WorkflowContext,
    ) -> Result<WorkflowStepResult, StepError> {
        let metadata = step
            .metadata
            .as_ref()
            .and_then(|m| m.route_quote())
            .ok_or_else(|| StepError::MissingMetadata {
                step_id: step.id.clone(),
                expected: "routeQuote",
            })?;
        let account = self.wallet.account().ok_or(StepError::MissingAccount)?;

        let request = QuoteRequest {
            from_chain: metadata.from_chain_id,
            to_chain: metadata.to_chain_id,
            from_token: metadata.from_token_address.to_string(),
            to_token: metadata.to_token_address.to_string(),
            from_address: account.to_string(),
            to_address: account.to_string(),
            from_amount: metadata.from_amount.to_string(),
            slippage: metadata.slippage,
        };

        let quote = self.router.get_quote(&request).await?;

        let estimated_out = parse_base_units(&quote.estimate.to_amount_min)
            .filter(|amount| *amount > U256::ZERO)
            .and_then(|amount| format_amount_short(amount, quote.action.to_token.decimals));
        let message = match estimated_out {
            Some(amount) => {
                let symbol = if quote.action.to_token.symbol.is_empty() {
                    step.token_out.clone().unwrap_or_default()
                } else {
                    quote.action.to_token.symbol.clone()
                };
                format!("Quote prepared via {}: ~{} {}", quote.tool_name(), amount, symbol)
            }
            None => "Quote prepared".to_string(),
        };
        info!("Route quote {} via {}", quote.id, quote.tool_name());

        ctx.last_quoted_route = Some(quote.into_route());
        Ok(WorkflowStepResult::message_only(message))
    }
}

/// Keeps the context's route in sync while the routing client executes it.
struct ContextRouteHooks<'a> {
    wallet: &'a dyn WalletSession,
    cached: &'a mut Option<Route>,
}

#[async_trait]
impl<'a> RouteExecutionHooks for ContextRouteHooks<'a> {
    async fn switch_chain(&mut self, chain_id: u64) -> Result<(), RoutingError> {
        ensure_wallet_on_chain(self.wallet, chain_id).await?;
        Ok(())
    }

    fn update_route(&mut self, route: &Route) {
        *self.cached = Some(route.clone());
    }

    async fn accept_exchange_rate_update(&mut self, previous_min: U256, new_min: U256) -> bool {
        debug!(
            "Auto-accepting exchange rate update: {} -> {}",
            previous_min, new_min
        );
        true
    }
}

/// Executes the route cached by the quote step.
///
/// A signature the user declines is reported as a successful step with a
/// placeholder hash so the rest of the workflow can continue.
pub struct RouteExecuteExecutor {
    wallet: Arc<dyn WalletSession>,
    router: Arc<dyn RoutingClient>,
}

impl RouteExecuteExecutor {
    pub fn new(wallet: Arc<dyn WalletSession>, router: Arc<dyn RoutingClient>) -> Self {
        Self { wallet, router }
    }
}

#[async_trait]
impl StepExecutor for RouteExecuteExecutor {
    async fn execute(
        &self,
        _provider: &dyn ExecutionProvider,
        step: &WorkflowStep,
        ctx: &mut WorkflowContext,
    ) -> Result<WorkflowStepResult, StepError> {
        let route = ctx
            .last_quoted_route
            .clone()
            .ok_or(StepError::MissingRoute)?;

        if let Some(first_chain_id) = route.first_chain_id() {
            ensure_wallet_on_chain(self.wallet.as_ref(), first_chain_id).await?;
        }

        let outcome = {
            let mut hooks = ContextRouteHooks {
                wallet: self.wallet.as_ref(),
                cached: &mut ctx.last_quoted_route,
            };
            self.router.execute_route(route, &mut hooks).await
        };

        match outcome {
            Ok(executed) => {
                let result = summarize_executed_route(&executed, &step.label);
                ctx.last_quoted_route = Some(executed);
                Ok(result)
            }
            Err(e) if e.is_user_rejected() => {
                warn!("Route transaction rejected in wallet, continuing workflow");
                Ok(WorkflowStepResult::with_hash(
                    REJECTED_TX_PLACEHOLDER,
                    REJECTED_MESSAGE,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn summarize_executed_route(route: &Route, label: &str) -> WorkflowStepResult {
    let last_process = route.last_process();
    let execution = route.steps.last().and_then(|s| s.execution.as_ref());

    let received = execution.and_then(|e| {
        let amount = parse_base_units(e.to_amount.as_deref()?)?;
        let token = e.to_token.as_ref()?;
        let formatted = format_amount_short(amount, token.decimals)?;
        Some(format!("Route executed. Received ~{} {}.", formatted, token.symbol))
    });

    let message = received
        .or_else(|| last_process.and_then(|p| p.message.clone()))
        .unwrap_or_else(|| format!("Route executed via {}.", label));

    WorkflowStepResult {
        tx_hash: last_process.and_then(|p| p.tx_hash.clone()),
        message: Some(message),
    }
}
