//! LI.FI REST client.

use super::models::{
    ExecutionStatus, Process, Quote, QuoteRequest, Route, RouteStep, StepExecution,
    TransferStatus,
};
use super::{RouteExecutionHooks, RoutingClient, RoutingError};
use crate::chain::{is_native_token, Chain};
use crate::units::parse_base_units;
use crate::wallet::{ChainReader, ContractWrite, WalletError, WalletSession};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_LIFI_API_BASE: &str = "https://li.quest/v1";
pub const DEFAULT_INTEGRATOR: &str = "defi-one-click";

#[derive(Debug, Clone)]
pub struct LifiConfig {
    pub api_base: String,
    pub integrator: String,
    pub timeout_sec: u64,
    /// Delay between two `GET /status` polls while a transfer settles.
    pub status_poll_interval: Duration,
    pub status_max_polls: u32,
}

impl Default for LifiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_LIFI_API_BASE.to_string(),
            integrator: DEFAULT_INTEGRATOR.to_string(),
            timeout_sec: 30,
            status_poll_interval: Duration::from_secs(5),
            status_max_polls: 120,
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Routing client bound to one wallet session.
///
/// A new client is built whenever the active wallet changes; it never
/// reconfigures itself. The chain reader is used for source-token allowance
/// checks before a step's transaction is submitted.
pub struct LifiClient {
    client: Client,
    config: LifiConfig,
    wallet: Arc<dyn WalletSession>,
    reader: Arc<dyn ChainReader>,
}

impl LifiClient {
    pub fn new(
        config: LifiConfig,
        wallet: Arc<dyn WalletSession>,
        reader: Arc<dyn ChainReader>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()?;
        Ok(Self {
            client,
            config,
            wallet,
            reader,
        })
    }

    pub fn wallet(&self) -> &Arc<dyn WalletSession> {
        &self.wallet
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RoutingError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or(body);
            return Err(RoutingError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| RoutingError::InvalidResponse(e.to_string()))
    }

    /// Fetches a fresh transaction for a route step that has none.
    async fn step_transaction(&self, step: &RouteStep) -> Result<RouteStep, RoutingError> {
        let mut body = step.clone();
        body.execution = None;
        let response = self
            .client
            .post(self.url("advanced/stepTransaction"))
            .json(&body)
            .send()
            .await
            .map_err(|e| RoutingError::Connection(e.to_string()))?;
        Self::decode(response).await
    }

    async fn transfer_status(
        &self,
        step: &RouteStep,
        tx_hash: &str,
    ) -> Result<TransferStatus, RoutingError> {
        let from_chain = step.action.from_chain_id.to_string();
        let to_chain = step.action.to_chain_id.to_string();
        let response = self
            .client
            .get(self.url("status"))
            .query(&[
                ("txHash", tx_hash),
                ("bridge", step.tool.as_str()),
                ("fromChain", from_chain.as_str()),
                ("toChain", to_chain.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RoutingError::Connection(e.to_string()))?;
        Self::decode(response).await
    }

    /// Polls until the transfer is `DONE` or `FAILED`.
    async fn wait_for_transfer(
        &self,
        step: &RouteStep,
        tx_hash: &str,
    ) -> Result<TransferStatus, RoutingError> {
        for attempt in 1..=self.config.status_max_polls {
            let status = self.transfer_status(step, tx_hash).await?;
            match status.status.as_str() {
                "DONE" => return Ok(status),
                "FAILED" => {
                    return Err(RoutingError::StepFailed {
                        step_id: step.id.clone(),
                        message: status
                            .substatus_message
                            .unwrap_or_else(|| "Transfer failed".to_string()),
                    })
                }
                other => debug!(
                    "Transfer {} is {} (poll {}/{})",
                    tx_hash, other, attempt, self.config.status_max_polls
                ),
            }
            tokio::time::sleep(self.config.status_poll_interval).await;
        }
        Err(RoutingError::StepFailed {
            step_id: step.id.clone(),
            message: format!("Transfer {} did not settle", tx_hash),
        })
    }

    /// Approves the step's approval address for exactly the source amount
    /// when the current allowance is short. Returns the approval hash if one
    /// was sent. Native sources and steps without an approval address need
    /// nothing.
    async fn ensure_allowance(&self, step: &RouteStep) -> Result<Option<String>, RoutingError> {
        let Some(spender) = step.estimate.approval_address.as_deref() else {
            return Ok(None);
        };
        let token = parse_address(&step.action.from_token.address)?;
        if is_native_token(&token) {
            return Ok(None);
        }
        let spender = parse_address(spender)?;
        let chain_id = step.action.from_chain_id;
        let chain = Chain::from_id(chain_id)
            .ok_or_else(|| WalletError::UnsupportedChain(format!("chain #{}", chain_id)))?;
        let owner = self.wallet.account().ok_or(WalletError::NoAccount)?;
        let required = parse_base_units(&step.action.from_amount).ok_or_else(|| {
            RoutingError::InvalidResponse(format!(
                "Invalid fromAmount {:?} in step {}",
                step.action.from_amount, step.id
            ))
        })?;

        let allowance = self.reader.allowance(chain, token, owner, spender).await?;
        if allowance >= required {
            debug!(
                "Allowance {} covers {} for step {}",
                allowance, required, step.id
            );
            return Ok(None);
        }

        let hash = self
            .wallet
            .write_contract(ContractWrite::erc20_approve(chain_id, token, spender, required))
            .await?;
        info!(
            "Approved {} of {} for {} ahead of step {}: {}",
            required, token, spender, step.id, hash
        );
        Ok(Some(hash))
    }

    async fn execute_route_step(
        &self,
        route: &mut Route,
        index: usize,
        hooks: &mut dyn RouteExecutionHooks,
    ) -> Result<(), RoutingError> {
        let from_chain = route.steps[index].action.from_chain_id;
        hooks.switch_chain(from_chain).await?;

        route.steps[index].execution = Some(StepExecution {
            status: ExecutionStatus::Pending,
            process: Vec::new(),
            from_amount: None,
            to_amount: None,
            to_token: None,
        });
        hooks.update_route(route);

        if route.steps[index].transaction_request.is_none() {
            let previous_min = min_amount(&route.steps[index]);
            let mut refreshed = self.step_transaction(&route.steps[index]).await?;
            let new_min = min_amount(&refreshed);
            if new_min < previous_min {
                info!(
                    "Exchange rate changed for step {}: {} -> {}",
                    refreshed.id, previous_min, new_min
                );
                if !hooks.accept_exchange_rate_update(previous_min, new_min).await {
                    return Err(RoutingError::ExchangeRateUpdateRejected);
                }
            }
            refreshed.execution = route.steps[index].execution.take();
            route.steps[index] = refreshed;
        }

        if let Some(approval_hash) = self.ensure_allowance(&route.steps[index]).await? {
            if let Some(execution) = route.steps[index].execution.as_mut() {
                execution.process.push(Process {
                    kind: "TOKEN_ALLOWANCE".to_string(),
                    status: ExecutionStatus::Done,
                    tx_hash: Some(approval_hash),
                    tx_link: None,
                    message: Some("Token allowance set".to_string()),
                });
            }
            hooks.update_route(route);
        }

        let step = &route.steps[index];
        let tx = step
            .transaction_request
            .clone()
            .ok_or_else(|| RoutingError::MissingTransactionRequest(step.id.clone()))?;
        let kind = if step.action.from_chain_id != step.action.to_chain_id {
            "CROSS_CHAIN"
        } else {
            "SWAP"
        };

        let tx_hash = self.wallet.send_transaction(tx).await?;
        info!("Submitted {} transaction {} for step {}", kind, tx_hash, step.id);

        if let Some(execution) = route.steps[index].execution.as_mut() {
            execution.process.push(Process {
                kind: kind.to_string(),
                status: ExecutionStatus::Pending,
                tx_hash: Some(tx_hash.clone()),
                tx_link: None,
                message: Some("Transaction submitted".to_string()),
            });
        }
        hooks.update_route(route);

        let status = self.wait_for_transfer(&route.steps[index], &tx_hash).await?;

        let step = &mut route.steps[index];
        let received = status.receiving.unwrap_or_default();
        let to_amount = received
            .amount
            .unwrap_or_else(|| step.estimate.to_amount.clone());
        let to_token = received
            .token
            .unwrap_or_else(|| step.action.to_token.clone());
        let from_amount = step.action.from_amount.clone();
        if let Some(execution) = step.execution.as_mut() {
            execution.status = ExecutionStatus::Done;
            execution.from_amount = Some(from_amount);
            execution.to_amount = Some(to_amount);
            execution.to_token = Some(to_token);
            if let Some(process) = execution.process.last_mut() {
                process.status = ExecutionStatus::Done;
                process.message = Some("Transaction confirmed".to_string());
                if kind == "CROSS_CHAIN" {
                    if let Some(receiving_hash) = received.tx_hash {
                        process.tx_hash = Some(receiving_hash);
                    }
                }
            }
        }
        hooks.update_route(route);
        Ok(())
    }
}

fn parse_address(value: &str) -> Result<Address, RoutingError> {
    value
        .parse()
        .map_err(|_| RoutingError::InvalidResponse(format!("Invalid address {:?}", value)))
}

fn min_amount(step: &RouteStep) -> U256 {
    parse_base_units(&step.estimate.to_amount_min).unwrap_or(U256::ZERO)
}

#[async_trait]
impl RoutingClient for LifiClient {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError> {
        debug!(
            "Requesting quote {} -> {} for {}",
            request.from_chain, request.to_chain, request.from_amount
        );
        let response = self
            .client
            .get(self.url("quote"))
            .query(&request.query_pairs(&self.config.integrator))
            .send()
            .await
            .map_err(|e| RoutingError::Connection(e.to_string()))?;
        Self::decode(response).await
    }

    async fn execute_route(
        &self,
        mut route: Route,
        hooks: &mut dyn RouteExecutionHooks,
    ) -> Result<Route, RoutingError> {
        for index in 0..route.steps.len() {
            if let Err(e) = self.execute_route_step(&mut route, index, hooks).await {
                warn!("Route {} failed at step {}: {}", route.id, index, e);
                if let Some(execution) = route.steps[index].execution.as_mut() {
                    execution.status = ExecutionStatus::Failed;
                    if let Some(process) = execution.process.last_mut() {
                        process.status = ExecutionStatus::Failed;
                        process.message = Some(e.to_string());
                    }
                }
                hooks.update_route(&route);
                return Err(e);
            }
        }
        Ok(route)
    }
}
