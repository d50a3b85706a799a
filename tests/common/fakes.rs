//! In-memory wallet, chain reader, router and execution provider.

use super::fixtures::{sample_quote, ROUTE_TX_HASH};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use defi_hub::chain::Chain;
use defi_hub::routing::{
    ExecutionStatus, Process, Quote, QuoteRequest, Route, RouteExecutionHooks, RoutingClient,
    RoutingError, StepExecution,
};
use defi_hub::wallet::{ChainReader, ContractWrite, TransactionRequest, WalletError, WalletSession};
use defi_hub::workflow::{ExecutionProvider, StepError, WorkflowStep, WorkflowStepResult};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Wallet session that records every call and signs instantly.
pub struct FakeWallet {
    account: Option<Address>,
    chain_id: AtomicU64,
    pub switches: Mutex<Vec<u64>>,
    pub writes: Mutex<Vec<ContractWrite>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    /// Signing calls in the order they reached the wallet.
    pub calls: Mutex<Vec<&'static str>>,
    write_error: Mutex<Option<WalletError>>,
    next_nonce: AtomicUsize,
}

impl FakeWallet {
    pub fn connected(account: Address, chain_id: u64) -> Self {
        Self {
            account: Some(account),
            chain_id: AtomicU64::new(chain_id),
            switches: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            write_error: Mutex::new(None),
            next_nonce: AtomicUsize::new(1),
        }
    }

    pub fn without_account() -> Self {
        Self {
            account: None,
            ..Self::connected(Address::ZERO, 1)
        }
    }

    /// Every subsequent write and send fails with `error`.
    pub fn fail_writes_with(&self, error: WalletError) {
        *self.write_error.lock().unwrap() = Some(error);
    }

    pub fn current_chain(&self) -> u64 {
        self.chain_id.load(Ordering::SeqCst)
    }

    pub fn switch_count(&self) -> usize {
        self.switches.lock().unwrap().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn next_hash(&self) -> String {
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        format!("0x{:064x}", nonce)
    }
}

#[async_trait]
impl WalletSession for FakeWallet {
    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.switches.lock().unwrap().push(chain_id);
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    async fn write_contract(&self, call: ContractWrite) -> Result<String, WalletError> {
        if let Some(error) = self.write_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.calls.lock().unwrap().push("write_contract");
        self.writes.lock().unwrap().push(call);
        Ok(self.next_hash())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<String, WalletError> {
        if let Some(error) = self.write_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.calls.lock().unwrap().push("send_transaction");
        self.sent.lock().unwrap().push(tx);
        Ok(self.next_hash())
    }
}

/// Chain reader answering every token with the same allowance and decimals.
pub struct FakeChainReader {
    allowance: Mutex<U256>,
    decimals: u8,
    pub allowance_calls: AtomicUsize,
    pub decimals_calls: AtomicUsize,
}

impl FakeChainReader {
    pub fn new(allowance: U256, decimals: u8) -> Self {
        Self {
            allowance: Mutex::new(allowance),
            decimals,
            allowance_calls: AtomicUsize::new(0),
            decimals_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_allowance(&self, allowance: U256) {
        *self.allowance.lock().unwrap() = allowance;
    }
}

#[async_trait]
impl ChainReader for FakeChainReader {
    async fn allowance(
        &self,
        _chain: Chain,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, WalletError> {
        self.allowance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.allowance.lock().unwrap())
    }

    async fn decimals(&self, _chain: Chain, _token: Address) -> Result<u8, WalletError> {
        self.decimals_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.decimals)
    }
}

/// Router returning a fixed quote and completing every route in one go.
pub struct FakeRoutingClient {
    quote: Quote,
    pub quote_requests: Mutex<Vec<QuoteRequest>>,
    pub execute_calls: AtomicUsize,
    execute_error: Mutex<Option<RoutingError>>,
}

impl FakeRoutingClient {
    pub fn new() -> Self {
        Self {
            quote: sample_quote(),
            quote_requests: Mutex::new(Vec::new()),
            execute_calls: AtomicUsize::new(0),
            execute_error: Mutex::new(None),
        }
    }

    pub fn fail_execution_with(&self, error: RoutingError) {
        *self.execute_error.lock().unwrap() = Some(error);
    }

    pub fn quote_count(&self) -> usize {
        self.quote_requests.lock().unwrap().len()
    }

    pub fn execute_count(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingClient for FakeRoutingClient {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError> {
        self.quote_requests.lock().unwrap().push(request.clone());
        Ok(self.quote.clone())
    }

    async fn execute_route(
        &self,
        mut route: Route,
        hooks: &mut dyn RouteExecutionHooks,
    ) -> Result<Route, RoutingError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(chain_id) = route.first_chain_id() {
            hooks.switch_chain(chain_id).await?;
        }
        if let Some(error) = self.execute_error.lock().unwrap().clone() {
            return Err(error);
        }

        let to_token = route.to_token.clone();
        let to_amount = route.to_amount.clone();
        if let Some(step) = route.steps.last_mut() {
            step.execution = Some(StepExecution {
                status: ExecutionStatus::Done,
                process: vec![Process {
                    kind: "CROSS_CHAIN".to_string(),
                    status: ExecutionStatus::Done,
                    tx_hash: Some(ROUTE_TX_HASH.to_string()),
                    tx_link: None,
                    message: None,
                }],
                from_amount: None,
                to_amount: Some(to_amount),
                to_token: Some(to_token),
            });
        }
        hooks.update_route(&route);
        Ok(route)
    }
}

/// Provider that records the steps it executes and can fail a chosen one.
pub struct RecordingProvider {
    pub executed: Mutex<Vec<String>>,
    fail_step: Option<(String, String)>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail_step: None,
        }
    }

    pub fn failing_at(step_id: &str, message: &str) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail_step: Some((step_id.to_string(), message.to_string())),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn execute_step(&self, step: &WorkflowStep) -> Result<WorkflowStepResult, StepError> {
        self.executed.lock().unwrap().push(step.id.clone());
        match &self.fail_step {
            Some((id, message)) if *id == step.id => Err(StepError::failed(message.clone())),
            _ => Ok(WorkflowStepResult::with_hash(
                format!("0x{}", step.id),
                format!("{} done", step.label),
            )),
        }
    }
}
