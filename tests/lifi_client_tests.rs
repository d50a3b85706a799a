//! LI.FI client against a local mock of the routing API.

mod common;

use alloy_primitives::U256;
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::*;
use defi_hub::routing::{
    ExecutionStatus, LifiClient, LifiConfig, QuoteRequest, Route, RouteExecutionHooks,
    RoutingClient, RoutingError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecordingHooks {
    switches: Vec<u64>,
    updates: Vec<Route>,
    accept_rate_updates: bool,
    rate_updates: Vec<(U256, U256)>,
}

#[async_trait]
impl RouteExecutionHooks for RecordingHooks {
    async fn switch_chain(&mut self, chain_id: u64) -> Result<(), RoutingError> {
        self.switches.push(chain_id);
        Ok(())
    }

    fn update_route(&mut self, route: &Route) {
        self.updates.push(route.clone());
    }

    async fn accept_exchange_rate_update(&mut self, previous_min: U256, new_min: U256) -> bool {
        self.rate_updates.push((previous_min, new_min));
        self.accept_rate_updates
    }
}

fn client_for(server: &MockApiServer, wallet: Arc<FakeWallet>) -> LifiClient {
    client_with_reader(server, wallet, Arc::new(FakeChainReader::new(U256::MAX, 6)))
}

fn client_with_reader(
    server: &MockApiServer,
    wallet: Arc<FakeWallet>,
    reader: Arc<FakeChainReader>,
) -> LifiClient {
    LifiClient::new(
        LifiConfig {
            api_base: server.base_url.clone(),
            integrator: "test-suite".to_string(),
            timeout_sec: 5,
            status_poll_interval: Duration::from_millis(10),
            status_max_polls: 5,
        },
        wallet,
        reader,
    )
    .unwrap()
}

fn quote_request() -> QuoteRequest {
    QuoteRequest {
        from_chain: ARBITRUM_ID,
        to_chain: ETHEREUM_ID,
        from_token: USDC_ARBITRUM.to_string(),
        to_token: USDS_ETHEREUM.to_string(),
        from_address: ACCOUNT.to_string(),
        to_address: ACCOUNT.to_string(),
        from_amount: "25000000".to_string(),
        slippage: 0.003,
    }
}

async fn quote_handler(
    Query(params): Query<HashMap<String, String>>,
) -> Result<([(&'static str, &'static str); 1], &'static str), (StatusCode, &'static str)> {
    if params.get("integrator").map(String::as_str) != Some("test-suite")
        || params.get("fromAmount").map(String::as_str) != Some("25000000")
    {
        return Err((
            StatusCode::BAD_REQUEST,
            r#"{ "message": "Invalid quote parameters", "code": 1011 }"#,
        ));
    }
    Ok(([("content-type", "application/json")], QUOTE_JSON))
}

/// `PENDING` for the first poll, `DONE` afterwards.
async fn status_handler(State(polls): State<Arc<AtomicUsize>>) -> Json<serde_json::Value> {
    if polls.fetch_add(1, Ordering::SeqCst) == 0 {
        Json(serde_json::json!({ "status": "PENDING" }))
    } else {
        Json(serde_json::json!({
            "status": "DONE",
            "receiving": {
                "txHash": "0xdestination",
                "amount": "24950000000000000000"
            }
        }))
    }
}

fn routing_api(polls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/quote", get(quote_handler))
        .route("/status", get(status_handler))
        .with_state(polls)
}

#[tokio::test]
async fn test_get_quote_sends_integrator() {
    let server = MockApiServer::spawn(routing_api(Arc::default())).await;
    let client = client_for(&server, Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID)));

    let quote = client.get_quote(&quote_request()).await.unwrap();

    assert_eq!(quote.id, "quote-1");
    assert_eq!(quote.tool_name(), "Stargate");
    assert!(quote.transaction_request.is_some());
}

#[tokio::test]
async fn test_get_quote_surfaces_api_message() {
    let server = MockApiServer::spawn(routing_api(Arc::default())).await;
    let client = client_for(&server, Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID)));
    let mut request = quote_request();
    request.from_amount = "0".to_string();

    let err = client.get_quote(&request).await.unwrap_err();

    assert_eq!(
        err,
        RoutingError::Api {
            status: 400,
            message: "Invalid quote parameters".to_string(),
        }
    );
}

#[tokio::test]
async fn test_execute_route_submits_and_waits_for_transfer() {
    let polls = Arc::new(AtomicUsize::new(0));
    let server = MockApiServer::spawn(routing_api(polls.clone())).await;
    let wallet = Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID));
    let client = client_for(&server, wallet.clone());
    let mut hooks = RecordingHooks::default();

    let route = client
        .execute_route(sample_quote().into_route(), &mut hooks)
        .await
        .unwrap();

    assert_eq!(hooks.switches, vec![ARBITRUM_ID]);
    assert_eq!(wallet.sent.lock().unwrap().len(), 1);
    assert_eq!(polls.load(Ordering::SeqCst), 2);

    let execution = route.steps[0].execution.as_ref().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Done);
    assert_eq!(execution.to_amount.as_deref(), Some("24950000000000000000"));
    let process = route.last_process().unwrap();
    assert_eq!(process.kind, "CROSS_CHAIN");
    assert_eq!(process.tx_hash.as_deref(), Some("0xdestination"));

    // Pending, submitted, confirmed.
    assert_eq!(hooks.updates.len(), 3);
    assert_eq!(hooks.updates.last(), Some(&route));
}

#[tokio::test]
async fn test_rejected_signature_marks_step_failed() {
    let server = MockApiServer::spawn(routing_api(Arc::default())).await;
    let wallet = Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID));
    wallet.fail_writes_with(defi_hub::wallet::WalletError::UserRejectedSignature);
    let client = client_for(&server, wallet);
    let mut hooks = RecordingHooks::default();

    let err = client
        .execute_route(sample_quote().into_route(), &mut hooks)
        .await
        .unwrap_err();

    assert!(err.is_user_rejected());
    let last = hooks.updates.last().unwrap();
    assert_eq!(
        last.steps[0].execution.as_ref().unwrap().status,
        ExecutionStatus::Failed
    );
}

#[tokio::test]
async fn test_worse_refreshed_rate_can_be_declined() {
    let app = Router::new().route(
        "/advanced/stepTransaction",
        post(|Json(mut step): Json<serde_json::Value>| async move {
            step["estimate"]["toAmountMin"] = serde_json::json!("24000000000000000000");
            step["transactionRequest"] = serde_json::json!({
                "to": "0x1111111111111111111111111111111111111111",
                "data": "0xbeef",
                "chainId": 42161
            });
            Json(step)
        }),
    );
    let server = MockApiServer::spawn(app).await;
    let wallet = Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID));
    let client = client_for(&server, wallet.clone());
    let mut route = sample_quote().into_route();
    route.steps[0].transaction_request = None;
    let mut hooks = RecordingHooks::default();

    let err = client.execute_route(route, &mut hooks).await.unwrap_err();

    assert_eq!(err, RoutingError::ExchangeRateUpdateRejected);
    assert_eq!(
        hooks.rate_updates,
        vec![(
            U256::from(24_825_300_000_000_000_000u128),
            U256::from(24_000_000_000_000_000_000u128)
        )]
    );
    assert!(wallet.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_short_allowance_is_approved_before_submission() {
    let server = MockApiServer::spawn(routing_api(Arc::default())).await;
    let wallet = Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID));
    let reader = Arc::new(FakeChainReader::new(U256::from(1_000_000u64), 6));
    let client = client_with_reader(&server, wallet.clone(), reader.clone());
    let mut hooks = RecordingHooks::default();

    let route = client
        .execute_route(sample_quote().into_route(), &mut hooks)
        .await
        .unwrap();

    assert_eq!(
        *wallet.calls.lock().unwrap(),
        vec!["write_contract", "send_transaction"]
    );
    let writes = wallet.writes.lock().unwrap();
    assert_eq!(writes[0].function_name, "approve");
    assert_eq!(writes[0].chain_id, ARBITRUM_ID);
    assert_eq!(writes[0].address, USDC_ARBITRUM);
    assert_eq!(
        writes[0].args,
        vec![
            serde_json::json!(LIFI_DIAMOND.to_string()),
            serde_json::json!("25000000")
        ]
    );
    assert_eq!(reader.allowance_calls.load(Ordering::SeqCst), 1);

    let kinds: Vec<&str> = route.steps[0]
        .execution
        .as_ref()
        .unwrap()
        .process
        .iter()
        .map(|p| p.kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["TOKEN_ALLOWANCE", "CROSS_CHAIN"]);
    // Pending, allowance, submitted, confirmed.
    assert_eq!(hooks.updates.len(), 4);
}

#[tokio::test]
async fn test_sufficient_allowance_sends_no_approval() {
    let server = MockApiServer::spawn(routing_api(Arc::default())).await;
    let wallet = Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID));
    let reader = Arc::new(FakeChainReader::new(U256::from(25_000_000u64), 6));
    let client = client_with_reader(&server, wallet.clone(), reader.clone());
    let mut hooks = RecordingHooks::default();

    client
        .execute_route(sample_quote().into_route(), &mut hooks)
        .await
        .unwrap();

    assert_eq!(reader.allowance_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*wallet.calls.lock().unwrap(), vec!["send_transaction"]);
}

#[tokio::test]
async fn test_native_source_skips_allowance_check() {
    let server = MockApiServer::spawn(routing_api(Arc::default())).await;
    let wallet = Arc::new(FakeWallet::connected(ACCOUNT, ARBITRUM_ID));
    let reader = Arc::new(FakeChainReader::new(U256::ZERO, 18));
    let client = client_with_reader(&server, wallet.clone(), reader.clone());
    let mut route = sample_quote().into_route();
    route.steps[0].action.from_token.address =
        "0x0000000000000000000000000000000000000000".to_string();
    let mut hooks = RecordingHooks::default();

    client.execute_route(route, &mut hooks).await.unwrap();

    assert_eq!(reader.allowance_calls.load(Ordering::SeqCst), 0);
    assert_eq!(wallet.write_count(), 0);
    assert_eq!(wallet.sent.lock().unwrap().len(), 1);
}
