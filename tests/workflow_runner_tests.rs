//! End-to-end runs of the workflow runner over fake wallet capabilities.

mod common;

use alloy_primitives::U256;
use common::*;
use defi_hub::adapters::{
    create_route_workflow_steps, create_token_approval_step, ExecutorBindings, RouteParams,
    TokenApprovalParams, EXECUTE_STEP_ID, QUOTE_STEP_ID, REJECTED_MESSAGE,
    REJECTED_TX_PLACEHOLDER,
};
use defi_hub::chain::Chain;
use defi_hub::routing::RoutingError;
use defi_hub::wallet::{TokenDecimalsCache, WalletError};
use defi_hub::workflow::{
    StepAction, StepStatus, WorkflowError, WorkflowEvent, WorkflowOutcome, WorkflowRunner,
    WorkflowStep,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Harness {
    wallet: Arc<FakeWallet>,
    reader: Arc<FakeChainReader>,
    router: Arc<FakeRoutingClient>,
    bindings: ExecutorBindings,
    decimals: TokenDecimalsCache,
}

fn harness(allowance: U256) -> Harness {
    let wallet = Arc::new(FakeWallet::connected(ACCOUNT, ETHEREUM_ID));
    let reader = Arc::new(FakeChainReader::new(allowance, 6));
    let router = Arc::new(FakeRoutingClient::new());
    let bindings = ExecutorBindings::new(wallet.clone(), reader.clone(), router.clone());
    let decimals = TokenDecimalsCache::new(reader.clone());
    Harness {
        wallet,
        reader,
        router,
        bindings,
        decimals,
    }
}

async fn usdc_to_usds_steps(h: &Harness) -> Vec<WorkflowStep> {
    let approval = create_token_approval_step(
        TokenApprovalParams {
            chain: Chain::Arbitrum,
            token_address: USDC_ARBITRUM,
            spender_address: LIFI_DIAMOND,
            amount: "25".to_string(),
            token_symbol: Some("USDC".to_string()),
            label: None,
            description: None,
            success_message: None,
        },
        &h.decimals,
    )
    .await
    .unwrap()
    .expect("ERC-20 token needs an approval step");

    let route = create_route_workflow_steps(
        RouteParams {
            source_chain: Chain::Arbitrum,
            source_token_address: USDC_ARBITRUM,
            from_amount: "25".to_string(),
            destination_chain: Chain::Ethereum,
            destination_token_address: USDS_ETHEREUM,
            slippage: 0.003,
        },
        &h.decimals,
    )
    .await
    .unwrap();

    let stake = WorkflowStep::new("stake-usds", "Stake USDS", StepAction::Stake)
        .with_chains(Chain::Ethereum, Chain::Ethereum)
        .with_tokens("USDS", "sUSDS");

    let mut steps = vec![approval];
    steps.extend(route);
    steps.push(stake);
    h.bindings.bind(steps)
}

fn plain_steps() -> Vec<WorkflowStep> {
    vec![
        WorkflowStep::new("bridge", "Bridge USDT to Arbitrum", StepAction::Bridge),
        WorkflowStep::new("swap", "Swap to USDS", StepAction::Swap),
        WorkflowStep::new("stake", "Stake USDS", StepAction::Stake),
    ]
}

#[tokio::test]
async fn test_approve_route_and_stake_run_to_completion() {
    let h = harness(U256::ZERO);
    let steps = usdc_to_usds_steps(&h).await;
    let approval_id = steps[0].id.clone();
    let runner = WorkflowRunner::new(steps);
    let provider = RecordingProvider::new();

    let outcome = runner.run(&provider).await.unwrap();
    assert_eq!(outcome, WorkflowOutcome::Completed);

    // Only the step without an executor reaches the provider.
    assert_eq!(provider.executed(), vec!["stake-usds".to_string()]);

    // One exact-amount approval on Arbitrum, after a single chain switch.
    assert_eq!(*h.wallet.switches.lock().unwrap(), vec![ARBITRUM_ID]);
    let writes = h.wallet.writes.lock().unwrap().clone();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].function_name, "approve");
    assert_eq!(writes[0].chain_id, ARBITRUM_ID);
    assert_eq!(writes[0].args[1], serde_json::json!("25000000"));

    let requests = h.router.quote_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].from_chain, ARBITRUM_ID);
    assert_eq!(requests[0].to_chain, ETHEREUM_ID);
    assert_eq!(requests[0].from_amount, "25000000");
    assert_eq!(requests[0].from_address, ACCOUNT.to_string());
    assert_eq!(h.router.execute_count(), 1);

    // Decimals were read once and reused by the route builder.
    assert_eq!(h.reader.decimals_calls.load(Ordering::SeqCst), 1);

    let snapshot = runner.snapshot();
    assert_eq!(snapshot.completed, 4);
    assert_eq!(snapshot.progress, 100);
    assert!(!snapshot.is_executing);
    assert!(snapshot.error.is_none());

    let approval = snapshot.state_of(&approval_id).unwrap();
    assert_eq!(approval.status, StepStatus::Success);
    assert!(approval.tx_hash.is_some());

    let quote = snapshot.state_of(QUOTE_STEP_ID).unwrap();
    assert_eq!(quote.tx_hash, None);
    assert_eq!(
        quote.message.as_deref(),
        Some("Quote prepared via Stargate: ~24.825300 USDS")
    );

    let execute = snapshot.state_of(EXECUTE_STEP_ID).unwrap();
    assert_eq!(execute.tx_hash.as_deref(), Some(ROUTE_TX_HASH));
    assert_eq!(
        execute.message.as_deref(),
        Some("Route executed. Received ~24.900000 USDS.")
    );
    assert_eq!(snapshot.log.last().map(String::as_str), Some("Workflow completed"));
}

#[tokio::test]
async fn test_sufficient_allowance_skips_approval_write() {
    let h = harness(U256::from(1_000_000_000u64));
    let steps = usdc_to_usds_steps(&h).await;
    let approval_id = steps[0].id.clone();
    let runner = WorkflowRunner::new(steps);

    runner.run(&RecordingProvider::new()).await.unwrap();

    assert_eq!(h.wallet.write_count(), 0);
    let approval = runner.step_state(&approval_id).unwrap();
    assert_eq!(approval.status, StepStatus::Success);
    assert_eq!(approval.tx_hash, None);
    assert_eq!(
        approval.message.as_deref(),
        Some("Allowance already sufficient.")
    );
    // The route still needs the wallet on the source chain.
    assert_eq!(*h.wallet.switches.lock().unwrap(), vec![ARBITRUM_ID]);
}

#[tokio::test]
async fn test_rejected_route_signature_continues_workflow() {
    let h = harness(U256::MAX);
    h.router
        .fail_execution_with(RoutingError::Wallet(WalletError::UserRejectedSignature));
    let runner = WorkflowRunner::new(usdc_to_usds_steps(&h).await);
    let provider = RecordingProvider::new();

    let outcome = runner.run(&provider).await.unwrap();

    assert_eq!(outcome, WorkflowOutcome::Completed);
    let execute = runner.step_state(EXECUTE_STEP_ID).unwrap();
    assert_eq!(execute.status, StepStatus::Success);
    assert_eq!(execute.tx_hash.as_deref(), Some(REJECTED_TX_PLACEHOLDER));
    assert_eq!(execute.message.as_deref(), Some(REJECTED_MESSAGE));
    assert_eq!(provider.executed(), vec!["stake-usds".to_string()]);
}

#[tokio::test]
async fn test_routing_failure_stops_before_stake() {
    let h = harness(U256::MAX);
    h.router.fail_execution_with(RoutingError::Api {
        status: 500,
        message: "Internal error".to_string(),
    });
    let runner = WorkflowRunner::new(usdc_to_usds_steps(&h).await);
    let provider = RecordingProvider::new();

    let outcome = runner.run(&provider).await.unwrap();

    assert_eq!(
        outcome,
        WorkflowOutcome::Failed {
            step_id: EXECUTE_STEP_ID.to_string(),
            message: "Routing API error (500): Internal error".to_string(),
        }
    );
    assert!(provider.executed().is_empty());
    assert_eq!(
        runner.step_state("stake-usds").unwrap().status,
        StepStatus::Idle
    );
    assert_eq!(
        runner.snapshot().error.as_deref(),
        Some("Stopped at Execute Swap & Bridge: Routing API error (500): Internal error")
    );
}

#[tokio::test]
async fn test_provider_failure_reports_step_label() {
    let runner = WorkflowRunner::new(plain_steps());
    let provider = RecordingProvider::failing_at("swap", "RPC timeout");

    let outcome = runner.run(&provider).await.unwrap();

    assert_eq!(
        outcome,
        WorkflowOutcome::Failed {
            step_id: "swap".to_string(),
            message: "RPC timeout".to_string(),
        }
    );
    assert_eq!(
        provider.executed(),
        vec!["bridge".to_string(), "swap".to_string()]
    );

    let snapshot = runner.snapshot();
    assert_eq!(snapshot.status_of("bridge"), Some(StepStatus::Success));
    assert_eq!(snapshot.status_of("swap"), Some(StepStatus::Error));
    assert_eq!(
        snapshot.state_of("swap").unwrap().error.as_deref(),
        Some("RPC timeout")
    );
    assert_eq!(snapshot.status_of("stake"), Some(StepStatus::Idle));
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Stopped at Swap to USDS: RPC timeout")
    );
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.progress, 33);
    assert!(!snapshot.is_executing);
    assert!(snapshot.active_step_id.is_none());
}

#[tokio::test]
async fn test_events_follow_execution_order() {
    let runner = WorkflowRunner::new(plain_steps());
    let mut events = runner.subscribe();
    let provider = RecordingProvider::failing_at("swap", "RPC timeout");

    runner.run(&provider).await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            WorkflowEvent::RunStarted,
            WorkflowEvent::StepStarted {
                step_id: "bridge".to_string()
            },
            WorkflowEvent::StepSucceeded {
                step_id: "bridge".to_string(),
                tx_hash: Some("0xbridge".to_string()),
                message: Some("Bridge USDT to Arbitrum done".to_string()),
            },
            WorkflowEvent::StepStarted {
                step_id: "swap".to_string()
            },
            WorkflowEvent::StepFailed {
                step_id: "swap".to_string(),
                error: "RPC timeout".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_rerun_after_failure_starts_from_first_step() {
    let runner = WorkflowRunner::new(plain_steps());
    runner
        .run(&RecordingProvider::failing_at("stake", "Out of gas"))
        .await
        .unwrap();
    assert!(runner.snapshot().error.is_some());

    let provider = RecordingProvider::new();
    let outcome = runner.run(&provider).await.unwrap();

    assert_eq!(outcome, WorkflowOutcome::Completed);
    assert_eq!(provider.executed().len(), 3);
    let snapshot = runner.snapshot();
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.progress, 100);
}

#[tokio::test]
async fn test_on_complete_fires_only_for_successful_runs() {
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = completions.clone();
    let runner = WorkflowRunner::new(plain_steps()).with_on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    runner
        .run(&RecordingProvider::failing_at("bridge", "nope"))
        .await
        .unwrap();
    assert_eq!(completions.load(Ordering::SeqCst), 0);

    runner.run(&RecordingProvider::new()).await.unwrap();
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_changing_steps_resets_state() {
    let runner = WorkflowRunner::new(plain_steps());
    let mut events = runner.subscribe();
    runner.run(&RecordingProvider::new()).await.unwrap();
    assert_eq!(runner.completed_count(), 3);

    let mut changed = plain_steps();
    changed[1] = WorkflowStep::new("swap", "Swap to DAI", StepAction::Swap);
    assert!(runner.set_steps(changed));

    let snapshot = runner.snapshot();
    assert_eq!(snapshot.completed, 0);
    assert!(snapshot.log.is_empty());
    assert!(snapshot
        .steps
        .iter()
        .all(|s| s.state.status == StepStatus::Idle));
    assert_eq!(snapshot.steps[1].label, "Swap to DAI");

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(WorkflowEvent::StepsChanged));
}

#[tokio::test]
async fn test_reset_returns_every_step_to_idle() {
    let runner = WorkflowRunner::new(plain_steps());
    runner
        .run(&RecordingProvider::failing_at("swap", "RPC timeout"))
        .await
        .unwrap();

    runner.reset();

    let snapshot = runner.snapshot();
    assert!(snapshot
        .steps
        .iter()
        .all(|s| s.state == Default::default()));
    assert!(snapshot.error.is_none());
    assert!(snapshot.log.is_empty());
    assert_eq!(snapshot.progress, 0);
}

#[tokio::test]
async fn test_empty_workflow_is_refused() {
    let runner = WorkflowRunner::new(Vec::new());
    let err = runner.run(&RecordingProvider::new()).await.unwrap_err();
    assert_eq!(err, WorkflowError::NoSteps);
}
