use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::{Parser, Subcommand};
use defi_hub::adapters::{create_route_workflow_steps, ExecutorBindings, RouteParams};
use defi_hub::chain::Chain;
use defi_hub::cli_style::{cell, get_styles, workflow_progress_style};
use defi_hub::config::{AppConfig, CliConfig, FileConfig};
use defi_hub::portfolio_store::{
    NewTransaction, PortfolioStore, SqlitePortfolioStore, TransactionStatus,
};
use defi_hub::routing::LifiClient;
use defi_hub::wallet::{
    ContractWrite, JsonRpcChainReader, TokenDecimalsCache, TransactionRequest, WalletError,
    WalletSession,
};
use defi_hub::workflow::{
    ExecutionProvider, MockExecutionProvider, StepAction, StepError, StepExecutor, StepStatus,
    WorkflowContext, WorkflowEvent, WorkflowOutcome, WorkflowRunner, WorkflowStep,
    WorkflowStepResult,
};
use defi_hub::yields::{
    format_tvl, load_strategies, Rating, StrategyFilter, YieldsClient, DEFAULT_STRATEGY_LIMIT,
};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(
    name = "defi-hub",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    styles = get_styles()
)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite portfolio database.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Timeout in seconds for HTTP requests.
    #[clap(long, global = true, default_value_t = 30)]
    pub http_timeout_sec: u64,

    /// Default route slippage as a fraction, e.g. 0.005.
    #[clap(long, global = true)]
    pub slippage: Option<f64>,

    /// Simulated latency of the mock execution provider.
    #[clap(long, global = true)]
    pub mock_latency_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists yield strategies, optionally filtered.
    Strategies {
        /// Only keep pools on this chain. Repeatable.
        #[clap(long = "chain")]
        chains: Vec<String>,

        /// Only keep stablecoin pools.
        #[clap(long)]
        stablecoins: bool,

        /// Case-insensitive match on name or protocol.
        #[clap(long, default_value = "")]
        search: String,

        /// Number of pools to load.
        #[clap(long, default_value_t = DEFAULT_STRATEGY_LIMIT)]
        limit: usize,

        /// Use the curated scores endpoint instead of the full pool list.
        #[clap(long)]
        top: bool,
    },

    /// Shows the APY history of a pool.
    PoolHistory {
        pool_id: String,

        /// Number of most recent points to show.
        #[clap(long, default_value_t = 14)]
        last: usize,
    },

    /// Fetches a route quote for a swap or bridge without signing anything.
    Quote {
        #[clap(long)]
        from_chain: String,

        #[clap(long)]
        from_token: Address,

        #[clap(long)]
        to_chain: String,

        #[clap(long)]
        to_token: Address,

        /// Amount in human units of the source token.
        #[clap(long)]
        amount: String,

        /// Address the quote is prepared for.
        #[clap(long)]
        account: Address,
    },

    /// Runs a bridge, swap and stake demo workflow with the mock provider.
    Demo {
        /// Make the step at this 1-based position fail.
        #[clap(long)]
        fail_step: Option<usize>,

        /// Record every step as a transaction of the given user.
        #[clap(long)]
        record: bool,

        #[clap(long, default_value = "demo-user")]
        user: String,

        /// Wallet id to attach recorded transactions to.
        #[clap(long)]
        wallet: Option<String>,
    },

    /// Manages connected wallets.
    Wallets {
        #[command(subcommand)]
        command: WalletsCommand,
    },

    /// Shows recent transactions and activity stats of a user.
    Activity {
        #[clap(long, default_value = "demo-user")]
        user: String,

        #[clap(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum WalletsCommand {
    /// Connects a wallet. The first wallet of a user becomes primary.
    Add {
        user: String,
        address: String,
        #[clap(long, default_value = "ethereum")]
        chain: String,
    },

    /// Lists the wallets of a user, primary first.
    List { user: String },

    /// Makes a wallet the user's primary one.
    SetPrimary { user: String, wallet_id: String },

    /// Removes a wallet and its positions.
    Remove { wallet_id: String },
}

/// Fails every time, used to demonstrate a stopped workflow.
struct SimulatedFailure;

#[async_trait]
impl StepExecutor for SimulatedFailure {
    async fn execute(
        &self,
        _provider: &dyn ExecutionProvider,
        _step: &WorkflowStep,
        _ctx: &mut WorkflowContext,
    ) -> Result<WorkflowStepResult, StepError> {
        Err(StepError::failed("Simulated RPC timeout"))
    }
}

/// Session that knows an address but cannot sign or switch chains.
struct WatchOnlyWallet {
    account: Address,
    chain_id: u64,
}

#[async_trait]
impl WalletSession for WatchOnlyWallet {
    fn account(&self) -> Option<Address> {
        Some(self.account)
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id)
    }

    async fn switch_chain(&self, _chain_id: u64) -> Result<(), WalletError> {
        Err(WalletError::ChainSwitchUnsupported)
    }

    async fn write_contract(&self, _call: ContractWrite) -> Result<String, WalletError> {
        Err(WalletError::Transport("watch-only session cannot sign".to_string()))
    }

    async fn send_transaction(&self, _tx: TransactionRequest) -> Result<String, WalletError> {
        Err(WalletError::Transport("watch-only session cannot sign".to_string()))
    }
}

fn parse_chain(name: &str) -> Result<Chain> {
    Chain::parse(name).with_context(|| format!("Unknown chain: {}", name))
}

fn demo_steps() -> Vec<WorkflowStep> {
    vec![
        WorkflowStep::new("demo-bridge", "Bridge USDC to Arbitrum", StepAction::Bridge)
            .with_description("Move 100 USDC from Ethereum to Arbitrum")
            .with_chains(Chain::Ethereum, Chain::Arbitrum)
            .with_tokens("USDC", "USDC")
            .with_amount("100"),
        WorkflowStep::new("demo-swap", "Swap USDC to WETH", StepAction::Swap)
            .with_description("Swap the bridged USDC on Arbitrum")
            .with_chains(Chain::Arbitrum, Chain::Arbitrum)
            .with_tokens("USDC", "WETH")
            .with_amount("100"),
        WorkflowStep::new("demo-stake", "Stake WETH on Aave", StepAction::Stake)
            .with_description("Supply WETH to Aave v3")
            .with_chains(Chain::Arbitrum, Chain::Arbitrum)
            .with_tokens("WETH", "aWETH"),
    ]
}

fn load_config(cli_args: &CliArgs) -> Result<AppConfig> {
    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli = CliConfig {
        db_path: cli_args.db_path.clone(),
        http_timeout_sec: cli_args.http_timeout_sec,
        slippage: cli_args.slippage,
        mock_latency_ms: cli_args.mock_latency_ms,
    };
    AppConfig::resolve(&cli, file_config)
}

fn open_store(config: &AppConfig) -> Result<SqlitePortfolioStore> {
    info!("Opening portfolio database at {:?}...", config.db_path);
    SqlitePortfolioStore::new(&config.db_path)
}

async fn run_strategies(
    config: &AppConfig,
    filter: StrategyFilter,
    limit: usize,
    top: bool,
) -> Result<()> {
    let client = YieldsClient::new(config.yields.clone())?;
    let now = Utc::now();
    let strategies = if top {
        client
            .fetch_top_pools()
            .await
            .iter()
            .map(|pool| defi_hub::yields::transform_pool_to_strategy(pool, None))
            .collect()
    } else {
        load_strategies(&client, limit, now).await
    };

    let matching = filter.apply(&strategies);
    println!(
        "{} {} {} {} {} {}",
        cell("NAME", 36),
        cell("CHAIN", 10),
        cell("APY", 8),
        cell("TVL", 10),
        cell("SCORE", 6),
        "RATING"
    );
    for strategy in &matching {
        println!(
            "{} {} {} {} {} {}",
            cell(&strategy.name, 36),
            cell(&strategy.chain, 10),
            cell(&format!("{:.2}%", strategy.current_apy), 8),
            cell(&strategy.tvl, 10),
            cell(&strategy.safety_score.to_string(), 6),
            Rating::from_score(strategy.safety_score).label()
        );
    }
    println!("{} of {} strategies", matching.len(), strategies.len());
    Ok(())
}

async fn run_pool_history(config: &AppConfig, pool_id: &str, last: usize) -> Result<()> {
    let client = YieldsClient::new(config.yields.clone())?;
    let history = client.fetch_pool_history(pool_id).await;
    if history.is_empty() {
        bail!("No history available for pool {}", pool_id);
    }
    let skip = history.len().saturating_sub(last);
    for point in history.iter().skip(skip) {
        println!(
            "{} {} {}",
            cell(&point.timestamp, 26),
            cell(
                &point
                    .apy
                    .map(|a| format!("{:.2}%", a))
                    .unwrap_or_else(|| "-".to_string()),
                8
            ),
            point.tvl_usd.map(format_tvl).unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

struct QuoteArgs {
    from_chain: Chain,
    from_token: Address,
    to_chain: Chain,
    to_token: Address,
    amount: String,
    account: Address,
}

/// Runs only the quote step of a route workflow against a watch-only session.
async fn run_quote(config: &AppConfig, args: QuoteArgs) -> Result<()> {
    let from_chain_id = args
        .from_chain
        .id()
        .with_context(|| format!("{} is not an EVM chain", args.from_chain))?;
    let wallet: Arc<dyn WalletSession> = Arc::new(WatchOnlyWallet {
        account: args.account,
        chain_id: from_chain_id,
    });
    let reader = Arc::new(JsonRpcChainReader::new(
        config.rpc_urls.clone(),
        config.http_timeout_sec,
    )?);
    let router = Arc::new(LifiClient::new(
        config.routing.lifi.clone(),
        wallet.clone(),
        reader.clone(),
    )?);
    let decimals = TokenDecimalsCache::new(reader.clone());

    let steps = create_route_workflow_steps(
        RouteParams {
            source_chain: args.from_chain,
            source_token_address: args.from_token,
            from_amount: args.amount,
            destination_chain: args.to_chain,
            destination_token_address: args.to_token,
            slippage: config.routing.default_slippage,
        },
        &decimals,
    )
    .await?;
    let quote_only: Vec<WorkflowStep> = steps.into_iter().take(1).collect();
    let bindings = ExecutorBindings::new(wallet, reader, router);
    let runner = WorkflowRunner::new(bindings.bind(quote_only));

    let outcome = runner
        .run(&MockExecutionProvider::new(config.workflow.mock_latency))
        .await?;
    let snapshot = runner.snapshot();
    match outcome {
        WorkflowOutcome::Completed => {
            let message = snapshot
                .steps
                .first()
                .and_then(|s| s.state.message.clone())
                .unwrap_or_default();
            println!("{}", message);
            Ok(())
        }
        WorkflowOutcome::Failed { message, .. } => bail!("Quote failed: {}", message),
        WorkflowOutcome::Cancelled => bail!("Quote cancelled"),
    }
}

async fn run_demo(
    config: &AppConfig,
    fail_step: Option<usize>,
    record: Option<(String, Option<String>)>,
) -> Result<()> {
    let mut steps = demo_steps();
    if let Some(position) = fail_step {
        let step = steps
            .get_mut(position.wrapping_sub(1))
            .with_context(|| format!("Demo has no step {}", position))?;
        step.executor = Some(Arc::new(SimulatedFailure));
    }

    let runner = WorkflowRunner::new(steps.clone());
    let provider = MockExecutionProvider::new(config.workflow.mock_latency);

    let progress = ProgressBar::new(steps.len() as u64);
    progress.set_style(workflow_progress_style());
    progress.enable_steady_tick(std::time::Duration::from_millis(120));

    let mut events = runner.subscribe();
    let labels: Vec<(String, String)> = steps
        .iter()
        .map(|s| (s.id.clone(), s.label.clone()))
        .collect();
    let bar = progress.clone();
    let renderer = tokio::spawn(async move {
        let label_of = |id: &str| {
            labels
                .iter()
                .find(|(step_id, _)| step_id == id)
                .map(|(_, label)| label.clone())
                .unwrap_or_default()
        };
        loop {
            match events.recv().await {
                Ok(WorkflowEvent::StepStarted { step_id }) => bar.set_message(label_of(&step_id)),
                Ok(WorkflowEvent::StepSucceeded { step_id, tx_hash, .. }) => {
                    bar.inc(1);
                    bar.println(format!(
                        "✔ {}{}",
                        label_of(&step_id),
                        tx_hash.map(|h| format!(" ({})", h)).unwrap_or_default()
                    ));
                }
                Ok(WorkflowEvent::StepFailed { step_id, error }) => {
                    bar.println(format!("✖ {} failed: {}", label_of(&step_id), error));
                }
                Ok(WorkflowEvent::RunCompleted) | Ok(WorkflowEvent::RunCancelled) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Progress view skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = runner.run(&provider).await?;
    let snapshot = runner.snapshot();
    // Closes the event channel so the renderer drains and exits.
    drop(runner);
    if let Err(e) = renderer.await {
        warn!("Progress view failed: {}", e);
    }
    progress.finish_and_clear();

    for line in &snapshot.log {
        println!("{}", line);
    }
    match &outcome {
        WorkflowOutcome::Completed => println!("All {} steps completed", snapshot.total),
        WorkflowOutcome::Failed { .. } => {
            if let Some(error) = &snapshot.error {
                println!("{}", error);
            }
            println!(
                "{}/{} steps completed ({}%)",
                snapshot.completed, snapshot.total, snapshot.progress
            );
        }
        WorkflowOutcome::Cancelled => println!("Workflow cancelled"),
    }

    if let Some((user, wallet)) = record {
        let store = open_store(config)?;
        for step in &steps {
            let state = snapshot.state_of(&step.id).cloned().unwrap_or_default();
            let from_chain = step.from_chain.unwrap_or(Chain::Ethereum);
            let mut tx = NewTransaction::pending(
                &user,
                step.action,
                from_chain,
                step.token_in.clone().unwrap_or_default(),
                step.amount.clone().unwrap_or_else(|| "0".to_string()),
            );
            tx.wallet_id = wallet.clone();
            tx.to_chain = step.to_chain;
            tx.to_token = step.token_out.clone();
            tx.tx_hash = state.tx_hash.clone();
            tx.metadata = Some(serde_json::json!({ "stepId": step.id, "label": step.label }));

            let recorded = store.record_transaction(&tx)?;
            match state.status {
                StepStatus::Success => {
                    store.update_transaction_status(
                        &recorded.id,
                        TransactionStatus::Completed,
                        None,
                        None,
                    )?;
                }
                StepStatus::Error => {
                    store.update_transaction_status(
                        &recorded.id,
                        TransactionStatus::Failed,
                        None,
                        state.error.as_deref(),
                    )?;
                }
                StepStatus::Idle | StepStatus::Running => {
                    store.update_transaction_status(
                        &recorded.id,
                        TransactionStatus::Cancelled,
                        None,
                        None,
                    )?;
                }
            }
        }
        println!("Recorded {} transactions for {}", steps.len(), user);
    }
    Ok(())
}

fn run_wallets(config: &AppConfig, command: WalletsCommand) -> Result<()> {
    let store = open_store(config)?;
    match command {
        WalletsCommand::Add {
            user,
            address,
            chain,
        } => {
            let chain = parse_chain(&chain)?;
            let wallet = store.add_wallet(&user, &address, chain)?;
            println!(
                "Connected {} on {}{} ({})",
                wallet.address,
                chain.info().name,
                if wallet.is_primary { " as primary" } else { "" },
                wallet.id
            );
        }
        WalletsCommand::List { user } => {
            let wallets = store.list_wallets(&user)?;
            if wallets.is_empty() {
                println!("No wallets connected for {}", user);
            }
            for wallet in wallets {
                println!(
                    "{} {} {} {}",
                    if wallet.is_primary { "*" } else { " " },
                    cell(&wallet.id, 36),
                    cell(wallet.chain.info().name, 10),
                    wallet.address
                );
            }
        }
        WalletsCommand::SetPrimary { user, wallet_id } => {
            if !store.set_primary_wallet(&user, &wallet_id)? {
                bail!("Wallet {} not found for {}", wallet_id, user);
            }
            println!("{} is now the primary wallet", wallet_id);
        }
        WalletsCommand::Remove { wallet_id } => {
            if !store.remove_wallet(&wallet_id)? {
                bail!("Wallet {} not found", wallet_id);
            }
            println!("Removed {}", wallet_id);
        }
    }
    Ok(())
}

fn run_activity(config: &AppConfig, user: &str, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.activity_stats(user)?;
    println!(
        "{} transactions, {} completed, {} failed, {} pending, success rate {:.1}%",
        stats.total,
        stats.completed,
        stats.failed,
        stats.pending,
        stats.success_rate()
    );
    for tx in store.list_transactions(user, limit)? {
        println!(
            "{} {} {} {} {}",
            cell(&tx.created_at.format("%Y-%m-%d %H:%M:%S").to_string(), 19),
            cell(tx.action.as_str(), 9),
            cell(tx.status.as_str(), 10),
            cell(
                &format!("{} {}", tx.from_amount, tx.from_token),
                16
            ),
            tx.tx_hash.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    let config = load_config(&cli_args)?;

    match cli_args.command {
        Command::Strategies {
            chains,
            stablecoins,
            search,
            limit,
            top,
        } => {
            let filter = StrategyFilter {
                chains,
                stablecoins_only: stablecoins,
                search,
            };
            run_strategies(&config, filter, limit, top).await
        }
        Command::PoolHistory { pool_id, last } => run_pool_history(&config, &pool_id, last).await,
        Command::Quote {
            from_chain,
            from_token,
            to_chain,
            to_token,
            amount,
            account,
        } => {
            let args = QuoteArgs {
                from_chain: parse_chain(&from_chain)?,
                from_token,
                to_chain: parse_chain(&to_chain)?,
                to_token,
                amount,
                account,
            };
            run_quote(&config, args).await
        }
        Command::Demo {
            fail_step,
            record,
            user,
            wallet,
        } => run_demo(&config, fail_step, record.then_some((user, wallet))).await,
        Command::Wallets { command } => run_wallets(&config, command),
        Command::Activity { user, limit } => run_activity(&config, &user, limit),
    }
}
