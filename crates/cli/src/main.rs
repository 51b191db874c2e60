//! odte-trade: same-day options strategy analyzer and trading agent.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use odte_agent::{SystemClock, TradingAgent};
use odte_alpaca::{AlpacaClient, AlpacaConfig};
use odte_core::{calendar, AgentConfig, ConfigLoader};
use odte_strategy::{catalog, underlying_reference, Analyzer, MarketVolatility};
use tokio::sync::watch;
use tracing::{info, warn};

const RISK_FREE_RATE: f64 = 0.05;
const SECS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

#[derive(Parser)]
#[command(
    name = "odte-trade",
    version,
    about = "Same-day options strategy analyzer and trading agent"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "odte.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the trading agent until the end-of-day unwind or Ctrl-C.
    Run {
        /// Log intended orders without submitting them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Analyze the configured strategies once and print each result as JSON.
    Analyze {
        /// Underlying to analyze; defaults to the first configured one.
        #[arg(short, long)]
        underlying: Option<String>,
    },
    /// List the built-in strategy catalog.
    Strategies,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().json().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { dry_run } => {
            let mut config = load_config(&cli.config)?;
            config.dry_run = config.dry_run || dry_run;
            run(config).await
        }
        Command::Analyze { underlying } => {
            let config = load_config(&cli.config)?;
            analyze(config, underlying).await
        }
        Command::Strategies => {
            list_strategies();
            Ok(())
        }
    }
}

fn load_config(path: &str) -> Result<AgentConfig> {
    let config = ConfigLoader::load(path)?;
    config.validate()?;
    info!(
        mode = config.mode_tag(),
        underlyings = ?config.underlyings,
        strategies = ?config.strategies,
        dry_run = config.dry_run,
        "configuration loaded"
    );
    Ok(config)
}

async fn connect(config: &AgentConfig) -> Result<AlpacaClient> {
    let alpaca = AlpacaConfig::from_env(config.paper)?;
    Ok(AlpacaClient::connect(alpaca).await?)
}

async fn run(config: AgentConfig) -> Result<()> {
    let client = connect(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut agent = TradingAgent::new(client.clone(), client, SystemClock, config);
    agent.run(shutdown_rx).await
}

async fn analyze(config: AgentConfig, underlying: Option<String>) -> Result<()> {
    let client = connect(&config).await?;
    let underlying = match underlying {
        Some(u) => u,
        None => config.underlyings[0].clone(),
    };

    let chain = client.today_chain(&underlying).await?;
    anyhow::ensure!(!chain.is_empty(), "no same-day contracts for {underlying}");
    let Some((price, atm_iv)) = underlying_reference(&chain) else {
        anyhow::bail!("no delta data in the {underlying} chain to anchor a price estimate");
    };
    let volatility = MarketVolatility::from_atm_iv(atm_iv);
    let time_to_expiry =
        calendar::secs_to_cutoff(Utc::now()).unwrap_or(0) as f64 / SECS_PER_YEAR;
    let analyzer = Analyzer::new(RISK_FREE_RATE, atm_iv.unwrap_or(0.0), price, time_to_expiry);

    info!(
        %underlying,
        price = %price,
        contracts = chain.len(),
        volatility = ?volatility,
        "analyzing chain"
    );
    for name in &config.strategies {
        let Some(strategy) = catalog::find(name) else {
            warn!(strategy = %name, "unknown strategy name");
            continue;
        };
        match analyzer.analyze(&strategy, &chain, volatility) {
            Ok(analysis) => println!("{}", serde_json::to_string_pretty(&analysis)?),
            Err(err) => warn!(strategy = %name, error = %err, "analysis failed"),
        }
    }
    Ok(())
}

fn list_strategies() {
    for strategy in catalog::all() {
        let kind = if strategy.is_debit_only { "debit" } else { "credit" };
        println!(
            "{:<20} {:<26} {:?} ({} legs, {})",
            strategy.name,
            strategy.display_name,
            strategy.category,
            strategy.legs.len(),
            kind,
        );
    }
}
