//! Kirppu - chat bot that drafts marketplace listings from photos
//!
//! CLI entry point: wires the platform adapter, the marketplace client and
//! the advisor together and pumps inbound updates into the dispatcher.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use kirppu::advisory::{AdvisoryService, LlmAdvisor, StubAdvisor};
use kirppu::cli::{Cli, Command};
use kirppu::config::Config;
use kirppu::dispatch::Dispatcher;
use kirppu::market::{AdService, InMemoryMarket, MarketClient};
use kirppu::platform::Telegram;
use kirppu::session::Deps;

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Config) => cmd_config(&config),
        Some(Command::Run { dry_run }) => cmd_run(config, dry_run).await,
        None => cmd_run(config, false).await,
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    let rendered = serde_yaml::to_string(config).context("Failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}

async fn cmd_run(config: Config, dry_run: bool) -> Result<()> {
    if !dry_run {
        config.validate()?;
    }

    let telegram = Arc::new(Telegram::from_config(&config.platform).context("Failed to set up the chat platform")?);

    let config = Arc::new(config);
    let (market, advisory): (Arc<dyn AdService>, Arc<dyn AdvisoryService>) = if dry_run {
        info!("Dry run: in-memory ad service, canned advisor");
        (Arc::new(InMemoryMarket::new()), Arc::new(StubAdvisor::new()))
    } else {
        let market = MarketClient::from_config(&config.market).context("Failed to set up the ad service")?;
        let advisor = LlmAdvisor::from_config(&config.advisory).context("Failed to set up the advisory service")?;
        (Arc::new(market), Arc::new(advisor))
    };

    let dispatcher = Dispatcher::new(Deps {
        market,
        advisory,
        chat: telegram.clone(),
        config,
    });

    info!(dry_run, "kirppu started");
    loop {
        match telegram.poll().await {
            Ok(events) => {
                for (user, event) in events {
                    if let Err(e) = dispatcher.route(user, event).await {
                        warn!(%user, error = %e, "event routing failed");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "update poll failed, backing off");
                sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
