use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use gsheets_client::SheetsClient;
use storewatch_common::Config;
use storewatch_tracker::checker::StoreChecker;
use storewatch_tracker::orchestrator::TabOrchestrator;
use storewatch_tracker::runner::Runner;
use storewatch_tracker::tracker::Tracker;

/// Storefront availability tracker: checks delivery-platform listings and
/// logs one status column per cycle into the configured spreadsheet.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Run a single cycle and exit instead of running on a schedule.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("storewatch_tracker=info".parse()?),
        )
        .init();

    info!("Storewatch tracker starting...");

    let args = Args::parse();

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    // Wire the ports to their production adapters
    let fetcher = Arc::new(BrowserlessClient::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
    ));
    let store = Arc::new(SheetsClient::new(&config.sheet_id, &config.sheets_token));

    let checker = StoreChecker::new(fetcher, config.clone());
    let orchestrator = TabOrchestrator::new(checker, &config);
    let tracker = Tracker::new(store, orchestrator, &config);

    if args.once {
        run_cycle(&tracker).await
    } else {
        Runner::new(&config).run_forever(|| run_cycle(&tracker)).await;
        unreachable!("run_forever loops until the process is stopped");
    }
}

async fn run_cycle(tracker: &Tracker) -> Result<()> {
    let tabs = tracker.tabs_to_process().await?;
    info!(?tabs, "Tabs to process");
    tracker.run_all(&tabs).await;
    Ok(())
}
