use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billcycle::config::Config;
use billcycle::server;
use billcycle::storage::{LedgerStore, RestTableStore, RetryingStore};

#[derive(Parser)]
#[command(name = "billcycle", about = "Recurring installment generation service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billcycle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::load(&cli.config)?;
    rt.block_on(serve(cfg))?;
    Ok(())
}

async fn serve(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut rest = RestTableStore::new(&cfg.storage.base_url, &cfg.storage.api_key)?;
    if let Some(tenant) = cfg.storage.tenant_id {
        rest = rest.with_tenant(tenant);
    }
    let store: Arc<dyn LedgerStore> = Arc::new(RetryingStore::new(
        rest,
        cfg.retry.max_retries,
        cfg.retry.base_delay(),
    ));

    if let Some(expr) = cfg.scheduler.cron.clone() {
        let store = Arc::clone(&store);
        info!(cron = %expr, "Starting in-process schedule loop");
        tokio::spawn(async move { server::cron_loop(&expr, store).await });
    }

    server::serve(&cfg.server, store).await?;
    Ok(())
}
