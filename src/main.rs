use anyhow::{Context, Result};
use clap::Parser;
use radar::{
    config::Config,
    fetch::HttpFetcher,
    logging,
    mail::ImapSource,
    store::{GcsStore, LocalStore, RemoteStore},
    workflow::{RunOutcome, Workflow, WorkflowSettings},
};
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) configuration ────────────────────────────────────────────
    dotenv::dotenv().ok();
    let config = Config::parse();
    config.prepare_work_dir()?;

    // ─── 2) init logging ─────────────────────────────────────────────
    logging::init(&config.log_path())?;
    info!(work_dir = %config.work_dir.display(), "startup");

    // ─── 3) run against the configured store ─────────────────────────
    let outcome = match (&config.store_dir, &config.bucket) {
        (Some(dir), _) => {
            info!(store = %dir.display(), "using local store");
            run_with(&config, LocalStore::new(dir)?).await?
        }
        (None, Some(bucket)) => {
            info!(%bucket, folder = ?config.drive_folder_id, "using GCS store");
            run_with(
                &config,
                GcsStore::new(bucket, config.drive_folder_id.as_deref()),
            )
            .await?
        }
        (None, None) => anyhow::bail!("either --bucket or --store-dir is required"),
    };

    if !outcome.is_success() {
        error!(%outcome, "run failed");
        std::process::exit(1);
    }
    info!("all done");
    Ok(())
}

async fn run_with<S: RemoteStore>(config: &Config, store: S) -> Result<RunOutcome> {
    let fetcher = HttpFetcher::new(Duration::from_secs(config.http_timeout_secs))
        .context("creating export fetcher")?;
    let workflow = Workflow::new(
        WorkflowSettings::from_config(config),
        ImapSource::from_config(config),
        store,
        fetcher,
    );
    Ok(workflow.run().await)
}
