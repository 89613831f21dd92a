//! Monitor a build until it finishes — `buildwatch watch`.

use anyhow::{Context, Result};
use tracing::info;

use buildwatch::build::{CloudBuildSource, TokenProvider};
use buildwatch::config::WatchConfig;
use buildwatch::monitor::{Monitor, SleepTicker};
use buildwatch::notify;

pub async fn cmd_watch(config: WatchConfig) -> Result<()> {
    info!(
        build = %config.build_id,
        project_id = %config.project_id,
        auth = %config.auth,
        "Starting monitor mode"
    );

    let tokens = match &config.gcp_token {
        Some(token) => TokenProvider::Static(token.clone()),
        None => TokenProvider::metadata(),
    };
    let source =
        CloudBuildSource::with_base_url(&config.cloud_build_api, &config.project_id, tokens);
    let notifier = notify::from_config(&config);
    let ticker = SleepTicker::new(config.tick);

    let mut monitor = Monitor::new(
        config.build_id.clone(),
        source,
        notifier,
        ticker,
        config.max_errors,
    );
    let finished = monitor
        .run()
        .await
        .with_context(|| format!("Monitoring build {} failed", config.build_id))?;

    info!(build = %finished.id, status = %finished.status, "Monitoring complete");
    Ok(())
}
