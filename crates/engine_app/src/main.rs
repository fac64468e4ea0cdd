use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_app::app::App;
use engine_app::config::{GazeConfig, LogLevel};

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GazeConfig::load().context("loading config/settings.json")?;
    init_tracing(config.engine.log_level);

    let summary = App::new(&config)?.run().await?;
    for record in &summary.selections {
        info!(target_id = ?record.target, source = ?record.source, "selection");
    }
    Ok(())
}
