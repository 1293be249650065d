use anyhow::Context;
use chrono::Utc;
use contrail_api::{replay, Script};
use contrail_store::app_config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contrail_api=debug,contrail_order=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().context("loading configuration")?;

    let script_path = std::env::args()
        .nth(1)
        .or_else(|| config.runner.script_path.clone())
        .context("no script given: pass a path or set runner.script_path")?;
    let start = config.runner.start_time.unwrap_or_else(Utc::now);
    tracing::info!("Replaying {} from {}", script_path, start);

    let raw = tokio::fs::read_to_string(&script_path)
        .await
        .with_context(|| format!("reading {}", script_path))?;
    let script: Script =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", script_path))?;

    let report = replay(script, &config.ledger, start).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
