use anyhow::Context;
use seatcart_app::{walkthrough, AppState, Plan};
use seatcart_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatcart_app=debug,seatcart_order=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        "Starting seat reservation walkthrough for {} ({})",
        config.session.default_region,
        config.session.currency
    );

    let state = AppState::from_config(config)?;
    let plan = Plan::from_config(&state.config);
    let report = walkthrough::run(&state, &plan).await?;

    tracing::info!("Walkthrough finished:\n{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
