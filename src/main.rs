// Standard library imports
use std::path::Path;
use std::sync::Arc;

// External crate imports
use anyhow::Result;
use dotenv::dotenv;
use log::{error, info, warn};
use tokio::time::Duration;

// Internal crate imports
use spread_maker_bot::config_loader::AppConfig;
use spread_maker_bot::domain::traits::OrderBookFeed;
use spread_maker_bot::infrastructure::exchange::binance::{gateway_for, BinanceClient, BinanceDepthFeed, BinanceKeys};
use spread_maker_bot::strategies::spread_maker::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("Logger initialized");

    // Load configuration from TOML file (first try relative path, then the working directory)
    let config_path = Path::new("../config.toml");
    let config = match AppConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config from {}: {}", config_path.display(), e);

            let alt_path = Path::new("./config.toml");
            info!("Attempting to load from alternate path: {}", alt_path.display());
            AppConfig::from_file(alt_path)?
        }
    };

    run_bot(Arc::new(config)).await
}

/// Wires the exchange, feed and strategy together and runs until Ctrl+C
async fn run_bot(config: Arc<AppConfig>) -> Result<()> {
    let keys = BinanceKeys::from_env()?;
    let client = Arc::new(BinanceClient::new(
        config.exchange.rest_url.clone(),
        keys,
        config.receive_window(),
    ));

    let gateway = gateway_for(config.exchange.order_mode, client.clone());
    let feed = Arc::new(BinanceDepthFeed::new(
        config.bot.symbol.clone(),
        config.exchange.ws_url.clone(),
        client,
    ));
    let strategy = build_strategy(config.strategy.kind, config.strategy_config(), config.quote_params());

    let controller = Arc::new(
        ReconciliationController::builder()
            .symbol(config.bot.symbol.clone())
            .strategy(strategy)
            .gateway(gateway)
            .feed(feed.clone())
            .settings(config.controller_settings())
            .build()?,
    );

    // Set up signal handler for SIGINT (Ctrl+C)
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    let run_result = controller.run().await;
    match &run_result {
        Ok(()) => {
            info!("Quoting {}, press Ctrl+C to stop", controller.symbol());
            sigint.recv().await;
            warn!("SIGINT (Ctrl+C) received. Attempting graceful shutdown...");
        }
        Err(e) => error!("Controller failed to start: {}", e),
    }

    cleanup(controller, feed).await;
    run_result.map_err(Into::into)
}

async fn cleanup(controller: Arc<ReconciliationController>, feed: Arc<BinanceDepthFeed>) {
    let cleanup_future = async {
        controller.stop().await;
        feed.stop_streaming().await;
    };

    match tokio::time::timeout(Duration::from_secs(10), cleanup_future).await {
        Ok(()) => info!("Cleanup completed after {} cycles", controller.cycles_completed()),
        Err(_) => error!("Cleanup timed out"),
    }
}
