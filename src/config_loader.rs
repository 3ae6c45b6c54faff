use anyhow::{anyhow, Result};
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::domain::constants::*;
use crate::domain::enums::OrderSide;
use crate::domain::errors::BotError;
use crate::domain::model::quote::StrategyConfig;
use crate::infrastructure::exchange::binance::{Network, OrderMode};
use crate::strategies::spread_maker::{ControllerSettings, QuoteParams, StrategyKind};

/// More decimals than an f64 can carry meaningfully
const MAX_PRECISION: u32 = 16;

/// Top-level configuration structure containing all config sections
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    pub bot: BotConfig,
    pub strategy: StrategySection,
}

/// Exchange endpoints and order routing
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_order_mode")]
    pub order_mode: OrderMode,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            ws_url: default_ws_url(),
            order_mode: default_order_mode(),
        }
    }
}

fn default_rest_url() -> String {
    Network::TEST.rest_url().to_string()
}

fn default_ws_url() -> String {
    Network::TEST.ws_url().to_string()
}

fn default_order_mode() -> OrderMode {
    OrderMode::Test
}

/// Controller settings
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub symbol: String,

    #[serde(default = "default_depth_limit")]
    pub depth_limit: u32,

    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    #[serde(default = "default_latency_warn_ms")]
    pub latency_warn_ms: u64,
}

fn default_depth_limit() -> u32 {
    DEFAULT_DEPTH_LIMIT
}

fn default_update_interval_ms() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_latency_warn_ms() -> u64 {
    LATENCY_WARN_THRESHOLD_MS
}

/// Pricing and order sizing
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    #[serde(default = "default_strategy_kind")]
    pub kind: StrategyKind,

    pub side: OrderSide,
    pub price_precision: u32,
    pub quote_asset_precision: u32,

    #[serde(default = "default_receive_window_ms")]
    pub receive_window_ms: u64,

    pub order_volume: f64,

    #[serde(default)]
    pub min_spread: f64,
}

fn default_strategy_kind() -> StrategyKind {
    StrategyKind::MidPrice
}

fn default_receive_window_ms() -> u64 {
    DEFAULT_RECV_WINDOW_MS
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config_str = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config = Self::from_toml(&config_str)
            .map_err(|e| anyhow!("Invalid config file '{}': {}", path.display(), e))?;

        info!("Loaded configuration from {}", path.display());
        debug!(
            "Quoting {} on {} ({:?} orders)",
            config.bot.symbol, config.exchange.rest_url, config.exchange.order_mode
        );

        Ok(config)
    }

    /// Parse and validate configuration held in memory
    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        if self.bot.symbol.trim().is_empty() {
            return Err(BotError::Configuration("bot.symbol must not be empty".to_string()));
        }
        if self.bot.depth_limit == 0 {
            return Err(BotError::Configuration("bot.depth_limit must be positive".to_string()));
        }
        if !(self.strategy.order_volume > 0.0) {
            return Err(BotError::Configuration(format!(
                "strategy.order_volume must be positive, got {}",
                self.strategy.order_volume
            )));
        }
        if self.strategy.min_spread < 0.0 {
            return Err(BotError::Configuration("strategy.min_spread must not be negative".to_string()));
        }
        if self.strategy.price_precision > MAX_PRECISION || self.strategy.quote_asset_precision > MAX_PRECISION {
            return Err(BotError::Configuration(format!(
                "precision must be at most {} decimals",
                MAX_PRECISION
            )));
        }
        if self.strategy.receive_window_ms == 0 || self.strategy.receive_window_ms > MAX_RECV_WINDOW_MS {
            return Err(BotError::Configuration(format!(
                "strategy.receive_window_ms must be within 1..={}",
                MAX_RECV_WINDOW_MS
            )));
        }
        Ok(())
    }

    pub fn receive_window(&self) -> Duration {
        Duration::from_millis(self.strategy.receive_window_ms)
    }

    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig::new(
            self.strategy.price_precision,
            self.strategy.quote_asset_precision,
            self.receive_window(),
        )
    }

    pub fn quote_params(&self) -> QuoteParams {
        QuoteParams {
            side: self.strategy.side,
            order_volume: self.strategy.order_volume,
            min_spread: self.strategy.min_spread,
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            depth_limit: self.bot.depth_limit,
            update_interval: Duration::from_millis(self.bot.update_interval_ms),
            latency_warn_threshold: Duration::from_millis(self.bot.latency_warn_ms),
        }
    }
}
