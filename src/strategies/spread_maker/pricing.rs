use std::sync::Arc;

use log::debug;
use serde::Deserialize;

use crate::domain::enums::OrderSide;
use crate::domain::model::best_pair::BestPair;
use crate::domain::model::quote::{Quote, StrategyConfig};
use crate::domain::traits::PricingStrategy;

/// Pricing strategies selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MidPrice,
    PennyJump,
}

/// What every quote carries regardless of how it is priced
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteParams {
    pub side: OrderSide,
    pub order_volume: f64,
    /// Spreads narrower than this produce no quote
    pub min_spread: f64,
}

pub fn build_strategy(
    kind: StrategyKind,
    config: StrategyConfig,
    params: QuoteParams,
) -> Arc<dyn PricingStrategy> {
    match kind {
        StrategyKind::MidPrice => Arc::new(MidPriceStrategy::new(config, params)),
        StrategyKind::PennyJump => Arc::new(PennyJumpStrategy::new(config, params)),
    }
}

/// Rests the configured side at the mid price
pub struct MidPriceStrategy {
    config: StrategyConfig,
    params: QuoteParams,
}

impl MidPriceStrategy {
    pub fn new(config: StrategyConfig, params: QuoteParams) -> Self {
        Self { config, params }
    }
}

impl PricingStrategy for MidPriceStrategy {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn process(&self, best_pair: &BestPair) -> Option<Quote> {
        if !best_pair.is_tradeable() || best_pair.spread() < self.params.min_spread {
            debug!("Mid price: no quote for spread {}", best_pair.spread());
            return None;
        }
        // a rounded mid can land on the opposite best when the spread is one tick
        let tick = self.config.tick();
        let mid = self.config.round_price(best_pair.mid());
        let price = match self.params.side {
            OrderSide::Buy => self.config.round_price(mid.min(best_pair.ask.price - tick)),
            OrderSide::Sell => self.config.round_price(mid.max(best_pair.bid.price + tick)),
        };
        Some(Quote::new(self.params.side, price, self.params.order_volume))
    }
}

/// Steps one tick in front of the same-side best price without crossing
pub struct PennyJumpStrategy {
    config: StrategyConfig,
    params: QuoteParams,
}

impl PennyJumpStrategy {
    pub fn new(config: StrategyConfig, params: QuoteParams) -> Self {
        Self { config, params }
    }
}

impl PricingStrategy for PennyJumpStrategy {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn process(&self, best_pair: &BestPair) -> Option<Quote> {
        let tick = self.config.tick();
        let spread = best_pair.spread();
        // a half tick of slack absorbs float noise in the spread
        if !best_pair.is_tradeable() || spread + tick / 2.0 < 2.0 * tick || spread < self.params.min_spread {
            debug!("Penny jump: spread {} too tight for tick {}", spread, tick);
            return None;
        }
        let price = match self.params.side {
            OrderSide::Buy => best_pair.bid.price + tick,
            OrderSide::Sell => best_pair.ask.price - tick,
        };
        Some(Quote::new(self.params.side, price, self.params.order_volume))
    }
}
