// Domain model for quotes and the precision they are submitted with
use std::time::Duration;

use crate::domain::enums::OrderSide;

/// Order the pricing strategy would like to have resting on the book
#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    pub side: OrderSide,
    pub price: f64,
    pub volume: f64,
}

impl Quote {
    pub fn new(side: OrderSide, price: f64, volume: f64) -> Self {
        Self { side, price, volume }
    }
}

/// Precision and timing parameters shared by every quote of a strategy
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyConfig {
    /// Decimal places allowed for the order price
    pub price_precision: u32,
    /// Decimal places allowed for the order quantity
    pub quote_asset_precision: u32,
    /// Validity window granted to each signed request
    pub receive_window: Duration,
}

impl StrategyConfig {
    pub fn new(price_precision: u32, quote_asset_precision: u32, receive_window: Duration) -> Self {
        Self { price_precision, quote_asset_precision, receive_window }
    }

    pub fn round_price(&self, price: f64) -> f64 {
        round_to_precision(price, self.price_precision)
    }

    pub fn round_quantity(&self, quantity: f64) -> f64 {
        round_to_precision(quantity, self.quote_asset_precision)
    }

    /// Smallest price increment expressible with `price_precision`
    pub fn tick(&self) -> f64 {
        10f64.powi(-(self.price_precision as i32))
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to_precision(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
