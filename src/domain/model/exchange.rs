use std::time::Duration;

use crate::domain::enums::*;

// OrderRequest is a send-side intent
// Therefore separate from OpenOrder
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: f64,
    pub quantity: f64,
    pub client_order_id: String,
    pub time_in_force: TimeInForce,
    pub receive_window: Duration,
    /// Decimal places used when the price goes on the wire
    pub price_precision: u32,
    /// Decimal places used when the quantity goes on the wire
    pub quantity_precision: u32,
}

impl OrderRequest {
    pub fn formatted_price(&self) -> String {
        format!("{:.*}", self.price_precision as usize, self.price)
    }

    pub fn formatted_quantity(&self) -> String {
        format!("{:.*}", self.quantity_precision as usize, self.quantity)
    }
}
