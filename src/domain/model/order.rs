// Domain model for orders as the exchange reports them
use crate::domain::enums::{OrderSide, OrderStatus};

/// Snapshot of a resting order owned by the exchange
#[derive(Clone, Debug, PartialEq)]
pub struct OpenOrder {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub status: OrderStatus,
}

/// Order accepted by the exchange (or validated only, in test mode)
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedOrder {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub status: OrderStatus,
    pub validated_only: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CancelledOrder {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub status: OrderStatus,
}
