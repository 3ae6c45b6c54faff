use anyhow::{anyhow, Context, Result};

use crate::domain::enums::{OrderSide, OrderStatus};
use crate::domain::model::exchange::OrderRequest;
use crate::domain::model::order::{CancelledOrder, OpenOrder, PlacedOrder};

use super::models::{CancelOrderResponse, NewOrderResponse, OpenOrderResponse};

/// Converts Binance payloads into domain models
pub struct BinanceParser;

impl BinanceParser {
    pub fn parse_decimal(field: &str, value: &str) -> Result<f64> {
        value
            .parse::<f64>()
            .with_context(|| format!("Invalid {} '{}'", field, value))
    }

    /// Parses one `[price, quantity]` level of a depth payload
    pub fn parse_level(level: &[String; 2]) -> Result<(f64, f64)> {
        let price = Self::parse_decimal("price", &level[0])?;
        let quantity = Self::parse_decimal("quantity", &level[1])?;
        if price < 0.0 || quantity < 0.0 {
            return Err(anyhow!("Negative depth level {:?}", level));
        }
        Ok((price, quantity))
    }

    pub fn parse_open_order(raw: &OpenOrderResponse) -> Result<OpenOrder> {
        Ok(OpenOrder {
            order_id: raw.order_id,
            client_order_id: raw.client_order_id.clone(),
            symbol: raw.symbol.clone(),
            side: OrderSide::from_str(&raw.side)?,
            price: Self::parse_decimal("price", &raw.price)?,
            quantity: Self::parse_decimal("origQty", &raw.orig_qty)?,
            status: OrderStatus::from_str(&raw.status)?,
        })
    }

    /// Missing fields fall back to what was requested, since ACK responses omit them
    pub fn parse_new_order(raw: &NewOrderResponse, request: &OrderRequest) -> Result<PlacedOrder> {
        let price = match raw.price.as_deref() {
            Some(p) => Self::parse_decimal("price", p)?,
            None => request.price,
        };
        let quantity = match raw.orig_qty.as_deref() {
            Some(q) => Self::parse_decimal("origQty", q)?,
            None => request.quantity,
        };
        let side = match raw.side.as_deref() {
            Some(s) => OrderSide::from_str(s)?,
            None => request.side,
        };
        let status = match raw.status.as_deref() {
            Some(s) => OrderStatus::from_str(s)?,
            None => OrderStatus::New,
        };

        Ok(PlacedOrder {
            order_id: raw.order_id,
            client_order_id: raw.client_order_id.clone(),
            symbol: raw.symbol.clone(),
            side,
            price,
            quantity,
            status,
            validated_only: false,
        })
    }

    pub fn parse_cancelled_order(raw: &CancelOrderResponse) -> Result<CancelledOrder> {
        Ok(CancelledOrder {
            order_id: raw.order_id,
            client_order_id: raw.orig_client_order_id.clone(),
            symbol: raw.symbol.clone(),
            status: OrderStatus::from_str(&raw.status)?,
        })
    }

    /// The test endpoint answers `{}`; echo the request back as a validated order
    pub fn validated_order(request: &OrderRequest) -> PlacedOrder {
        PlacedOrder {
            order_id: 0,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            status: OrderStatus::New,
            validated_only: true,
        }
    }
}
