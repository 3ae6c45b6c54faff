use std::sync::Arc;

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::enums::*;
use crate::domain::errors::{BotError, ExchangeErrorKind};
use crate::domain::model::exchange::OrderRequest;
use crate::domain::model::order::{OpenOrder, PlacedOrder};
use crate::domain::model::quote::{Quote, StrategyConfig};
use crate::domain::traits::ExchangeGateway;

/// Result of a best-effort cancellation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelSummary {
    pub cancelled: usize,
    pub failed: usize,
}

/// Order operations of the controller. The exchange owns order state;
/// nothing here is cached between calls.
pub struct OrderManager {
    gateway: Arc<dyn ExchangeGateway>,
}

impl OrderManager {
    pub fn new(gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, BotError> {
        if symbol.trim().is_empty() {
            return Err(BotError::Validation("symbol must not be empty".to_string()));
        }
        let orders = self.gateway.open_orders(symbol).await?;
        debug!("{} open orders on {}", orders.len(), symbol);
        Ok(orders)
    }

    /// Cancels every order in turn; a failed cancel never stops the others
    pub async fn cancel_orders(&self, orders: Option<&[OpenOrder]>) -> Result<CancelSummary, BotError> {
        let orders = orders
            .ok_or_else(|| BotError::Validation("orders to cancel must be provided".to_string()))?;

        let mut summary = CancelSummary::default();
        for order in orders {
            match self
                .gateway
                .cancel_order(order.order_id, &order.client_order_id, &order.symbol)
                .await
            {
                Ok(cancelled) => {
                    info!(
                        "Cancelled {} {} {}@{} ({})",
                        order.order_id,
                        order.side.as_str(),
                        order.quantity,
                        order.price,
                        cancelled.status.as_str()
                    );
                    summary.cancelled += 1;
                }
                Err(e) if e.kind() == ExchangeErrorKind::UnknownOrder => {
                    warn!("Order {} already gone before cancel: {}", order.order_id, e);
                    summary.failed += 1;
                }
                Err(e) => {
                    error!("Failed to cancel order {}: {}", order.order_id, e);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Exchange errors are logged and reported as `Ok(None)`
    pub async fn place_order(&self, request: Option<&OrderRequest>) -> Result<Option<PlacedOrder>, BotError> {
        let request = request
            .ok_or_else(|| BotError::Validation("order request must be provided".to_string()))?;

        match self.gateway.place_order(request).await {
            Ok(order) => {
                info!(
                    "Placed {} {} {} {}@{}{}",
                    order.client_order_id,
                    order.symbol,
                    order.side.as_str(),
                    order.quantity,
                    order.price,
                    if order.validated_only { " (validated only)" } else { "" }
                );
                Ok(Some(order))
            }
            Err(e) => {
                error!(
                    "Failed to place {} {} {}@{}: {}",
                    request.symbol,
                    request.side.as_str(),
                    request.formatted_quantity(),
                    request.formatted_price(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// GTC limit order for `quote`, rounded to the strategy's precision
    pub fn build_request(symbol: &str, quote: &Quote, config: &StrategyConfig) -> OrderRequest {
        OrderRequest {
            symbol: symbol.to_string(),
            side: quote.side,
            order_type: OrderType::Limit,
            price: config.round_price(quote.price),
            quantity: config.round_quantity(quote.volume),
            client_order_id: Uuid::new_v4().simple().to_string(),
            time_in_force: TimeInForce::Gtc,
            receive_window: config.receive_window,
            price_precision: config.price_precision,
            quantity_precision: config.quote_asset_precision,
        }
    }
}
