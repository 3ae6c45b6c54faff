use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;

use crate::domain::errors::ExchangeError;
use crate::domain::model::exchange::OrderRequest;
use crate::domain::model::order::{CancelledOrder, OpenOrder, PlacedOrder};
use crate::domain::traits::ExchangeGateway;

use super::client::BinanceClient;
use super::parsers::BinanceParser;

/// Where placements go: the matching engine, or the validation-only endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    Live,
    Test,
}

/// Picks the gateway implementation for `mode`; both share the same client
pub fn gateway_for(mode: OrderMode, client: Arc<BinanceClient>) -> Arc<dyn ExchangeGateway> {
    match mode {
        OrderMode::Live => {
            info!("Orders will be placed live on {}", client.base_url());
            Arc::new(LiveGateway::new(client))
        }
        OrderMode::Test => {
            info!("Orders will only be validated on {}", client.base_url());
            Arc::new(TestOrderGateway::new(client))
        }
    }
}

async fn fetch_open_orders(client: &BinanceClient, symbol: &str) -> Result<Vec<OpenOrder>, ExchangeError> {
    let raw = client.open_orders(symbol).await?;
    raw.iter()
        .map(|order| {
            BinanceParser::parse_open_order(order).map_err(|e| ExchangeError::Decode(e.to_string()))
        })
        .collect()
}

async fn cancel(
    client: &BinanceClient,
    order_id: u64,
    client_order_id: &str,
    symbol: &str,
) -> Result<CancelledOrder, ExchangeError> {
    let raw = client.cancel_order(symbol, order_id, client_order_id).await?;
    BinanceParser::parse_cancelled_order(&raw).map_err(|e| ExchangeError::Decode(e.to_string()))
}

/// Sends orders to the matching engine
pub struct LiveGateway {
    client: Arc<BinanceClient>,
}

impl LiveGateway {
    pub fn new(client: Arc<BinanceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExchangeGateway for LiveGateway {
    async fn ping(&self) -> Result<Duration, ExchangeError> {
        self.client.ping().await
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ExchangeError> {
        fetch_open_orders(&self.client, symbol).await
    }

    async fn cancel_order(
        &self,
        order_id: u64,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<CancelledOrder, ExchangeError> {
        cancel(&self.client, order_id, client_order_id, symbol).await
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ExchangeError> {
        let raw = self.client.new_order(request).await?;
        BinanceParser::parse_new_order(&raw, request).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    fn close(&self) {
        self.client.release();
    }
}

/// Same contract as `LiveGateway`, but placements hit `/api/v3/order/test`
pub struct TestOrderGateway {
    client: Arc<BinanceClient>,
}

impl TestOrderGateway {
    pub fn new(client: Arc<BinanceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExchangeGateway for TestOrderGateway {
    async fn ping(&self) -> Result<Duration, ExchangeError> {
        self.client.ping().await
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ExchangeError> {
        fetch_open_orders(&self.client, symbol).await
    }

    async fn cancel_order(
        &self,
        order_id: u64,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<CancelledOrder, ExchangeError> {
        cancel(&self.client, order_id, client_order_id, symbol).await
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ExchangeError> {
        self.client.test_order(request).await?;
        debug!("Test order {} validated", request.client_order_id);
        Ok(BinanceParser::validated_order(request))
    }

    fn close(&self) {
        self.client.release();
    }
}
