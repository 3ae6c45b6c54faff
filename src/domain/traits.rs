use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::errors::ExchangeError;
use crate::domain::model::best_pair::BestPair;
use crate::domain::model::exchange::OrderRequest;
use crate::domain::model::order::{CancelledOrder, OpenOrder, PlacedOrder};
use crate::domain::model::quote::{Quote, StrategyConfig};

/// Latest-value slot a feed publishes top-of-book changes into.
/// `None` stands for a notification without payload.
pub type BestPairSender = watch::Sender<Option<BestPair>>;
pub type BestPairReceiver = watch::Receiver<Option<BestPair>>;

/// Request/response facade over the exchange
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Round trip latency of a connectivity check
    async fn ping(&self) -> Result<Duration, ExchangeError>;
    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ExchangeError>;
    async fn cancel_order(
        &self,
        order_id: u64,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<CancelledOrder, ExchangeError>;
    async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ExchangeError>;
    /// Release the underlying network client. Later calls fail with `ClientReleased`.
    fn close(&self);
}

/// Maps a top-of-book snapshot to the order the bot should rest
pub trait PricingStrategy: Send + Sync {
    fn config(&self) -> &StrategyConfig;
    fn process(&self, best_pair: &BestPair) -> Option<Quote>;
}

/// Local replica of the order book that notifies on best bid/ask changes
#[async_trait]
pub trait OrderBookFeed: Send + Sync {
    async fn subscribe(&self, listener: BestPairSender);
    async fn unsubscribe(&self);
    async fn start_streaming(&self, update_interval: Duration) -> Result<(), ExchangeError>;
    async fn build_snapshot(&self, depth_limit: u32) -> Result<(), ExchangeError>;
    async fn stop_streaming(&self) {}
}
