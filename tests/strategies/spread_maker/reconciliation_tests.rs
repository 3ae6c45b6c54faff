use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use spread_maker_bot::domain::enums::{OrderSide, OrderStatus};
use spread_maker_bot::domain::errors::{BotError, ExchangeError};
use spread_maker_bot::domain::model::best_pair::{BestPair, PriceLevel};
use spread_maker_bot::domain::model::exchange::OrderRequest;
use spread_maker_bot::domain::model::order::{CancelledOrder, OpenOrder, PlacedOrder};
use spread_maker_bot::domain::model::quote::StrategyConfig;
use spread_maker_bot::domain::traits::{BestPairSender, ExchangeGateway, OrderBookFeed};
use spread_maker_bot::strategies::spread_maker::*;

const SYMBOL: &str = "BTCUSDT";

/// In-memory exchange: placed orders stay open until cancelled
#[derive(Default)]
struct FakeGateway {
    ping_latency: Duration,
    gate: Option<Semaphore>,
    open: Mutex<Vec<OpenOrder>>,
    placed: Mutex<Vec<OrderRequest>>,
    cancelled: Mutex<Vec<u64>>,
    next_order_id: AtomicU64,
    placements_started: AtomicUsize,
    active_calls: AtomicUsize,
    max_active_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl FakeGateway {
    /// Placements wait until `release_placements` is called
    fn gated() -> Self {
        Self { gate: Some(Semaphore::new(0)), ..Self::default() }
    }

    fn release_placements(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    fn placed_prices(&self) -> Vec<f64> {
        self.placed.lock().unwrap().iter().map(|r| r.price).collect()
    }

    fn enter(&self) {
        let active = self.active_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_calls.fetch_max(active, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active_calls.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExchangeGateway for FakeGateway {
    async fn ping(&self) -> Result<Duration, ExchangeError> {
        Ok(self.ping_latency)
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ExchangeError> {
        self.enter();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let orders = self
            .open
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect();
        self.exit();
        Ok(orders)
    }

    async fn cancel_order(
        &self,
        order_id: u64,
        client_order_id: &str,
        symbol: &str,
    ) -> Result<CancelledOrder, ExchangeError> {
        self.enter();
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.open.lock().unwrap().retain(|o| o.order_id != order_id);
        self.cancelled.lock().unwrap().push(order_id);
        self.exit();
        Ok(CancelledOrder {
            order_id,
            client_order_id: client_order_id.to_string(),
            symbol: symbol.to_string(),
            status: OrderStatus::Canceled,
        })
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ExchangeError> {
        self.placements_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        }
        self.enter();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.open.lock().unwrap().push(OpenOrder {
            order_id,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            status: OrderStatus::New,
        });
        self.placed.lock().unwrap().push(request.clone());
        self.exit();
        Ok(PlacedOrder {
            order_id,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            status: OrderStatus::New,
            validated_only: false,
        })
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeFeed {
    listener: Mutex<Option<BestPairSender>>,
    update_intervals: Mutex<Vec<Duration>>,
    snapshot_depths: Mutex<Vec<u32>>,
}

impl FakeFeed {
    fn publish(&self, pair: Option<BestPair>) {
        if let Some(listener) = self.listener.lock().unwrap().as_ref() {
            listener.send_replace(pair);
        }
    }

    fn is_subscribed(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }

    /// Live receivers of the published pairs, i.e. running cycle workers
    fn receiver_count(&self) -> usize {
        self.listener.lock().unwrap().as_ref().map_or(0, |l| l.receiver_count())
    }
}

#[async_trait]
impl OrderBookFeed for FakeFeed {
    async fn subscribe(&self, listener: BestPairSender) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    async fn unsubscribe(&self) {
        self.listener.lock().unwrap().take();
    }

    async fn start_streaming(&self, update_interval: Duration) -> Result<(), ExchangeError> {
        self.update_intervals.lock().unwrap().push(update_interval);
        Ok(())
    }

    async fn build_snapshot(&self, depth_limit: u32) -> Result<(), ExchangeError> {
        self.snapshot_depths.lock().unwrap().push(depth_limit);
        Ok(())
    }
}

fn settings() -> ControllerSettings {
    ControllerSettings {
        depth_limit: 50,
        update_interval: Duration::from_millis(100),
        latency_warn_threshold: Duration::from_millis(1000),
    }
}

fn controller(gateway: &Arc<FakeGateway>, feed: &Arc<FakeFeed>) -> Arc<ReconciliationController> {
    let strategy = build_strategy(
        StrategyKind::MidPrice,
        StrategyConfig::new(2, 3, Duration::from_millis(5000)),
        QuoteParams { side: OrderSide::Buy, order_volume: 0.01, min_spread: 0.0 },
    );
    Arc::new(
        ReconciliationController::builder()
            .symbol(SYMBOL)
            .strategy(strategy)
            .gateway(gateway.clone())
            .feed(feed.clone())
            .settings(settings())
            .build()
            .unwrap(),
    )
}

fn pair(bid: f64, ask: f64) -> BestPair {
    BestPair::new(PriceLevel::new(bid, 1.0), PriceLevel::new(ask, 1.0))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_notifications_never_overlap() {
    let gateway = Arc::new(FakeGateway::default());
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.reconcile(Some(pair(100.0 + i as f64, 102.0 + i as f64))).await })
        })
        .collect();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(outcome, CycleOutcome::Placed { .. }));
    }

    assert_eq!(gateway.max_active_calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.cycles_completed(), 10);
    assert_eq!(gateway.placed.lock().unwrap().len(), 10);
    // every cycle but the first cancelled its predecessor's order
    assert_eq!(gateway.cancelled.lock().unwrap().len(), 9);
    assert_eq!(gateway.open.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_burst_collapses_into_latest_pair() {
    let gateway = Arc::new(FakeGateway::gated());
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);
    controller.run().await.unwrap();

    feed.publish(Some(pair(100.0, 102.0)));
    wait_until(|| gateway.placements_started.load(Ordering::SeqCst) == 1).await;

    // arrive while the first cycle is still placing
    feed.publish(Some(pair(101.0, 103.0)));
    feed.publish(Some(pair(102.0, 104.0)));
    feed.publish(Some(pair(103.0, 105.0)));
    gateway.release_placements();

    wait_until(|| controller.cycles_completed() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(controller.cycles_completed(), 2);
    assert_eq!(gateway.placed_prices(), vec![101.0, 104.0]);
    assert_eq!(*gateway.cancelled.lock().unwrap(), vec![1]);

    controller.stop().await;
}

#[tokio::test]
async fn test_stop_during_outstanding_placement() {
    let gateway = Arc::new(FakeGateway::gated());
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);
    controller.run().await.unwrap();

    feed.publish(Some(pair(100.0, 102.0)));
    wait_until(|| gateway.placements_started.load(Ordering::SeqCst) == 1).await;

    controller.stop().await;
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(gateway.close_calls.load(Ordering::SeqCst), 1);
    assert!(!feed.is_subscribed());

    // the abandoned placement never completes, even once unblocked
    gateway.release_placements();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(gateway.placed_prices().is_empty());

    controller.stop().await;
    drop(controller);
    assert_eq!(gateway.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_wires_feed_and_tolerates_slow_ping() {
    let gateway = Arc::new(FakeGateway { ping_latency: Duration::from_millis(1500), ..FakeGateway::default() });
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);

    controller.run().await.unwrap();

    assert_eq!(controller.state(), ControllerState::Subscribed);
    assert!(feed.is_subscribed());
    assert_eq!(*feed.update_intervals.lock().unwrap(), vec![Duration::from_millis(100)]);
    assert_eq!(*feed.snapshot_depths.lock().unwrap(), vec![50]);
    assert!(matches!(controller.run().await, Err(BotError::Validation(_))));

    feed.publish(Some(pair(100.0, 102.0)));
    wait_until(|| controller.cycles_completed() == 1).await;
    assert_eq!(gateway.placed_prices(), vec![101.0]);

    controller.stop().await;
}

#[tokio::test]
async fn test_empty_notification_does_not_stop_worker() {
    let gateway = Arc::new(FakeGateway::default());
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);
    controller.run().await.unwrap();

    feed.publish(None);
    wait_until(|| controller.cycles_completed() == 1).await;
    assert_eq!(gateway.placements_started.load(Ordering::SeqCst), 0);

    feed.publish(Some(pair(200.0, 201.0)));
    wait_until(|| controller.cycles_completed() == 2).await;
    assert_eq!(gateway.placed_prices(), vec![200.5]);

    controller.stop().await;
}

#[tokio::test]
async fn test_run_after_stop_is_rejected() {
    let gateway = Arc::new(FakeGateway::default());
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);

    controller.stop().await;
    assert!(matches!(controller.run().await, Err(BotError::Validation(_))));
    assert!(!feed.is_subscribed());
    assert!(feed.update_intervals.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dropping_running_controller_releases_client() {
    let gateway = Arc::new(FakeGateway::default());
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);
    controller.run().await.unwrap();

    feed.publish(Some(pair(100.0, 102.0)));
    wait_until(|| controller.cycles_completed() == 1).await;
    assert_eq!(feed.receiver_count(), 1);

    // the worker may still hold the controller for the tail of its cycle
    drop(controller);

    wait_until(|| gateway.close_calls.load(Ordering::SeqCst) == 1).await;
    wait_until(|| feed.receiver_count() == 0).await;
    assert_eq!(gateway.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mid_price_quote_never_crosses_one_tick_spread() {
    let gateway = Arc::new(FakeGateway::default());
    let feed = Arc::new(FakeFeed::default());
    let controller = controller(&gateway, &feed);

    let outcome = controller.reconcile(Some(pair(100.01, 100.02))).await.unwrap();

    assert!(matches!(outcome, CycleOutcome::Placed { .. }));
    let prices = gateway.placed_prices();
    assert_eq!(prices, vec![100.01]);
    assert!(prices[0] < 100.02);
}
