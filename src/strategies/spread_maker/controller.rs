// Standard library imports
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

// External crate imports
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

// Internal crate imports
use crate::domain::errors::BotError;
use crate::domain::model::best_pair::BestPair;
use crate::domain::model::exchange::OrderRequest;
use crate::domain::model::order::{OpenOrder, PlacedOrder};
use crate::domain::traits::{BestPairReceiver, ExchangeGateway, OrderBookFeed, PricingStrategy};

use super::config::ControllerSettings;
use super::order_manager::{CancelSummary, OrderManager};

const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControllerState {
    Idle = 0,
    Validating = 1,
    Subscribed = 2,
    Reconciling = 3,
    Stopped = 4,
}

impl ControllerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ControllerState::Idle,
            1 => ControllerState::Validating,
            2 => ControllerState::Subscribed,
            3 => ControllerState::Reconciling,
            _ => ControllerState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Healthy(Duration),
    Degraded(Duration),
    Unreachable,
}

/// How a reconciliation cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Open orders could not be listed; nothing was cancelled or placed
    ListFailed,
    /// The strategy declined to quote after the cancels went out
    NoQuote { cancels: CancelSummary },
    Placed { cancels: CancelSummary, order: PlacedOrder },
    PlacementFailed { cancels: CancelSummary },
    /// The controller was stopped before the cycle could act
    Aborted,
}

/// Builds a controller, refusing to start without every collaborator
#[derive(Default)]
pub struct ControllerBuilder {
    symbol: Option<String>,
    strategy: Option<Arc<dyn PricingStrategy>>,
    gateway: Option<Arc<dyn ExchangeGateway>>,
    feed: Option<Arc<dyn OrderBookFeed>>,
    settings: ControllerSettings,
}

impl ControllerBuilder {
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn PricingStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn ExchangeGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn feed(mut self, feed: Arc<dyn OrderBookFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<ReconciliationController, BotError> {
        let symbol = self
            .symbol
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| BotError::Configuration("symbol is required".to_string()))?;
        let strategy = self
            .strategy
            .ok_or_else(|| BotError::Configuration("pricing strategy is required".to_string()))?;
        let gateway = self
            .gateway
            .ok_or_else(|| BotError::Configuration("exchange gateway is required".to_string()))?;
        let feed = self
            .feed
            .ok_or_else(|| BotError::Configuration("order book feed is required".to_string()))?;

        let (shutdown, _) = broadcast::channel(1);
        Ok(ReconciliationController {
            symbol,
            strategy,
            orders: OrderManager::new(gateway.clone()),
            gateway,
            feed,
            settings: self.settings,
            state: AtomicU8::new(ControllerState::Idle as u8),
            released: AtomicBool::new(false),
            shutdown,
            worker: Mutex::new(None),
            cycle_lock: Mutex::new(()),
            cycles_completed: AtomicU64::new(0),
        })
    }
}

/// Keeps one fresh resting order per top-of-book change.
///
/// Every change notification runs a cycle: list open orders, cancel them,
/// ask the strategy for a quote and place it. Notifications land in a
/// latest-value slot read by a single worker, so cycles never overlap and
/// a burst of changes collapses into one cycle for the most recent pair.
pub struct ReconciliationController {
    symbol: String,
    strategy: Arc<dyn PricingStrategy>,
    gateway: Arc<dyn ExchangeGateway>,
    feed: Arc<dyn OrderBookFeed>,
    orders: OrderManager,
    settings: ControllerSettings,
    state: AtomicU8,
    released: AtomicBool,
    shutdown: broadcast::Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cycle_lock: Mutex<()>,
    cycles_completed: AtomicU64,
}

impl ReconciliationController {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> ControllerState {
        ControllerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ControllerState::Stopped
    }

    /// Cycles that ran to an outcome (including validation failures)
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::SeqCst)
    }

    /// Moves to `next` unless the controller has been stopped
    fn transition(&self, next: ControllerState) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != ControllerState::Stopped as u8).then_some(next as u8)
            })
            .is_ok()
    }

    pub async fn validate_connectivity(&self) -> ConnectivityStatus {
        let threshold = self.settings.latency_warn_threshold;
        match self.gateway.ping().await {
            Ok(latency) if latency <= threshold => {
                info!("Exchange reachable, ping {} ms", latency.as_millis());
                ConnectivityStatus::Healthy(latency)
            }
            Ok(latency) => {
                warn!(
                    "Degraded connectivity: ping {} ms exceeds {} ms",
                    latency.as_millis(),
                    threshold.as_millis()
                );
                ConnectivityStatus::Degraded(latency)
            }
            Err(e) => {
                error!("Connectivity check failed: {}", e);
                ConnectivityStatus::Unreachable
            }
        }
    }

    pub async fn list_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, BotError> {
        self.orders.list_open_orders(symbol).await
    }

    pub async fn cancel_orders(&self, orders: Option<&[OpenOrder]>) -> Result<CancelSummary, BotError> {
        self.orders.cancel_orders(orders).await
    }

    pub async fn place_order(&self, request: Option<&OrderRequest>) -> Result<Option<PlacedOrder>, BotError> {
        self.orders.place_order(request).await
    }

    /// Checks connectivity, wires the cycle worker to the feed and starts the feed.
    /// Returns once the feed is streaming; cycles then run on the worker.
    pub async fn run(self: &Arc<Self>) -> Result<(), BotError> {
        match self.state() {
            ControllerState::Idle => {}
            ControllerState::Stopped => {
                return Err(BotError::Validation("controller has been stopped".to_string()))
            }
            state => {
                return Err(BotError::Validation(format!("controller already running ({:?})", state)))
            }
        }

        self.transition(ControllerState::Validating);
        self.validate_connectivity().await;

        let (tx, rx) = watch::channel(None);
        let shutdown = self.shutdown.subscribe();
        self.feed.subscribe(tx).await;
        let handle = tokio::spawn(Self::worker_loop(Arc::downgrade(self), self.symbol.clone(), rx, shutdown));
        *self.worker.lock().await = Some(handle);

        if !self.transition(ControllerState::Subscribed) {
            // stopped while wiring up
            self.feed.unsubscribe().await;
            return Err(BotError::Validation("controller has been stopped".to_string()));
        }
        info!("Reconciliation controller subscribed to {} book changes", self.symbol);

        self.feed.start_streaming(self.settings.update_interval).await?;
        self.feed.build_snapshot(self.settings.depth_limit).await?;
        info!("Order book feed for {} streaming", self.symbol);
        Ok(())
    }

    /// Holds the controller weakly between cycles so dropping the last
    /// handle still runs `Drop` and releases the client.
    async fn worker_loop(
        controller: Weak<Self>,
        symbol: String,
        mut updates: BestPairReceiver,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        debug!("Cycle worker for {} started", symbol);
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        debug!("Feed dropped the subscription");
                        break;
                    }
                    let best_pair = *updates.borrow_and_update();
                    let Some(controller) = controller.upgrade() else {
                        debug!("Controller for {} dropped", symbol);
                        break;
                    };
                    tokio::select! {
                        outcome = controller.reconcile(best_pair) => {
                            if let Ok(outcome) = outcome {
                                debug!("Cycle finished: {:?}", outcome);
                            }
                        }
                        _ = shutdown.recv() => {
                            info!("Abandoning in-flight cycle on shutdown");
                            break;
                        }
                    }
                }
                // also fires when the controller is dropped with the sender
                _ = shutdown.recv() => break,
            }
        }
        debug!("Cycle worker for {} stopped", symbol);
    }

    /// Runs one reconciliation cycle for `best_pair`.
    /// Concurrent callers queue behind the cycle in progress.
    pub async fn reconcile(&self, best_pair: Option<BestPair>) -> Result<CycleOutcome, BotError> {
        let _cycle = self.cycle_lock.lock().await;
        let outcome = self.run_cycle(best_pair).await;
        self.cycles_completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn run_cycle(&self, best_pair: Option<BestPair>) -> Result<CycleOutcome, BotError> {
        let Some(best_pair) = best_pair else {
            error!("Book change notification without best pair");
            return Err(BotError::Validation("best pair notification without payload".to_string()));
        };
        if self.is_stopped() {
            return Ok(CycleOutcome::Aborted);
        }
        let _state = ReconcilingGuard::enter(self);
        debug!(
            "Reconciling {} on {}@{} / {}@{}",
            self.symbol, best_pair.bid.size, best_pair.bid.price, best_pair.ask.size, best_pair.ask.price
        );

        let open_orders = match self.orders.list_open_orders(&self.symbol).await {
            Ok(orders) => orders,
            Err(e) => {
                error!("Failed to list open orders for {}: {}", self.symbol, e);
                return Ok(CycleOutcome::ListFailed);
            }
        };
        let cancels = self.orders.cancel_orders(Some(&open_orders)).await?;

        let Some(quote) = self.strategy.process(&best_pair) else {
            debug!("Strategy returned no quote");
            return Ok(CycleOutcome::NoQuote { cancels });
        };
        if self.is_stopped() {
            return Ok(CycleOutcome::Aborted);
        }

        let request = OrderManager::build_request(&self.symbol, &quote, self.strategy.config());
        match self.orders.place_order(Some(&request)).await? {
            Some(order) => Ok(CycleOutcome::Placed { cancels, order }),
            None => Ok(CycleOutcome::PlacementFailed { cancels }),
        }
    }

    /// Stops the worker, unsubscribes from the feed and releases the
    /// network client. Safe to call repeatedly and while a cycle is running.
    pub async fn stop(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            debug!("Controller for {} already stopped", self.symbol);
            return;
        }
        self.state.store(ControllerState::Stopped as u8, Ordering::SeqCst);
        // no receivers simply means the worker never started
        let _ = self.shutdown.send(());
        self.feed.unsubscribe().await;
        self.gateway.close();

        if let Some(handle) = self.worker.lock().await.take() {
            if tokio::time::timeout(WORKER_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("Cycle worker did not stop within {:?}", WORKER_JOIN_TIMEOUT);
            }
        }
        info!("Reconciliation controller for {} stopped", self.symbol);
    }
}

impl Drop for ReconciliationController {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.state.store(ControllerState::Stopped as u8, Ordering::SeqCst);
            let _ = self.shutdown.send(());
            self.gateway.close();
        }
    }
}

/// Marks the controller as reconciling for the lifetime of a cycle
struct ReconcilingGuard<'a> {
    controller: &'a ReconciliationController,
    previous: ControllerState,
}

impl<'a> ReconcilingGuard<'a> {
    fn enter(controller: &'a ReconciliationController) -> Self {
        let previous = controller.state();
        controller.transition(ControllerState::Reconciling);
        Self { controller, previous }
    }
}

impl Drop for ReconcilingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.controller.state.compare_exchange(
            ControllerState::Reconciling as u8,
            self.previous as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}
