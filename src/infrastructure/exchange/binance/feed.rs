use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tungstenite::Message;
use url::Url;

use crate::domain::errors::ExchangeError;
use crate::domain::model::best_pair::BestPair;
use crate::domain::traits::{BestPairSender, OrderBookFeed};

use super::client::BinanceClient;
use super::models::{DepthSnapshot, DepthUpdate};
use super::order_book::{DiffOutcome, LocalOrderBook};

/// Diffs kept while waiting for a snapshot; older ones are dropped first
const MAX_PENDING_DIFFS: usize = 2048;
const MAX_RESYNC_ATTEMPTS: u32 = 3;

struct BookState {
    book: LocalOrderBook,
    pending: VecDeque<DepthUpdate>,
    last_published: Option<BestPair>,
    depth_limit: u32,
}

struct FeedShared {
    symbol: String,
    client: Arc<BinanceClient>,
    state: Mutex<BookState>,
    listener: RwLock<Option<BestPairSender>>,
}

impl FeedShared {
    /// Buffers the diff until the book is synced, then applies it.
    /// Returns true when a resync is needed.
    async fn on_diff(&self, update: DepthUpdate) -> bool {
        let mut state = self.state.lock().await;
        if !state.book.is_synced() {
            if state.pending.len() >= MAX_PENDING_DIFFS {
                state.pending.pop_front();
            }
            state.pending.push_back(update);
            return false;
        }

        match state.book.apply_update(&update) {
            Ok(DiffOutcome::Applied) => {
                self.publish_if_changed(&mut state).await;
                false
            }
            Ok(DiffOutcome::Stale) => false,
            Ok(DiffOutcome::Gap { .. }) => {
                state.pending.push_back(update);
                true
            }
            Err(e) => {
                error!("Dropping malformed depth update: {}", e);
                false
            }
        }
    }

    /// Applies a snapshot and replays buffered diffs on top of it
    async fn apply_snapshot(&self, snapshot: DepthSnapshot) -> Result<bool, ExchangeError> {
        let mut state = self.state.lock().await;
        state
            .book
            .apply_snapshot(&snapshot)
            .map_err(|e| ExchangeError::Decode(e.to_string()))?;

        let pending = std::mem::take(&mut state.pending);
        let mut in_sync = true;
        for update in pending {
            if !in_sync {
                state.pending.push_back(update);
                continue;
            }
            match state.book.apply_update(&update) {
                Ok(DiffOutcome::Gap { .. }) => {
                    in_sync = false;
                    state.pending.push_back(update);
                }
                Ok(_) => {}
                Err(e) => error!("Dropping malformed buffered update: {}", e),
            }
        }

        if in_sync {
            self.publish_if_changed(&mut state).await;
        }
        Ok(in_sync)
    }

    async fn resync(&self) -> Result<(), ExchangeError> {
        let depth_limit = self.state.lock().await.depth_limit;
        for attempt in 1..=MAX_RESYNC_ATTEMPTS {
            let snapshot = self.client.depth(&self.symbol, depth_limit).await?;
            if self.apply_snapshot(snapshot).await? {
                info!("{} order book synced (attempt {})", self.symbol, attempt);
                return Ok(());
            }
            warn!("{} snapshot older than buffered diffs, retrying", self.symbol);
            self.state.lock().await.book.reset();
        }
        Err(ExchangeError::Transport(format!(
            "{} order book could not be synced after {} attempts",
            self.symbol, MAX_RESYNC_ATTEMPTS
        )))
    }

    async fn publish_if_changed(&self, state: &mut BookState) {
        let Some(pair) = state.book.best_pair() else {
            return;
        };
        if state.last_published == Some(pair) {
            return;
        }
        state.last_published = Some(pair);
        debug!(
            "{} best pair {}@{} / {}@{}",
            self.symbol, pair.bid.size, pair.bid.price, pair.ask.size, pair.ask.price
        );
        if let Some(listener) = self.listener.read().await.as_ref() {
            listener.send_replace(Some(pair));
        }
    }
}

/// Binance diff-depth feed maintaining a local book for one symbol
pub struct BinanceDepthFeed {
    ws_url: String,
    shared: Arc<FeedShared>,
    stream_task: Mutex<Option<JoinHandle<()>>>,
}

impl BinanceDepthFeed {
    pub fn new(symbol: impl Into<String>, ws_url: impl Into<String>, client: Arc<BinanceClient>) -> Self {
        let symbol = symbol.into();
        Self {
            ws_url: ws_url.into().trim_end_matches('/').to_string(),
            shared: Arc::new(FeedShared {
                state: Mutex::new(BookState {
                    book: LocalOrderBook::new(symbol.clone()),
                    pending: VecDeque::new(),
                    last_published: None,
                    depth_limit: crate::domain::constants::DEFAULT_DEPTH_LIMIT,
                }),
                symbol,
                client,
                listener: RwLock::new(None),
            }),
            stream_task: Mutex::new(None),
        }
    }

    /// Stream name for the requested update speed
    pub fn stream_name(symbol: &str, update_interval: Duration) -> String {
        if update_interval < Duration::from_secs(1) {
            format!("{}@depth@100ms", symbol.to_lowercase())
        } else {
            format!("{}@depth", symbol.to_lowercase())
        }
    }

    pub async fn best_pair(&self) -> Option<BestPair> {
        self.shared.state.lock().await.book.best_pair()
    }

    async fn read_stream(
        shared: Arc<FeedShared>,
        stream: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    ) {
        let (mut write, mut read) = stream.split();
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<DepthUpdate>(&text) {
                    Ok(update) => {
                        if shared.on_diff(update).await {
                            if let Err(e) = shared.resync().await {
                                error!("Order book resync failed: {}", e);
                            }
                        }
                    }
                    Err(e) => debug!("Ignoring non-depth message ({}): {}", e, text),
                },
                Ok(Message::Ping(data)) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        error!("Failed to answer ping: {}", e);
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("Depth stream closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Depth stream error: {}", e);
                    break;
                }
            }
        }
        warn!("{} depth stream ended", shared.symbol);
    }
}

#[async_trait]
impl OrderBookFeed for BinanceDepthFeed {
    async fn subscribe(&self, listener: BestPairSender) {
        *self.shared.listener.write().await = Some(listener);
    }

    async fn unsubscribe(&self) {
        self.shared.listener.write().await.take();
    }

    async fn start_streaming(&self, update_interval: Duration) -> Result<(), ExchangeError> {
        let stream = Self::stream_name(&self.shared.symbol, update_interval);
        let url = Url::parse(&format!("{}/{}", self.ws_url, stream))
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        info!("Connecting to depth stream {}", url);
        let (socket, _) = connect_async(url).await?;

        let task = tokio::spawn(Self::read_stream(self.shared.clone(), socket));
        if let Some(previous) = self.stream_task.lock().await.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn build_snapshot(&self, depth_limit: u32) -> Result<(), ExchangeError> {
        self.shared.state.lock().await.depth_limit = depth_limit;
        self.shared.resync().await
    }

    async fn stop_streaming(&self) {
        if let Some(task) = self.stream_task.lock().await.take() {
            task.abort();
            info!("{} depth stream stopped", self.shared.symbol);
        }
    }
}
