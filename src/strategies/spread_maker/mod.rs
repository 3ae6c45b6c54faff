//! Spread maker strategy module
//!
//! Keeps a single resting limit order in line with the top of the book:
//! every best bid/ask change cancels what is open and places a fresh quote.

mod config;
mod order_manager;
pub mod controller; // contains ReconciliationController runner
pub mod pricing;


// Re-export core strategy components
pub use config::ControllerSettings;
pub use controller::{ConnectivityStatus, ControllerBuilder, ControllerState, CycleOutcome, ReconciliationController};
pub use order_manager::{CancelSummary, OrderManager};
pub use pricing::{build_strategy, MidPriceStrategy, PennyJumpStrategy, QuoteParams, StrategyKind};
