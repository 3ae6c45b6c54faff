use anyhow::Result;
use log::{debug, warn};

use crate::domain::model::best_pair::{BestPair, PriceLevel};

use super::models::{DepthSnapshot, DepthUpdate};
use super::parsers::BinanceParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    Applied,
    /// Already covered by the snapshot or an earlier diff
    Stale,
    /// Updates were missed; the book must be rebuilt from a snapshot
    Gap { expected: u64, received: u64 },
}

/// Local replica of one symbol's book, rebuilt from a snapshot and kept
/// current with depth diffs. Bids are sorted descending, asks ascending.
#[derive(Debug, Clone)]
pub struct LocalOrderBook {
    symbol: String,
    bids: Vec<(f64, f64)>,
    asks: Vec<(f64, f64)>,
    last_update_id: u64,
    synced: bool,
}

impl LocalOrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            last_update_id: 0,
            synced: false,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.last_update_id = 0;
        self.synced = false;
    }

    pub fn apply_snapshot(&mut self, snapshot: &DepthSnapshot) -> Result<()> {
        self.bids.clear();
        self.asks.clear();

        for level in &snapshot.bids {
            let (price, qty) = BinanceParser::parse_level(level)?;
            Self::update_level(&mut self.bids, price, qty, true);
        }
        for level in &snapshot.asks {
            let (price, qty) = BinanceParser::parse_level(level)?;
            Self::update_level(&mut self.asks, price, qty, false);
        }

        self.last_update_id = snapshot.last_update_id;
        self.synced = true;
        debug!(
            "{} snapshot {} applied: {} bids, {} asks",
            self.symbol, self.last_update_id, self.bids.len(), self.asks.len()
        );
        Ok(())
    }

    pub fn apply_update(&mut self, update: &DepthUpdate) -> Result<DiffOutcome> {
        if update.final_update_id <= self.last_update_id {
            return Ok(DiffOutcome::Stale);
        }
        let expected = self.last_update_id + 1;
        if update.first_update_id > expected {
            warn!(
                "{} depth gap: expected update {}, received {}",
                self.symbol, expected, update.first_update_id
            );
            self.synced = false;
            return Ok(DiffOutcome::Gap { expected, received: update.first_update_id });
        }

        for level in &update.bids {
            let (price, qty) = BinanceParser::parse_level(level)?;
            Self::update_level(&mut self.bids, price, qty, true);
        }
        for level in &update.asks {
            let (price, qty) = BinanceParser::parse_level(level)?;
            Self::update_level(&mut self.asks, price, qty, false);
        }

        self.last_update_id = update.final_update_id;
        Ok(DiffOutcome::Applied)
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().map(|&(price, size)| PriceLevel::new(price, size))
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().map(|&(price, size)| PriceLevel::new(price, size))
    }

    /// None until both sides have at least one level
    pub fn best_pair(&self) -> Option<BestPair> {
        Some(BestPair::new(self.best_bid()?, self.best_ask()?))
    }

    /// Inserts, replaces or (qty == 0) removes the level at `price`
    fn update_level(levels: &mut Vec<(f64, f64)>, price: f64, qty: f64, descending: bool) {
        let position = levels.binary_search_by(|(p, _)| {
            if descending {
                price.total_cmp(p)
            } else {
                p.total_cmp(&price)
            }
        });

        match position {
            Ok(index) if qty == 0.0 => {
                levels.remove(index);
            }
            Ok(index) => levels[index].1 = qty,
            Err(_) if qty == 0.0 => {}
            Err(index) => levels.insert(index, (price, qty)),
        }
    }
}
