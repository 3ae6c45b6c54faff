// Domain model for the top of the order book

/// Price and resting size at one level of the book
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

impl PriceLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

/// Best bid and best ask of a symbol at one instant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestPair {
    pub bid: PriceLevel,
    pub ask: PriceLevel,
}

impl BestPair {
    pub fn new(bid: PriceLevel, ask: PriceLevel) -> Self {
        Self { bid, ask }
    }

    pub fn mid(&self) -> f64 {
        (self.bid.price + self.ask.price) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask.price - self.bid.price
    }

    /// Both sides populated and not crossed
    pub fn is_tradeable(&self) -> bool {
        self.bid.price > 0.0 && self.ask.price > 0.0 && self.bid.price < self.ask.price
    }
}
