pub mod best_pair;
pub mod exchange;
pub mod order;
pub mod quote;
