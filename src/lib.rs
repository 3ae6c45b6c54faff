pub mod config_loader;
pub mod domain;
pub mod infrastructure;
pub mod strategies;

pub use domain::constants::*;
pub use domain::enums::*;
pub use domain::errors::*;
pub use domain::model::best_pair::*;
pub use domain::model::exchange::*;
pub use domain::model::order::*;
pub use domain::model::quote::*;
pub use domain::traits::*;
pub use infrastructure::exchange::binance::*;
pub use strategies::spread_maker::*;
