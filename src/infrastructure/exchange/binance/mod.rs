//! Binance spot adapters: REST client, gateways and the diff-depth feed

pub mod client;
pub mod feed;
pub mod gateway;
pub mod models;
pub mod order_book;
pub mod parsers;

pub use client::{BinanceClient, BinanceKeys, Network};
pub use feed::BinanceDepthFeed;
pub use gateway::{gateway_for, LiveGateway, OrderMode, TestOrderGateway};
