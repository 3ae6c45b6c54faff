pub mod spread_maker;
