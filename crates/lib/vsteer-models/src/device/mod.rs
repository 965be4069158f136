pub mod aggregator;
pub mod mobility;
pub mod power;
pub mod reporter;
