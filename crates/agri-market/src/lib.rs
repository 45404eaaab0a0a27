//! Domain core for the AgriTrade agricultural marketplace.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
