//! # Advisor Core Library
//!
//! Shared foundation for the robo-advisor backend services.
//!
//! ## Modules
//! - `model`: Common data types (Client, Holding, PriceBar, Order) with identical serialization.
//! - `pricing`: Market-impact execution pricing.
//! - `idempotency`: Bounded first-write-wins stores for retry handling.
//! - `provider`: The `MarketDataProvider` contract shared by stub and remote backends.
//! - `engine`: The rebalance orchestration pipeline.

pub mod engine;
pub mod idempotency;
pub mod model;
pub mod pricing;
pub mod provider;
