//! # Judge Gateway
//!
//! The two `MarketDataProvider` backends: an in-memory stub over a seeded,
//! atomically swappable fixture dataset, and a remote HTTP proxy to an
//! external judge service. `config::JudgeConfig` selects between them at
//! construction time.

pub mod config;
pub mod remote;
pub mod stub;

pub use config::{JudgeConfig, JudgeMode};
pub use remote::RemoteProvider;
pub use stub::{Dataset, SharedDataset, StubProvider};
