/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! `symbol-monetary-engine` is the supply-demand monetary engine of a
//! proof-of-stake-style blockchain plugin.
//!
//! ## What it does
//!
//! On every block a node commits (or rolls back), the engine:
//! - ingests an authenticated off-chain price observation, if the block
//!   carries one ([`Engine::on_price_message`]);
//! - derives a coin-generation (inflation) multiplier from sliding-window
//!   price averages ([`price::PriceAggregator`]);
//! - freezes the per-block fee dividend payable from an accumulating fee
//!   pool ([`epoch_fees::EpochFeeAccumulator`]);
//! - mints new supply up to a hard cap, and partitions the combined
//!   (inflation + fee) reward among harvester, beneficiary, and network-sink
//!   accounts, emitting auditable receipts ([`Engine::on_block`]).
//!
//! Every transition is exactly reversible: rolling back a block or a price
//! observation restores the engine's three append-only logs (prices, total
//! supply, epoch fees) and its two cached scalars (current multiplier, fee
//! to pay) to their prior state.
//!
//! ## Usage
//!
//! ```rust
//! use symbol_monetary_engine::{
//!     account_cache::InMemoryAccountStateCache,
//!     engine::Engine,
//!     log_store::InMemoryLogStore,
//!     params::EngineConfig,
//!     receipts::InMemoryStatementBuilder,
//!     types::{BlockNotification, NotifyMode},
//! };
//!
//! let mut engine = Engine::new(InMemoryLogStore::default(), EngineConfig::default());
//! let mut cache = InMemoryAccountStateCache::new();
//! let mut statements = InMemoryStatementBuilder::new();
//!
//! let notification = BlockNotification {
//!     height: 1,
//!     harvester: [1u8; 32],
//!     beneficiary: [2u8; 32],
//!     total_fee: 100,
//! };
//! engine
//!     .on_block(notification, NotifyMode::Commit, &mut cache, &mut statements)
//!     .unwrap();
//! ```

pub mod account_cache;
pub mod engine;
pub use engine::Engine;

pub mod epoch_fees;

pub mod error;
pub use error::EngineError;

pub mod log_store;

pub mod params;
pub use params::{EngineConfig, SinkAddressTable};

pub mod price;

pub mod receipts;

pub mod supply;

pub mod types;
pub use types::{AccountLink, Address, BlockNotification, NotifyMode, PriceMessageNotification};
