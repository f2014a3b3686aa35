/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the engine's configuration surface (`spec.md` §6). Building an
//! [`EngineConfig`] from a node's on-disk configuration is the host's job —
//! this module only defines the shape and the documented defaults.

use crate::receipts::MosaicId;
use crate::types::{Address, PublicKey};

/// Immutable configuration held by [`crate::engine::Engine`] for its entire
/// lifetime, matching the `EngineState`'s configuration fields in
/// `spec.md` §3.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Absolute upper bound on circulating supply.
    pub supply_cap: u64,
    /// Supply installed by the synthetic genesis [`crate::log_store::record::SupplyEntry`].
    pub initial_supply: u64,
    /// Number of blocks approximating 30 days, the unit the price windows
    /// are expressed in.
    pub blocks_per_30_days: u64,
    /// Number of blocks over which fees are pooled before being frozen into
    /// the next epoch's per-block dividend.
    pub fee_recalc_freq: u64,
    /// Number of blocks between coin-generation multiplier recomputations.
    pub multiplier_recalc_freq: u64,
    /// Number of epochs (of `fee_recalc_freq` blocks) in a year; the
    /// denominator the growth-rate ladders convert into a per-block rate.
    pub epochs_per_year: u64,
    /// The only public key whose price messages are accepted.
    pub publisher_public_key: PublicKey,
    /// Asset id used for every balance delta and receipt the engine emits.
    pub currency_mosaic_id: MosaicId,
    /// Percentage (0..=100) of the combined reward routed to the network
    /// sink address.
    pub harvest_network_percentage: u8,
    /// Percentage (0..=100) of the combined reward routed to the
    /// beneficiary, when the beneficiary differs from the harvester.
    pub harvest_beneficiary_percentage: u8,
    /// Height-dependent network fee sink address table.
    pub harvest_network_fee_sink_address: SinkAddressTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            supply_cap: 100_000_000_000,
            initial_supply: 10_000_000_000,
            blocks_per_30_days: 86_400,
            fee_recalc_freq: 10,
            multiplier_recalc_freq: 5,
            epochs_per_year: 1460,
            publisher_public_key: [0u8; 32],
            currency_mosaic_id: 0,
            harvest_network_percentage: 0,
            harvest_beneficiary_percentage: 0,
            harvest_network_fee_sink_address: SinkAddressTable::default(),
        }
    }
}

/// A height-dependent lookup table for the network fee sink address.
///
/// `spec.md` §4.D describes this as "a function `H → address` implemented as
/// a list of `(sinceHeight, address)` pairs; the sink at `H` is the address
/// with largest `sinceHeight ≤ H`". Entries need not be supplied in sorted
/// order; [`SinkAddressTable::sink_at`] sorts lazily on first lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkAddressTable {
    entries: Vec<(u64, Address)>,
}

impl SinkAddressTable {
    pub fn new(mut entries: Vec<(u64, Address)>) -> Self {
        entries.sort_by_key(|(since_height, _)| *since_height);
        Self { entries }
    }

    /// Returns the address with the largest `since_height <= height`, or
    /// `None` if no entry qualifies (e.g. the table is empty, or `height` is
    /// below every configured `since_height`).
    pub fn sink_at(&self, height: u64) -> Option<Address> {
        self.entries
            .iter()
            .rev()
            .find(|(since_height, _)| *since_height <= height)
            .map(|(_, address)| *address)
    }
}
