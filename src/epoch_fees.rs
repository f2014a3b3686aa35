/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Epoch Fee Accumulator (`spec.md` §4.C): pools per-block fees into an
//! epoch, then freezes their average as the next epoch's per-block
//! dividend.

use crate::log_store::record::EpochFeeEntry;
use crate::log_store::{LogStore, Table};
use crate::params::EngineConfig;
use crate::types::Address;

/// Maintains the in-memory epoch-fee deque and the cached dividend, backed
/// by the `epochFees` table of a [`LogStore`].
pub struct EpochFeeAccumulator {
    entries: std::collections::VecDeque<EpochFeeEntry>,
    fee_to_pay: u64,
}

impl EpochFeeAccumulator {
    pub fn new() -> Self {
        Self {
            entries: std::collections::VecDeque::new(),
            fee_to_pay: 0,
        }
    }

    pub fn load(&mut self, store: &impl LogStore) -> Result<(), crate::error::EngineError> {
        self.entries.clear();
        for record in store.load(Table::EpochFees)? {
            if let Some(entry) = EpochFeeEntry::decode(&record) {
                self.entries.push_back(entry);
            } else {
                return Err(crate::error::EngineError::Corrupt {
                    path: std::path::PathBuf::from("epochFees"),
                    reason: format!("unparseable record {record:?}"),
                });
            }
        }
        if let Some(back) = self.entries.back() {
            self.fee_to_pay = back.dividend;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fee_to_pay(&self) -> u64 {
        self.fee_to_pay
    }

    /// The most recently appended entry, without removing it. Used by the
    /// reward distributor to recover the authoritative `(height, dividend,
    /// collected, harvester)` tuple for a block being rolled back, since by
    /// the strict LIFO discipline of commit/rollback the back entry is
    /// always the one for the height currently being undone.
    pub fn peek_back(&self) -> Option<EpochFeeEntry> {
        self.entries.back().copied()
    }

    /// Per-block commit update (`spec.md` §4.C). Returns the `collected`
    /// value written into the new entry, which the reward distributor
    /// echoes into its own bookkeeping.
    pub fn on_commit(
        &mut self,
        store: &mut impl LogStore,
        config: &EngineConfig,
        height: u64,
        total_fee: u64,
        harvester: Address,
    ) -> Result<(u64, u64), crate::error::EngineError> {
        let dividend = if config.fee_recalc_freq != 0
            && height % config.fee_recalc_freq == 0
            && !self.entries.is_empty()
        {
            let back = self.entries.back().unwrap();
            if back.height != height.saturating_sub(1) {
                tracing::error!(
                    height,
                    expected_predecessor = height.saturating_sub(1),
                    actual_predecessor = back.height,
                    "missing epochFees predecessor record"
                );
            }
            round_div(back.collected, config.fee_recalc_freq)
        } else {
            self.fee_to_pay
        };

        let collected = self.entries.back().map(|e| e.collected).unwrap_or(0) + total_fee;

        let entry = EpochFeeEntry {
            height,
            collected,
            dividend,
            harvester,
        };
        self.entries.push_back(entry);
        store.append(Table::EpochFees, &entry.encode()?)?;
        self.fee_to_pay = dividend;
        self.prune(store, height)?;

        tracing::info!(height, collected, dividend, "epoch fee entry appended");
        Ok((collected, dividend))
    }

    /// Rollback counterpart: locates the entry matching
    /// `(height, dividend, harvester)`, pops it, and restores `fee_to_pay`
    /// from the new back entry (`spec.md` §4.C rollback).
    ///
    /// Returns the removed entry's `collected` value, which the reward
    /// distributor treats as authoritative rather than recomputing.
    pub fn on_rollback(
        &mut self,
        store: &mut impl LogStore,
        height: u64,
        dividend: u64,
        harvester: Address,
    ) -> Result<u64, crate::error::EngineError> {
        let position = self.entries.iter().rposition(|e| {
            e.height == height && e.dividend == dividend && e.harvester == harvester
        });

        let collected = match position {
            Some(index) => {
                let removed = self.entries.remove(index).unwrap();
                removed.collected
            }
            None => {
                tracing::error!(height, "expected epochFees entry not found during rollback");
                return Err(crate::error::EngineError::LookupMissingOnRollback {
                    table: "epochFees",
                    height,
                });
            }
        };

        self.fee_to_pay = self.entries.back().map(|e| e.dividend).unwrap_or(0);
        let records = self.records()?;
        store.rewrite(Table::EpochFees, &records)?;
        Ok(collected)
    }

    /// Retains exactly 100 blocks, rewriting once if anything was dropped.
    fn prune(&mut self, store: &mut impl LogStore, height: u64) -> Result<(), crate::error::EngineError> {
        let Some(floor) = height.checked_sub(99) else {
            return Ok(());
        };
        let mut drop_count = 0;
        while let Some(front) = self.entries.front() {
            if front.height < floor {
                drop_count += 1;
                self.entries.pop_front();
            } else {
                break;
            }
        }
        if drop_count > 0 {
            let records = self.records()?;
            store.rewrite(Table::EpochFees, &records)?;
        }
        Ok(())
    }

    fn records(&self) -> Result<Vec<String>, crate::error::EngineError> {
        self.entries.iter().map(EpochFeeEntry::encode).collect()
    }
}

impl Default for EpochFeeAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounds `a / b` to the nearest integer (half away from zero), matching
/// the source's `static_cast<uint64_t>(x + 0.5)` idiom.
fn round_div(a: u64, b: u64) -> u64 {
    ((a as f64) / (b as f64) + 0.5) as u64
}
