/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Supply log management (`spec.md` §3 `SupplyEntry`, §4.D genesis install
//! and retention). Not a component in its own right per `spec.md` §2's
//! table, but large enough to deserve its own module rather than living
//! inline in [`crate::engine`].

use crate::log_store::record::SupplyEntry;
use crate::log_store::{LogStore, Table};

/// The in-memory supply deque, backed by the `totalSupply` table of a
/// [`LogStore`].
pub struct SupplyLog {
    entries: std::collections::VecDeque<SupplyEntry>,
}

impl SupplyLog {
    pub fn new() -> Self {
        Self {
            entries: std::collections::VecDeque::new(),
        }
    }

    pub fn load(&mut self, store: &impl LogStore) -> Result<(), crate::error::EngineError> {
        self.entries.clear();
        for record in store.load(Table::TotalSupply)? {
            if let Some(entry) = SupplyEntry::decode(&record) {
                self.entries.push_back(entry);
            } else {
                return Err(crate::error::EngineError::Corrupt {
                    path: std::path::PathBuf::from("totalSupply"),
                    reason: format!("unparseable record {record:?}"),
                });
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Installs the synthetic genesis entry `(0, initial_supply,
    /// initial_supply)` (`spec.md` invariant 3). Only called when both the
    /// in-memory deque and the loaded disk log are empty.
    pub fn install_genesis(&mut self, initial_supply: u64) {
        self.entries.push_back(SupplyEntry {
            height: 0,
            supply: initial_supply,
            increase: initial_supply,
        });
        tracing::info!(initial_supply, "installed synthetic genesis supply entry");
    }

    /// The latest entry with `height <= h`, per the canonical loose-`break`
    /// fix in `spec.md` §9: newest-first scan, first match wins.
    pub fn latest_at_or_before(&self, h: u64) -> Option<SupplyEntry> {
        self.entries.iter().rev().find(|e| e.height <= h).copied()
    }

    /// Appends a new checkpoint and prunes entries older than `height -
    /// 100`, rewriting once if anything was dropped. `spec.md` §4.D step 4,
    /// §4.B retention windows table.
    pub fn append(
        &mut self,
        store: &mut impl LogStore,
        entry: SupplyEntry,
    ) -> Result<(), crate::error::EngineError> {
        self.entries.push_back(entry);
        store.append(Table::TotalSupply, &entry.encode()?)?;
        self.prune(store, entry.height)
    }

    fn prune(&mut self, store: &mut impl LogStore, height: u64) -> Result<(), crate::error::EngineError> {
        // retain exactly 100 blocks: drop entries older than height - 99.
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
            let records = self
                .entries
                .iter()
                .map(SupplyEntry::encode)
                .collect::<Result<Vec<String>, crate::error::EngineError>>()?;
            store.rewrite(Table::TotalSupply, &records)?;
        }
        Ok(())
    }
}

impl Default for SupplyLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::InMemoryLogStore;

    #[test]
    fn genesis_is_found_at_or_before_any_height() {
        let mut log = SupplyLog::new();
        log.install_genesis(10_000_000_000);
        assert_eq!(log.latest_at_or_before(0).unwrap().supply, 10_000_000_000);
        assert_eq!(log.latest_at_or_before(999).unwrap().supply, 10_000_000_000);
    }

    #[test]
    fn latest_at_or_before_picks_newest_non_future_entry() {
        let mut log = SupplyLog::new();
        let mut store = InMemoryLogStore::default();
        log.install_genesis(1_000);
        log.append(&mut store, SupplyEntry { height: 5, supply: 1_010, increase: 10 }).unwrap();
        log.append(&mut store, SupplyEntry { height: 10, supply: 1_025, increase: 15 }).unwrap();

        assert_eq!(log.latest_at_or_before(0).unwrap().height, 0);
        assert_eq!(log.latest_at_or_before(7).unwrap().height, 5);
        assert_eq!(log.latest_at_or_before(10).unwrap().height, 10);
        assert_eq!(log.latest_at_or_before(1000).unwrap().height, 10);
    }

    #[test]
    fn prunes_entries_older_than_retention_window() {
        let mut log = SupplyLog::new();
        let mut store = InMemoryLogStore::default();
        log.install_genesis(0);
        for h in 1..=150 {
            log.append(&mut store, SupplyEntry { height: h, supply: h, increase: 1 }).unwrap();
        }
        // genesis (height 0) and anything older than 150-99=51 should be gone
        assert!(log.latest_at_or_before(0).is_none());
        assert!(log.latest_at_or_before(50).is_none());
        assert_eq!(log.latest_at_or_before(51).unwrap().height, 51);
    }
}
