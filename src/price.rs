/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Price Window Aggregator (`spec.md` §4.B): the price deque, its rolling
//! 30-day averages, and the coin-generation multiplier they drive.

use crate::log_store::record::PriceEntry;
use crate::log_store::{LogStore, Table};
use crate::params::EngineConfig;

/// Maintains the in-memory price deque and the cached multiplier, backed by
/// the `prices` table of a [`LogStore`].
pub struct PriceAggregator {
    entries: std::collections::VecDeque<PriceEntry>,
    current_multiplier: f64,
}

impl PriceAggregator {
    pub fn new() -> Self {
        Self {
            entries: std::collections::VecDeque::new(),
            current_multiplier: 1.0,
        }
    }

    /// Loads every entry from the `prices` table, in height order.
    pub fn load(&mut self, store: &impl LogStore) -> Result<(), crate::error::EngineError> {
        self.entries.clear();
        for record in store.load(Table::Prices)? {
            if let Some(entry) = PriceEntry::decode(&record) {
                self.entries.push_back(entry);
            } else {
                return Err(crate::error::EngineError::Corrupt {
                    path: std::path::PathBuf::from("prices"),
                    reason: format!("unparseable record {record:?}"),
                });
            }
        }
        Ok(())
    }

    pub fn current_multiplier(&self) -> f64 {
        self.current_multiplier
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Accepts a price observation per `spec.md` §4.B's acceptance rules.
    /// `Ok(())` covers both a fresh append and an idempotent byte-identical
    /// duplicate; both a validation failure and a monotonicity failure come
    /// back as an `Err`, neither of them fatal (`spec.md` §7).
    pub fn add_price(
        &mut self,
        store: &mut impl LogStore,
        config: &EngineConfig,
        height: u64,
        low: u64,
        high: u64,
        multiplier: f64,
    ) -> Result<(), crate::error::EngineError> {
        if low == 0 || high == 0 || low > high || multiplier < 1.0 {
            return Err(crate::error::EngineError::ValidationReject {
                low,
                high,
                multiplier,
            });
        }

        if let Some(back) = self.entries.back() {
            if height == back.height
                && back.low == low
                && back.high == high
                && back.multiplier == multiplier
            {
                tracing::warn!(height, "duplicate price observation, idempotent success");
                return Ok(());
            }
            if height <= back.height {
                return Err(crate::error::EngineError::MonotonicityReject {
                    height,
                    last_height: back.height,
                });
            }
        }

        let entry = PriceEntry {
            height,
            low,
            high,
            multiplier,
        };
        self.entries.push_back(entry);
        store.append(Table::Prices, &entry.encode()?)?;
        tracing::info!(height, low, high, multiplier, "price observation appended");

        self.prune(store, config, height)?;
        Ok(())
    }

    /// Retains exactly `120 * blocks_per_30_days + 100` blocks, rewriting
    /// the log once if anything was dropped.
    fn prune(
        &mut self,
        store: &mut impl LogStore,
        config: &EngineConfig,
        height: u64,
    ) -> Result<(), crate::error::EngineError> {
        let retention = 120 * config.blocks_per_30_days + 100;
        let Some(floor) = height.checked_sub(retention - 1) else {
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
            tracing::info!(drop_count, "pruned old price entries");
            self.rewrite(store)?;
        }
        Ok(())
    }

    fn rewrite(&self, store: &mut impl LogStore) -> Result<(), crate::error::EngineError> {
        let records = self
            .entries
            .iter()
            .map(PriceEntry::encode)
            .collect::<Result<Vec<String>, crate::error::EngineError>>()?;
        store.rewrite(Table::Prices, &records)
    }

    /// Removes a price entry matching `(height, low, high, multiplier)`
    /// exactly, walking newest-to-oldest; a no-op if no match is found
    /// (`spec.md` §4.B rollback).
    pub fn remove_price(
        &mut self,
        store: &mut impl LogStore,
        height: u64,
        low: u64,
        high: u64,
        multiplier: f64,
    ) -> Result<(), crate::error::EngineError> {
        let position = self
            .entries
            .iter()
            .rposition(|e| e.height == height && e.low == low && e.high == high && e.multiplier == multiplier);
        if let Some(index) = position {
            self.entries.remove(index);
            tracing::info!(height, "price entry removed on rollback");
        }
        self.rewrite(store)
    }

    /// Computes the four rolling 30-day averages ending at `height`, per
    /// `spec.md` §4.B. Windows are 1-indexed: `windows[0]` is the most
    /// recent 30-day window, `windows[3]` the oldest.
    fn averages(&self, config: &EngineConfig, height: u64) -> [f64; 4] {
        let mut averages = [0f64; 4];
        let period = config.blocks_per_30_days;

        for (k, average) in averages.iter_mut().enumerate() {
            let k = k as u64 + 1;
            let window_end = match height.checked_sub((k - 1) * period) {
                Some(v) => v,
                None => break,
            };
            let window_start = match (height + 1).checked_sub(k * period) {
                Some(v) => v,
                None => break,
            };
            // window not yet fully in available history
            if height + 1 < k * period {
                break;
            }

            let mut sum = 0f64;
            let mut count = 0u64;
            for entry in self.entries.iter().rev() {
                if entry.height > height {
                    continue;
                }
                if entry.height < window_start {
                    break;
                }
                if entry.height <= window_end {
                    sum += (entry.low + entry.high) as f64;
                    count += 1;
                }
            }

            if count == 0 {
                break;
            }
            *average = approximate(sum / count as f64 / 2.0);
        }
        averages
    }

    /// Recomputes the multiplier on a tick boundary, or returns the cached
    /// value otherwise. `spec.md` §4.B.
    pub fn multiplier(&mut self, config: &EngineConfig, height: u64) -> f64 {
        if config.multiplier_recalc_freq != 0 && height % config.multiplier_recalc_freq != 0 {
            return self.current_multiplier;
        }

        let [avg30, avg60, avg90, avg120] = self.averages(config, height);
        if avg60 == 0.0 {
            self.current_multiplier = 1.0;
            return 1.0;
        }

        let r30 = approximate(avg30 / avg60);
        let r60 = if avg90 > 0.0 { approximate(avg60 / avg90) } else { 0.0 };
        let r90 = if avg120 > 0.0 { approximate(avg90 / avg120) } else { 0.0 };

        let growth = growth_factor(config.epochs_per_year, r30, r60, r90);
        self.current_multiplier = approximate(self.current_multiplier * growth);
        tracing::info!(
            height,
            multiplier = self.current_multiplier,
            r30,
            r60,
            r90,
            "coin-generation multiplier recomputed"
        );
        self.current_multiplier
    }

    /// Rollback counterpart of [`PriceAggregator::multiplier`]: recovers the
    /// multiplier in effect at `height` from the log rather than
    /// recomputing it. A price entry's `multiplier` field is "in effect
    /// after this block" and persists until the next entry, so the
    /// authoritative value is the latest entry with `height <= height` (or
    /// `1.0` if none exists) — not the source's exact-height match, which
    /// falls through to a fresh recompute on every non-tick height and so
    /// can't recover the true historical value (see `DESIGN.md`).
    pub fn multiplier_on_rollback(&mut self, height: u64) -> f64 {
        let found = self
            .entries
            .iter()
            .rev()
            .find(|e| e.height <= height)
            .map(|e| e.multiplier);
        self.current_multiplier = found.unwrap_or(1.0);
        self.current_multiplier
    }
}

impl Default for PriceAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// `approximate(x)`: rounds to 10 significant figures (at most 5 decimal
/// places). `spec.md` §4.B.
pub fn approximate(x: f64) -> f64 {
    if x > 1e10 {
        return (x + 0.5).trunc();
    }
    let mut i = 0u32;
    while i < 10 {
        if 10f64.powi(i as i32 + 1) > x {
            let i = i.max(4);
            let scale = 10f64.powi(9 - i as i32);
            return ((x * scale + 0.5).trunc()) / scale;
        }
        i += 1;
    }
    x
}

/// Growth factor `g` from the §4.B decision table, evaluated over
/// already-`approximate`d ratios.
fn growth_factor(epochs_per_year: u64, r30: f64, r60: f64, r90: f64) -> f64 {
    let epochs_per_year = epochs_per_year as f64;

    if r30 >= 1.25 && r60 >= 1.25 {
        if r90 >= 1.25 {
            let m = min3(r30, r60, r90);
            return approximate(1.0 + ladder(m, &TRIPLE_LADDER) / epochs_per_year);
        }
        let m = min2(r30, r60);
        return approximate(1.0 + ladder(m, &DOUBLE_LADDER) / epochs_per_year);
    }
    if r30 >= 1.05 {
        return approximate(1.0 + ladder(r30, &SINGLE_LADDER) / epochs_per_year);
    }
    1.0
}

fn min2(a: f64, b: f64) -> f64 {
    if a >= b {
        b
    } else {
        a
    }
}

fn min3(a: f64, b: f64, c: f64) -> f64 {
    if a >= b {
        min2(c, b)
    } else {
        a
    }
}

/// One tier of a growth ladder: `threshold` is the minimum ratio for this
/// tier to apply, `base` the rate at the threshold, `slope` the per-unit
/// rate increase above it.
struct LadderTier {
    threshold: f64,
    base: f64,
    slope: f64,
}

const TRIPLE_LADDER: [LadderTier; 4] = [
    LadderTier { threshold: 1.55, base: 0.735, slope: 0.0 },
    LadderTier { threshold: 1.45, base: 0.67, slope: 0.65 },
    LadderTier { threshold: 1.35, base: 0.61, slope: 0.6 },
    LadderTier { threshold: 1.25, base: 0.55, slope: 0.6 },
];

const DOUBLE_LADDER: [LadderTier; 4] = [
    LadderTier { threshold: 1.55, base: 0.49, slope: 0.0 },
    LadderTier { threshold: 1.45, base: 0.43, slope: 0.6 },
    LadderTier { threshold: 1.35, base: 0.37, slope: 0.6 },
    LadderTier { threshold: 1.25, base: 0.31, slope: 0.6 },
];

const SINGLE_LADDER: [LadderTier; 6] = [
    LadderTier { threshold: 1.55, base: 0.25, slope: 0.0 },
    LadderTier { threshold: 1.45, base: 0.19, slope: 0.6 },
    LadderTier { threshold: 1.35, base: 0.13, slope: 0.6 },
    LadderTier { threshold: 1.25, base: 0.095, slope: 0.35 },
    LadderTier { threshold: 1.15, base: 0.06, slope: 0.35 },
    LadderTier { threshold: 1.05, base: 0.025, slope: 0.35 },
];

/// Evaluates a ladder at `m`, the already-clamped minimum ratio that
/// selected this ladder; the first tier whose threshold `m` meets wins.
fn ladder(m: f64, tiers: &[LadderTier]) -> f64 {
    for (i, tier) in tiers.iter().enumerate() {
        if m >= tier.threshold {
            return if i == 0 {
                tier.base
            } else {
                tier.base + (m - tier.threshold) * tier.slope
            };
        }
    }
    0.0
}
