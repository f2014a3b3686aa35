/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Receipt shapes and the `StatementBuilder` collaborator (`spec.md` §6).
//!
//! Receipts are the engine's only observable commit-path output besides
//! balance changes: one per nonzero distribution share, plus one inflation
//! receipt per commit when `infl > 0`. The engine never emits a receipt on
//! rollback.

use crate::types::Address;

/// Asset id used for every balance delta and receipt the engine emits. The
/// host's mosaic/asset registry owns the type; the engine only threads it
/// through opaquely.
pub type MosaicId = u64;

/// `BalanceChangeReceipt` from `spec.md` §6: one per nonzero harvester,
/// sink, or beneficiary distribution share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChangeReceipt {
    pub version: u8,
    pub address: Address,
    pub mosaic_id: MosaicId,
    pub amount: u64,
}

/// `InflationReceipt` from `spec.md` §6: emitted once per commit when
/// `infl > 0`, independent of how the resulting total was later split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflationReceipt {
    pub version: u8,
    pub mosaic_id: MosaicId,
    pub amount: u64,
}

/// A receipt emitted into the block's audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    HarvestFee(BalanceChangeReceipt),
    Inflation(InflationReceipt),
}

/// Host collaborator that appends receipts to the block's audit log
/// (`spec.md` §6 `StatementBuilder`).
pub trait StatementBuilder {
    fn add_receipt(&mut self, receipt: Receipt);
}

/// Reference [`StatementBuilder`] that simply records receipts in order, for
/// use in tests and by hosts that don't yet have a statement builder wired
/// up.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStatementBuilder {
    pub receipts: Vec<Receipt>,
}

impl StatementBuilder for InMemoryStatementBuilder {
    fn add_receipt(&mut self, receipt: Receipt) {
        self.receipts.push(receipt);
    }
}

impl InMemoryStatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.receipts.clear();
    }
}
