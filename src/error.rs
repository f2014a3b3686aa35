/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines a set of descriptive error definitions arising from engine
//! operations.
//!
//! Engine errors are returned by the failure paths in `spec.md` §7, for
//! processes hosting the engine to differentiate between failure modes.
//! Only the two fatal kinds ever surface as an `Err` from
//! [`crate::engine::Engine`]'s public entry points: [`EngineError::Corrupt`]
//! and [`EngineError::ImproperAccountLink`]. The remaining kinds are logged
//! internally and absorbed (see each kind's doc for why).

use std::path::PathBuf;

/// Descriptive error definitions arising from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A price transaction carried `low == 0`, `high == 0`, or `low > high`,
    /// or a `multiplier < 1.0`. Never fatal: the price message is simply not
    /// recorded, the block is unaffected.
    #[error("price observation rejected: low={low}, high={high}, multiplier={multiplier}")]
    ValidationReject {
        low: u64,
        high: u64,
        multiplier: f64,
    },

    /// An attempted log append used a height that does not strictly exceed
    /// the table's back entry, and was not a byte-identical duplicate of it.
    /// Never fatal: logged and ignored, the append is silently skipped.
    #[error("height {height} is not strictly greater than the log's last height {last_height}")]
    MonotonicityReject { height: u64, last_height: u64 },

    /// A log file's size is not a multiple of its record width, or a record
    /// could not be parsed. Fatal: the engine refuses to start.
    #[error("log file {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// An I/O failure while appending, rewriting, or loading a log file.
    /// Fatal in the same way as [`EngineError::Corrupt`].
    #[error("I/O failure on log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An epoch-fee log entry expected to exist during rollback was not
    /// found. Soft error: the engine logs it and continues with a
    /// zero-filled value, matching the source's behavior (a chain
    /// re-organization may legitimately precede the first time a height was
    /// observed). The equivalent supply-log case (`engine.rs`'s
    /// `rollback_block`) logs and zero-fills inline instead of constructing
    /// this variant, since the supply log is never popped and so has no
    /// separate "missing entry" error path to report through.
    #[error("expected {table} entry for height {height} was not found during rollback")]
    LookupMissingOnRollback { table: &'static str, height: u64 },

    /// Resolving a harvester or beneficiary's "forwarded main account"
    /// failed: the address links to neither a usable `Main` account nor a
    /// `Remote` account with a valid `Main` link. Fatal for the block.
    #[error("account link resolution failed for address {address}")]
    ImproperAccountLink { address: String },
}

impl EngineError {
    /// Whether this error must abort block application (`true`) or is a
    /// soft error the engine absorbs after logging (`false`).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Corrupt { .. } | EngineError::Io { .. } | EngineError::ImproperAccountLink { .. }
        )
    }
}
