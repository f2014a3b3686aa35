/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Persistent Log Store (`spec.md` §4.A): three append-only tables backed by
//! fixed-width text records, with atomic rewrite-on-prune.
//!
//! [`LogStore`] is the abstraction the rest of the engine programs against;
//! [`FileLogStore`] is the production implementation (one file per table,
//! temp-file + rename for crash-safe rewrites); [`InMemoryLogStore`] backs
//! fast unit tests of the components layered on top.

pub mod record;

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::error::EngineError;
use record::{EPOCH_FEE_RECORD_WIDTH, PRICE_RECORD_WIDTH, SUPPLY_RECORD_WIDTH};

/// Identifies one of the three logical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Prices,
    TotalSupply,
    EpochFees,
}

impl Table {
    fn file_name(self) -> &'static str {
        match self {
            Table::Prices => "prices",
            Table::TotalSupply => "totalSupply",
            Table::EpochFees => "epochFees",
        }
    }

    fn record_width(self) -> usize {
        match self {
            Table::Prices => PRICE_RECORD_WIDTH,
            Table::TotalSupply => SUPPLY_RECORD_WIDTH,
            Table::EpochFees => EPOCH_FEE_RECORD_WIDTH,
        }
    }
}

/// Operations the rest of the engine needs from a table, in terms of raw
/// fixed-width text records. Each type above this trait (`price.rs`,
/// `epoch_fees.rs`, the supply handling in `engine.rs`) encodes/decodes its
/// own record type and calls through these string-level operations — this
/// mirrors `spec.md` §4.A's contract exactly, keeping table identity and
/// crash-safety concerns out of the numeric components.
pub trait LogStore {
    /// Appends one pre-encoded, fixed-width record. Fails with
    /// [`EngineError::Io`] or [`EngineError::Corrupt`] (existing content not
    /// a multiple of the table's record width).
    fn append(&mut self, table: Table, record: &str) -> Result<(), EngineError>;

    /// Truncates and rewrites a table from scratch. Used after any pruning
    /// or removal. Must leave the previous content intact if the write
    /// fails partway (write-to-temp + rename).
    fn rewrite(&mut self, table: Table, records: &[String]) -> Result<(), EngineError>;

    /// Parses the whole table in order. Fails with [`EngineError::Corrupt`]
    /// on a size mismatch or an unparseable record.
    fn load(&self, table: Table) -> Result<Vec<String>, EngineError>;
}

/// File-backed [`LogStore`]: one fixed-width text file per table in a given
/// working directory.
pub struct FileLogStore {
    dir: PathBuf,
}

impl FileLogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, table: Table) -> PathBuf {
        self.dir.join(table.file_name())
    }
}

impl LogStore for FileLogStore {
    fn append(&mut self, table: Table, record: &str) -> Result<(), EngineError> {
        let path = self.path(table);
        let width = table.record_width();

        let existing_size = match fs::metadata(&path) {
            Ok(meta) => meta.len() as usize,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => 0,
            Err(source) => return Err(EngineError::Io { path, source }),
        };
        if existing_size % width != 0 {
            return Err(EngineError::Corrupt {
                path,
                reason: format!("size {existing_size} is not a multiple of record width {width}"),
            });
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;
        file.write_all(record.as_bytes())
            .map_err(|source| EngineError::Io { path, source })?;
        tracing::info!(table = table.file_name(), "appended record");
        Ok(())
    }

    fn rewrite(&mut self, table: Table, records: &[String]) -> Result<(), EngineError> {
        let path = self.path(table);
        let tmp_path = path.with_extension("tmp");

        let mut tmp = File::create(&tmp_path).map_err(|source| EngineError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        for record in records {
            tmp.write_all(record.as_bytes())
                .map_err(|source| EngineError::Io {
                    path: tmp_path.clone(),
                    source,
                })?;
        }
        tmp.sync_all().map_err(|source| EngineError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        drop(tmp);

        fs::rename(&tmp_path, &path).map_err(|source| EngineError::Io { path, source })?;
        tracing::info!(
            table = table.file_name(),
            count = records.len(),
            "rewrote table"
        );
        Ok(())
    }

    fn load(&self, table: Table) -> Result<Vec<String>, EngineError> {
        let path = self.path(table);
        let width = table.record_width();

        let mut contents = String::new();
        match File::open(&path) {
            Ok(mut file) => {
                file.read_to_string(&mut contents)
                    .map_err(|source| EngineError::Io {
                        path: path.clone(),
                        source,
                    })?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(EngineError::Io { path, source }),
        }

        if contents.len() % width != 0 {
            return Err(EngineError::Corrupt {
                path,
                reason: format!(
                    "size {} is not a multiple of record width {width}",
                    contents.len()
                ),
            });
        }

        Ok(contents
            .as_bytes()
            .chunks(width)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect())
    }
}

/// In-memory [`LogStore`], used by unit tests of the components layered on
/// top of the store so they don't need a filesystem.
#[derive(Default)]
pub struct InMemoryLogStore {
    prices: Vec<String>,
    total_supply: Vec<String>,
    epoch_fees: Vec<String>,
}

impl InMemoryLogStore {
    fn table_mut(&mut self, table: Table) -> &mut Vec<String> {
        match table {
            Table::Prices => &mut self.prices,
            Table::TotalSupply => &mut self.total_supply,
            Table::EpochFees => &mut self.epoch_fees,
        }
    }

    fn table(&self, table: Table) -> &Vec<String> {
        match table {
            Table::Prices => &self.prices,
            Table::TotalSupply => &self.total_supply,
            Table::EpochFees => &self.epoch_fees,
        }
    }
}

impl LogStore for InMemoryLogStore {
    fn append(&mut self, table: Table, record: &str) -> Result<(), EngineError> {
        self.table_mut(table).push(record.to_string());
        Ok(())
    }

    fn rewrite(&mut self, table: Table, records: &[String]) -> Result<(), EngineError> {
        *self.table_mut(table) = records.to_vec();
        Ok(())
    }

    fn load(&self, table: Table) -> Result<Vec<String>, EngineError> {
        Ok(self.table(table).clone())
    }
}
