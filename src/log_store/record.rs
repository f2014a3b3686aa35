/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fixed-width text records for the three append-only tables (`spec.md`
//! §4.A), and the encode/decode logic shared by every [`super::LogStore`]
//! implementation.

use crate::error::EngineError;
use crate::types::{hex_address, parse_hex_address, Address};

/// Widths, in bytes, of each field of the `prices` table. Total record
/// width is the sum: 50.
pub const PRICE_FIELD_WIDTHS: [usize; 4] = [10, 15, 15, 10];
/// Widths, in bytes, of each field of the `totalSupply` table. Total record
/// width is the sum: 34.
pub const SUPPLY_FIELD_WIDTHS: [usize; 3] = [10, 12, 12];
/// Widths, in bytes, of each field of the `epochFees` table. Total record
/// width is the sum: 98. The 64-byte `harvester` field is a hex-encoded
/// 32-byte [`Address`] — see `DESIGN.md` for why this resolves the §9 open
/// question on that field's width.
pub const EPOCH_FEE_FIELD_WIDTHS: [usize; 4] = [10, 12, 12, 64];

pub const PRICE_RECORD_WIDTH: usize = sum(&PRICE_FIELD_WIDTHS);
pub const SUPPLY_RECORD_WIDTH: usize = sum(&SUPPLY_FIELD_WIDTHS);
pub const EPOCH_FEE_RECORD_WIDTH: usize = sum(&EPOCH_FEE_FIELD_WIDTHS);

const fn sum(widths: &[usize]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < widths.len() {
        total += widths[i];
        i += 1;
    }
    total
}

/// Left-justifies `value` within `width` bytes, padding with spaces on the
/// right. Returns [`EngineError::Corrupt`] if `value` does not fit, rather
/// than panicking — a value outside its documented range (`spec.md` §4.A)
/// is a data problem the caller should be able to propagate, not a bug to
/// crash on.
fn pad_field(value: &str, width: usize) -> Result<String, EngineError> {
    if value.len() > width {
        return Err(EngineError::Corrupt {
            path: std::path::PathBuf::new(),
            reason: format!("field {value:?} does not fit within {width} bytes"),
        });
    }
    let mut field = String::with_capacity(width);
    field.push_str(value);
    for _ in value.len()..width {
        field.push(' ');
    }
    Ok(field)
}

/// One accepted price observation (`spec.md` §3 `PriceEntry`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub height: u64,
    pub low: u64,
    pub high: u64,
    /// The coin-generation multiplier in effect after this block, rounded
    /// per `approximate` (`spec.md` §4.B).
    pub multiplier: f64,
}

impl PriceEntry {
    pub fn encode(&self) -> Result<String, EngineError> {
        let fields = [
            self.height.to_string(),
            self.low.to_string(),
            self.high.to_string(),
            self.multiplier.to_string(),
        ];
        let mut record = String::with_capacity(PRICE_RECORD_WIDTH);
        for (value, width) in fields.iter().zip(PRICE_FIELD_WIDTHS) {
            record.push_str(&pad_field(value, width)?);
        }
        Ok(record)
    }

    pub fn decode(record: &str) -> Option<Self> {
        let mut offset = 0;
        let mut fields = Vec::with_capacity(4);
        for width in PRICE_FIELD_WIDTHS {
            fields.push(record.get(offset..offset + width)?.trim());
            offset += width;
        }
        Some(Self {
            height: fields[0].parse().ok()?,
            low: fields[1].parse().ok()?,
            high: fields[2].parse().ok()?,
            multiplier: fields[3].parse().ok()?,
        })
    }
}

/// Per-block checkpoint of circulating supply (`spec.md` §3 `SupplyEntry`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyEntry {
    pub height: u64,
    pub supply: u64,
    pub increase: u64,
}

impl SupplyEntry {
    pub fn encode(&self) -> Result<String, EngineError> {
        let fields = [
            self.height.to_string(),
            self.supply.to_string(),
            self.increase.to_string(),
        ];
        let mut record = String::with_capacity(SUPPLY_RECORD_WIDTH);
        for (value, width) in fields.iter().zip(SUPPLY_FIELD_WIDTHS) {
            record.push_str(&pad_field(value, width)?);
        }
        Ok(record)
    }

    pub fn decode(record: &str) -> Option<Self> {
        let mut offset = 0;
        let mut fields = Vec::with_capacity(3);
        for width in SUPPLY_FIELD_WIDTHS {
            fields.push(record.get(offset..offset + width)?.trim());
            offset += width;
        }
        Some(Self {
            height: fields[0].parse().ok()?,
            supply: fields[1].parse().ok()?,
            increase: fields[2].parse().ok()?,
        })
    }
}

/// Per-block fee accumulator checkpoint (`spec.md` §3 `EpochFeeEntry`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochFeeEntry {
    pub height: u64,
    pub collected: u64,
    pub dividend: u64,
    pub harvester: Address,
}

impl EpochFeeEntry {
    pub fn encode(&self) -> Result<String, EngineError> {
        let fields = [
            self.height.to_string(),
            self.collected.to_string(),
            self.dividend.to_string(),
            hex_address(&self.harvester),
        ];
        let mut record = String::with_capacity(EPOCH_FEE_RECORD_WIDTH);
        for (value, width) in fields.iter().zip(EPOCH_FEE_FIELD_WIDTHS) {
            record.push_str(&pad_field(value, width)?);
        }
        Ok(record)
    }

    pub fn decode(record: &str) -> Option<Self> {
        let mut offset = 0;
        let mut fields = Vec::with_capacity(4);
        for width in EPOCH_FEE_FIELD_WIDTHS {
            fields.push(record.get(offset..offset + width)?.trim());
            offset += width;
        }
        Some(Self {
            height: fields[0].parse().ok()?,
            collected: fields[1].parse().ok()?,
            dividend: fields[2].parse().ok()?,
            harvester: parse_hex_address(fields[3])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_entry_round_trips() {
        let entry = PriceEntry {
            height: 12_345,
            low: 100,
            high: 200,
            multiplier: 1.07349,
        };
        let record = entry.encode().unwrap();
        assert_eq!(record.len(), PRICE_RECORD_WIDTH);
        assert_eq!(PriceEntry::decode(&record), Some(entry));
    }

    #[test]
    fn supply_entry_round_trips() {
        let entry = SupplyEntry {
            height: 1,
            supply: 10_000_000_000,
            increase: 60,
        };
        let record = entry.encode().unwrap();
        assert_eq!(record.len(), SUPPLY_RECORD_WIDTH);
        assert_eq!(SupplyEntry::decode(&record), Some(entry));
    }

    #[test]
    fn epoch_fee_entry_round_trips() {
        let entry = EpochFeeEntry {
            height: 555,
            collected: 123,
            dividend: 20,
            harvester: [7u8; 32],
        };
        let record = entry.encode().unwrap();
        assert_eq!(record.len(), EPOCH_FEE_RECORD_WIDTH);
        assert_eq!(EpochFeeEntry::decode(&record), Some(entry));
    }

    #[test]
    fn encode_reports_corrupt_instead_of_panicking_on_overflow() {
        // a supply value wider than its 12-byte field must not panic.
        let entry = SupplyEntry {
            height: 1,
            supply: u64::MAX,
            increase: u64::MAX,
        };
        assert!(matches!(entry.encode(), Err(EngineError::Corrupt { .. })));
    }
}
