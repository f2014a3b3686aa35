/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines common data structures shared across the engine: addresses, the
//! two notification shapes the host delivers, and the account-link model
//! that "forwarded" balance resolution depends on.

use std::fmt;

/// 32-byte account address. Address derivation and signature verification
/// are the host's responsibility; the engine only ever compares addresses
/// for equality and renders them as hex for the persisted logs.
pub type Address = [u8; 32];

/// 32-byte Ed25519-style public key, used only to compare against the
/// configured price publisher.
pub type PublicKey = [u8; 32];

/// Observer mode carried by every notification: whether a block is being
/// applied or undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    Commit,
    Rollback,
}

/// Notification delivered once per block to [`crate::engine::Engine::on_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockNotification {
    pub height: u64,
    pub harvester: Address,
    pub beneficiary: Address,
    pub total_fee: u64,
}

/// Notification delivered for an (optional) signed price observation carried
/// by a block, to [`crate::engine::Engine::on_price_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceMessageNotification {
    pub sender_public_key: PublicKey,
    pub block_height: u64,
    pub low_price: u64,
    pub high_price: u64,
}

/// The link type of an account, as tracked by the host's account cache.
///
/// A `Remote` account delegates harvesting to a `Main` account; credits
/// addressed to a `Remote` must be forwarded to its linked `Main`. This
/// mirrors the "forwarded account" rule in `spec.md` §4.D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLink {
    Unlinked,
    Main,
    Remote(Address),
}

impl fmt::Display for AccountLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountLink::Unlinked => write!(f, "unlinked"),
            AccountLink::Main => write!(f, "main"),
            AccountLink::Remote(main) => write!(f, "remote->{}", hex_address(main)),
        }
    }
}

/// Renders an [`Address`] as lowercase hex, matching the 64-byte fixed-width
/// `harvester` field of the epoch-fees log.
pub fn hex_address(address: &Address) -> String {
    let mut out = String::with_capacity(64);
    for byte in address {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Parses a lowercase hex address back into 32 bytes. Used when decoding the
/// epoch-fees log.
pub fn parse_hex_address(hex: &str) -> Option<Address> {
    if hex.len() != 64 {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, chunk) in out.iter_mut().enumerate() {
        *chunk = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_address_round_trips() {
        let mut addr = [0u8; 32];
        for (i, b) in addr.iter_mut().enumerate() {
            *b = i as u8;
        }
        let hex = hex_address(&addr);
        assert_eq!(hex.len(), 64);
        assert_eq!(parse_hex_address(&hex), Some(addr));
    }
}
