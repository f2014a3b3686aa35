/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The `AccountStateCache` collaborator (`spec.md` §6) and the account-link
//! model that "forwarded" balance resolution depends on (`spec.md` §4.D).

use std::collections::HashMap;

use crate::error::EngineError;
use crate::receipts::MosaicId;
use crate::types::{Address, AccountLink};

/// Mutable per-account state the engine credits or debits through
/// [`AccountStateCache::process_forwarded`].
pub trait MutableAccountState {
    fn credit(&mut self, mosaic_id: MosaicId, amount: u64);
    fn debit(&mut self, mosaic_id: MosaicId, amount: u64);
}

/// Host collaborator resolving an address to its "forwarded main account"
/// and invoking a closure against its mutable state (`spec.md` §6
/// `AccountStateCache.processForwarded`).
///
/// If `address` resolves to a `Remote` account, the closure must run
/// against the linked `Main` account instead. Failure to resolve (wrong
/// type, broken link) is [`EngineError::ImproperAccountLink`], fatal for
/// the block (`spec.md` §4.D, §7).
pub trait AccountStateCache {
    fn process_forwarded(
        &mut self,
        address: Address,
        f: &mut dyn FnMut(&mut dyn MutableAccountState),
    ) -> Result<(), EngineError>;
}

/// A single in-memory account: a link type plus a balance ledger, keyed by
/// [`MosaicId`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountState {
    pub link: Option<AccountLink>,
    balances: HashMap<MosaicId, u64>,
}

impl InMemoryAccountState {
    pub fn balance(&self, mosaic_id: MosaicId) -> u64 {
        *self.balances.get(&mosaic_id).unwrap_or(&0)
    }
}

impl MutableAccountState for InMemoryAccountState {
    fn credit(&mut self, mosaic_id: MosaicId, amount: u64) {
        *self.balances.entry(mosaic_id).or_insert(0) += amount;
    }

    fn debit(&mut self, mosaic_id: MosaicId, amount: u64) {
        let entry = self.balances.entry(mosaic_id).or_insert(0);
        *entry = entry.saturating_sub(amount);
    }
}

/// Reference [`AccountStateCache`] backed by a plain map, for tests and
/// hosts without a real account cache wired up yet.
#[derive(Debug, Default)]
pub struct InMemoryAccountStateCache {
    accounts: HashMap<Address, InMemoryAccountState>,
}

impl InMemoryAccountStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account with the given link type, creating it with a
    /// zero balance if it doesn't exist yet.
    pub fn set_link(&mut self, address: Address, link: AccountLink) {
        self.accounts.entry(address).or_default().link = Some(link);
    }

    pub fn account(&self, address: &Address) -> Option<&InMemoryAccountState> {
        self.accounts.get(address)
    }

    pub fn balance(&self, address: &Address, mosaic_id: MosaicId) -> u64 {
        self.accounts
            .get(address)
            .map(|a| a.balance(mosaic_id))
            .unwrap_or(0)
    }
}

impl AccountStateCache for InMemoryAccountStateCache {
    fn process_forwarded(
        &mut self,
        address: Address,
        f: &mut dyn FnMut(&mut dyn MutableAccountState),
    ) -> Result<(), EngineError> {
        let target = match self.accounts.get(&address).and_then(|a| a.link) {
            None | Some(AccountLink::Unlinked) => {
                // Unknown/unlinked accounts default to acting as their own
                // main account: a harvester or beneficiary address need not
                // have been seen before to receive a reward.
                address
            }
            Some(AccountLink::Main) => address,
            Some(AccountLink::Remote(main)) => {
                match self.accounts.get(&main).and_then(|a| a.link) {
                    Some(AccountLink::Main) | None => main,
                    _ => {
                        return Err(EngineError::ImproperAccountLink {
                            address: crate::types::hex_address(&address),
                        })
                    }
                }
            }
        };

        let account = self.accounts.entry(target).or_default();
        f(account);
        Ok(())
    }
}
