/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The Reward Distributor (`spec.md` §4.D) and the owned [`Engine`] value
//! that wires every component together (`spec.md` §5's single-owner
//! redesign, §9).

use crate::account_cache::AccountStateCache;
use crate::epoch_fees::EpochFeeAccumulator;
use crate::error::EngineError;
use crate::log_store::record::SupplyEntry;
use crate::log_store::LogStore;
use crate::params::EngineConfig;
use crate::price::PriceAggregator;
use crate::receipts::{BalanceChangeReceipt, InflationReceipt, Receipt, StatementBuilder};
use crate::supply::SupplyLog;
use crate::types::{Address, BlockNotification, NotifyMode, PriceMessageNotification};

/// Owned engine state: the three components, their log store, and the
/// immutable configuration — never a namespace-level global (`spec.md`
/// §5, §9).
pub struct Engine<L: LogStore> {
    store: L,
    config: EngineConfig,
    price: PriceAggregator,
    epoch_fees: EpochFeeAccumulator,
    supply: SupplyLog,
}

impl<L: LogStore> Engine<L> {
    pub fn new(store: L, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            price: PriceAggregator::new(),
            epoch_fees: EpochFeeAccumulator::new(),
            supply: SupplyLog::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lazy-init: if the supply deque is empty, load all three logs from
    /// disk; if still empty after that, install the genesis entry
    /// (`spec.md` §4.D step 1, invariant 3).
    fn ensure_loaded(&mut self) -> Result<(), EngineError> {
        if !self.supply.is_empty() {
            return Ok(());
        }
        self.epoch_fees.load(&self.store)?;
        self.price.load(&self.store)?;
        self.supply.load(&self.store)?;
        if self.supply.is_empty() {
            self.supply.install_genesis(self.config.initial_supply);
        }
        Ok(())
    }

    /// Accepts or rejects a signed price observation (`spec.md` §6
    /// `onPriceMessage`). Only the configured publisher's observations are
    /// considered; others are silently ignored (authentication is the
    /// host's job before this is ever called, but the check is cheap
    /// insurance matching the source's `pricePublisherAddress` gate).
    pub fn on_price_message(
        &mut self,
        notification: PriceMessageNotification,
        mode: NotifyMode,
    ) -> Result<(), EngineError> {
        if notification.sender_public_key != self.config.publisher_public_key {
            tracing::warn!("price message from unrecognized publisher ignored");
            return Ok(());
        }

        match mode {
            NotifyMode::Commit => {
                let multiplier = self.price.multiplier(&self.config, notification.block_height);
                match self.price.add_price(
                    &mut self.store,
                    &self.config,
                    notification.block_height,
                    notification.low_price,
                    notification.high_price,
                    multiplier,
                ) {
                    Ok(_) => Ok(()),
                    Err(err) if !err.is_fatal() => {
                        tracing::warn!(%err, "price observation rejected");
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            NotifyMode::Rollback => {
                let multiplier = self.price.multiplier(&self.config, notification.block_height);
                self.price.remove_price(
                    &mut self.store,
                    notification.block_height,
                    notification.low_price,
                    notification.high_price,
                    multiplier,
                )
            }
        }
    }

    /// Applies or undoes a block's monetary effects (`spec.md` §6
    /// `onBlock`, §4.D commit/rollback algorithms).
    pub fn on_block(
        &mut self,
        notification: BlockNotification,
        mode: NotifyMode,
        cache: &mut impl AccountStateCache,
        statement: &mut impl StatementBuilder,
    ) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        match mode {
            NotifyMode::Commit => self.commit_block(notification, cache, statement),
            NotifyMode::Rollback => self.rollback_block(notification, cache),
        }
    }

    fn commit_block(
        &mut self,
        notification: BlockNotification,
        cache: &mut impl AccountStateCache,
        statement: &mut impl StatementBuilder,
    ) -> Result<(), EngineError> {
        let height = notification.height;

        // idempotent: a commit already recorded at this height is a no-op.
        if let Some(back) = self.supply.latest_at_or_before(height) {
            if back.height == height {
                tracing::info!(height, "duplicate commit, idempotent no-op");
                return Ok(());
            }
        }

        let multiplier = self.price.multiplier(&self.config, height);
        let prior_supply = self
            .supply
            .latest_at_or_before(height)
            .map(|e| e.supply)
            .unwrap_or(0);

        let mut inflation = round_to_u64(prior_supply as f64 * multiplier / BLOCK_REWARD_DIVISOR);
        if prior_supply + inflation > self.config.supply_cap {
            inflation = self.config.supply_cap - prior_supply;
        }

        let (_collected, dividend) = self.epoch_fees.on_commit(
            &mut self.store,
            &self.config,
            height,
            notification.total_fee,
            notification.harvester,
        )?;

        self.supply.append(
            &mut self.store,
            SupplyEntry {
                height,
                supply: prior_supply + inflation,
                increase: inflation,
            },
        )?;

        let total = inflation + dividend;
        let (harv, net, ben) = partition(
            total,
            &self.config,
            notification.harvester,
            notification.beneficiary,
        );
        let sink = self
            .config
            .harvest_network_fee_sink_address
            .sink_at(height);

        apply_credit(cache, notification.harvester, self.config.currency_mosaic_id, harv)?;
        emit_balance_receipt(statement, notification.harvester, self.config.currency_mosaic_id, harv);

        if net > 0 {
            if let Some(sink) = sink {
                apply_credit(cache, sink, self.config.currency_mosaic_id, net)?;
                emit_balance_receipt(statement, sink, self.config.currency_mosaic_id, net);
            } else {
                tracing::error!(height, "no network fee sink address configured for height");
            }
        }

        if ben > 0 {
            apply_credit(cache, notification.beneficiary, self.config.currency_mosaic_id, ben)?;
            emit_balance_receipt(statement, notification.beneficiary, self.config.currency_mosaic_id, ben);
        }

        if inflation > 0 {
            statement.add_receipt(Receipt::Inflation(InflationReceipt {
                version: 1,
                mosaic_id: self.config.currency_mosaic_id,
                amount: inflation,
            }));
        }

        Ok(())
    }

    fn rollback_block(
        &mut self,
        notification: BlockNotification,
        cache: &mut impl AccountStateCache,
    ) -> Result<(), EngineError> {
        let height = notification.height;

        // idempotent: if the epoch-fee entry for this height is already
        // gone, this height was already rolled back (or never committed).
        let epoch_entry = self.epoch_fees.peek_back();
        let already_rolled_back = match epoch_entry {
            Some(entry) => entry.height != height || entry.harvester != notification.harvester,
            None => true,
        };
        if already_rolled_back {
            tracing::info!(height, "nothing to roll back at this height, idempotent no-op");
            return Ok(());
        }
        let epoch_entry = epoch_entry.unwrap();

        // restores the component's cached scalar; the authoritative inflation
        // value for the partition comes from the supply log itself below.
        let _ = self.price.multiplier_on_rollback(height);
        let dividend = epoch_entry.dividend;
        match self
            .epoch_fees
            .on_rollback(&mut self.store, height, dividend, notification.harvester)
        {
            Ok(_) => {}
            Err(err) if !err.is_fatal() => {
                tracing::warn!(%err, "epoch-fee rollback entry missing, continuing with zero-filled value");
            }
            Err(err) => return Err(err),
        }

        let inflation = match self.supply.latest_at_or_before(height) {
            Some(entry) if entry.height == height => entry.increase,
            _ => {
                tracing::error!(height, "expected totalSupply entry not found during rollback");
                0
            }
        };

        let total = inflation + dividend;
        let (harv, net, ben) = partition(
            total,
            &self.config,
            notification.harvester,
            notification.beneficiary,
        );
        let sink = self
            .config
            .harvest_network_fee_sink_address
            .sink_at(height);

        apply_debit(cache, notification.harvester, self.config.currency_mosaic_id, harv)?;
        if net > 0 {
            if let Some(sink) = sink {
                apply_debit(cache, sink, self.config.currency_mosaic_id, net)?;
            }
        }
        if ben > 0 {
            apply_debit(cache, notification.beneficiary, self.config.currency_mosaic_id, ben)?;
        }

        Ok(())
    }
}

/// `supply * multiplier / 52_560_000` denominator: blocks per year at the
/// protocol's target block time (`spec.md` §4.D step 3).
const BLOCK_REWARD_DIVISOR: f64 = 52_560_000.0;

fn round_to_u64(x: f64) -> u64 {
    (x + 0.5) as u64
}

/// Splits `total` into (harvester, network, beneficiary) shares
/// (`spec.md` §4.D step 5). All percentage splits use integer division;
/// the harvester absorbs the residual.
fn partition(
    total: u64,
    config: &EngineConfig,
    harvester: Address,
    beneficiary: Address,
) -> (u64, u64, u64) {
    let net = total * config.harvest_network_percentage as u64 / 100;
    let share_fees = config.harvest_beneficiary_percentage > 0 && harvester != beneficiary;
    let ben = if share_fees {
        total * config.harvest_beneficiary_percentage as u64 / 100
    } else {
        0
    };
    let harv = total - net - ben;
    (harv, net, ben)
}

fn apply_credit(
    cache: &mut impl AccountStateCache,
    address: Address,
    mosaic_id: crate::receipts::MosaicId,
    amount: u64,
) -> Result<(), EngineError> {
    cache.process_forwarded(address, &mut |account| account.credit(mosaic_id, amount))
}

fn apply_debit(
    cache: &mut impl AccountStateCache,
    address: Address,
    mosaic_id: crate::receipts::MosaicId,
    amount: u64,
) -> Result<(), EngineError> {
    cache.process_forwarded(address, &mut |account| account.debit(mosaic_id, amount))
}

fn emit_balance_receipt(
    statement: &mut impl StatementBuilder,
    address: Address,
    mosaic_id: crate::receipts::MosaicId,
    amount: u64,
) {
    statement.add_receipt(Receipt::HarvestFee(BalanceChangeReceipt {
        version: 1,
        address,
        mosaic_id,
        amount,
    }));
}
