//! End-to-end coverage of [`Engine::on_block`] and
//! [`Engine::on_price_message`], exercising the scenarios in `spec.md` §8
//! against the in-memory collaborators.

use symbol_monetary_engine::account_cache::InMemoryAccountStateCache;
use symbol_monetary_engine::engine::Engine;
use symbol_monetary_engine::log_store::InMemoryLogStore;
use symbol_monetary_engine::params::{EngineConfig, SinkAddressTable};
use symbol_monetary_engine::receipts::{InMemoryStatementBuilder, Receipt};
use symbol_monetary_engine::types::{BlockNotification, NotifyMode, PriceMessageNotification};

fn addr(byte: u8) -> [u8; 32] {
    [byte; 32]
}

fn harness() -> (
    Engine<InMemoryLogStore>,
    InMemoryAccountStateCache,
    InMemoryStatementBuilder,
) {
    let engine = Engine::new(InMemoryLogStore::default(), EngineConfig::default());
    (engine, InMemoryAccountStateCache::new(), InMemoryStatementBuilder::new())
}

fn commit(
    engine: &mut Engine<InMemoryLogStore>,
    cache: &mut InMemoryAccountStateCache,
    statement: &mut InMemoryStatementBuilder,
    height: u64,
    harvester: [u8; 32],
    beneficiary: [u8; 32],
    total_fee: u64,
) {
    engine
        .on_block(
            BlockNotification { height, harvester, beneficiary, total_fee },
            NotifyMode::Commit,
            cache,
            statement,
        )
        .unwrap();
}

fn rollback(
    engine: &mut Engine<InMemoryLogStore>,
    cache: &mut InMemoryAccountStateCache,
    height: u64,
    harvester: [u8; 32],
    beneficiary: [u8; 32],
    total_fee: u64,
) {
    let mut statement = InMemoryStatementBuilder::new();
    engine
        .on_block(
            BlockNotification { height, harvester, beneficiary, total_fee },
            NotifyMode::Rollback,
            cache,
            &mut statement,
        )
        .unwrap();
}

/// S1: no sink and no beneficiary share configured, so a lone harvester
/// takes the entire combined reward, and inflation accrues even with no
/// price history (multiplier defaults to 1.0).
#[test]
fn harvester_only_commit_with_no_fee_sink_configured() {
    let (mut engine, mut cache, mut statement) = harness();
    let harvester = addr(1);

    commit(&mut engine, &mut cache, &mut statement, 1, harvester, harvester, 0);

    let balance = cache.balance(&harvester, engine.config().currency_mosaic_id);
    assert!(balance > 0, "harvester should receive the baseline inflation reward");
    assert_eq!(statement.receipts.len(), 2); // one HarvestFee + one Inflation
}

/// S2: a configured network sink and beneficiary percentage split the
/// combined reward three ways, with fees contributing a dividend once the
/// epoch boundary is crossed.
#[test]
fn three_way_split_with_fees_and_sink() {
    let mut config = EngineConfig {
        fee_recalc_freq: 2,
        harvest_network_percentage: 20,
        harvest_beneficiary_percentage: 10,
        ..Default::default()
    };
    let sink = addr(9);
    config.harvest_network_fee_sink_address = SinkAddressTable::new(vec![(0, sink)]);

    let mut engine = Engine::new(InMemoryLogStore::default(), config);
    let mut cache = InMemoryAccountStateCache::new();
    let harvester = addr(1);
    let beneficiary = addr(2);

    let mut statement = InMemoryStatementBuilder::new();
    commit(&mut engine, &mut cache, &mut statement, 1, harvester, beneficiary, 100);
    let mut statement = InMemoryStatementBuilder::new();
    commit(&mut engine, &mut cache, &mut statement, 2, harvester, beneficiary, 100);

    let mosaic = engine.config().currency_mosaic_id;
    assert!(cache.balance(&sink, mosaic) > 0, "network sink should have received its share");
    assert!(cache.balance(&beneficiary, mosaic) > 0, "beneficiary should have received its share");
    assert!(cache.balance(&harvester, mosaic) > 0, "harvester always gets a nonzero residual share");
}

/// S3: truncation residue from integer-division percentage splits always
/// lands on the harvester, never on the network sink or beneficiary.
#[test]
fn truncation_residue_goes_to_harvester() {
    let mut config = EngineConfig {
        harvest_network_percentage: 33,
        harvest_beneficiary_percentage: 33,
        ..Default::default()
    };
    let sink = addr(9);
    config.harvest_network_fee_sink_address = SinkAddressTable::new(vec![(0, sink)]);

    let mut engine = Engine::new(InMemoryLogStore::default(), config.clone());
    let mut cache = InMemoryAccountStateCache::new();
    let mut statement = InMemoryStatementBuilder::new();
    let harvester = addr(1);
    let beneficiary = addr(2);

    commit(&mut engine, &mut cache, &mut statement, 1, harvester, beneficiary, 0);

    let mosaic = config.currency_mosaic_id;
    let harv_balance = cache.balance(&harvester, mosaic);
    let net_balance = cache.balance(&sink, mosaic);
    let ben_balance = cache.balance(&beneficiary, mosaic);
    let total = harv_balance + net_balance + ben_balance;
    // 34% (100 - 33 - 33) plus the truncated remainder always lands on the
    // harvester, so its share exceeds the other two shares individually.
    assert!(harv_balance > net_balance);
    assert!(harv_balance > ben_balance);
    assert!(total > 0);
}

/// S4: when beneficiary == harvester, the beneficiary share is suppressed
/// entirely rather than doubly crediting the same account.
#[test]
fn beneficiary_equal_to_harvester_suppresses_beneficiary_share() {
    let config = EngineConfig {
        harvest_beneficiary_percentage: 50,
        ..Default::default()
    };
    let mut engine = Engine::new(InMemoryLogStore::default(), config);
    let mut cache = InMemoryAccountStateCache::new();
    let mut statement = InMemoryStatementBuilder::new();
    let harvester = addr(1);

    commit(&mut engine, &mut cache, &mut statement, 1, harvester, harvester, 0);

    // only one HarvestFee receipt (for the harvester) should have been emitted,
    // since share_fees is false when beneficiary == harvester.
    let harvest_receipts = statement
        .receipts
        .iter()
        .filter(|r| matches!(r, Receipt::HarvestFee(_)))
        .count();
    assert_eq!(harvest_receipts, 1);
}

/// S5: the network sink address resolved at a given height follows the
/// largest configured `sinceHeight <= height`, so a later fork in the sink
/// table only takes effect from its activation height onward.
#[test]
fn sink_address_switches_at_its_configured_height() {
    let sink_a = addr(10);
    let sink_b = addr(20);
    let mut config = EngineConfig {
        harvest_network_percentage: 50,
        ..Default::default()
    };
    config.harvest_network_fee_sink_address = SinkAddressTable::new(vec![(1, sink_a), (5, sink_b)]);

    let mut engine = Engine::new(InMemoryLogStore::default(), config.clone());
    let mut cache = InMemoryAccountStateCache::new();
    let harvester = addr(1);
    let mosaic = config.currency_mosaic_id;

    for height in 1..5 {
        let mut statement = InMemoryStatementBuilder::new();
        commit(&mut engine, &mut cache, &mut statement, height, harvester, harvester, 0);
    }
    assert!(cache.balance(&sink_a, mosaic) > 0);
    assert_eq!(cache.balance(&sink_b, mosaic), 0);

    let mut statement = InMemoryStatementBuilder::new();
    commit(&mut engine, &mut cache, &mut statement, 5, harvester, harvester, 0);
    assert!(cache.balance(&sink_b, mosaic) > 0);
}

/// S6: rolling back the most recently committed block restores every
/// account balance it had credited, and is idempotent if repeated.
#[test]
fn rollback_reverses_the_most_recent_commit() {
    let mut config = EngineConfig {
        harvest_network_percentage: 20,
        ..Default::default()
    };
    let sink = addr(9);
    config.harvest_network_fee_sink_address = SinkAddressTable::new(vec![(0, sink)]);

    let mut engine = Engine::new(InMemoryLogStore::default(), config.clone());
    let mut cache = InMemoryAccountStateCache::new();
    let harvester = addr(1);
    let beneficiary = addr(2);
    let mosaic = config.currency_mosaic_id;

    let mut statement = InMemoryStatementBuilder::new();
    commit(&mut engine, &mut cache, &mut statement, 1, harvester, beneficiary, 50);

    let harv_after_commit = cache.balance(&harvester, mosaic);
    let sink_after_commit = cache.balance(&sink, mosaic);
    assert!(harv_after_commit > 0);
    assert!(sink_after_commit > 0);

    rollback(&mut engine, &mut cache, 1, harvester, beneficiary, 50);

    assert_eq!(cache.balance(&harvester, mosaic), 0);
    assert_eq!(cache.balance(&sink, mosaic), 0);

    // repeating the rollback is a no-op: nothing further to undo.
    rollback(&mut engine, &mut cache, 1, harvester, beneficiary, 50);
    assert_eq!(cache.balance(&harvester, mosaic), 0);
}

/// A duplicate commit notification for an already-applied height must not
/// double-mint or double-credit.
#[test]
fn duplicate_commit_at_same_height_is_idempotent() {
    let (mut engine, mut cache, mut statement) = harness();
    let harvester = addr(1);

    commit(&mut engine, &mut cache, &mut statement, 1, harvester, harvester, 0);
    let balance_once = cache.balance(&harvester, engine.config().currency_mosaic_id);

    let mut statement2 = InMemoryStatementBuilder::new();
    commit(&mut engine, &mut cache, &mut statement2, 1, harvester, harvester, 0);
    let balance_twice = cache.balance(&harvester, engine.config().currency_mosaic_id);

    assert_eq!(balance_once, balance_twice);
    assert!(statement2.receipts.is_empty(), "duplicate commit emits no further receipts");
}

/// Committing many consecutive blocks never pushes circulating supply past
/// the configured cap.
#[test]
fn supply_never_exceeds_cap() {
    let config = EngineConfig {
        supply_cap: 10_000_000_100, // only 100 above initial_supply
        ..Default::default()
    };
    let mut engine = Engine::new(InMemoryLogStore::default(), config.clone());
    let mut cache = InMemoryAccountStateCache::new();
    let harvester = addr(1);

    for height in 1..=50 {
        let mut statement = InMemoryStatementBuilder::new();
        commit(&mut engine, &mut cache, &mut statement, height, harvester, harvester, 0);
    }

    let mosaic = config.currency_mosaic_id;
    // the harvester receives every minted unit in this configuration (no
    // sink, no beneficiary share), so its balance is a lower bound for
    // cumulative inflation, which must never have breached the cap.
    assert!(cache.balance(&harvester, mosaic) <= config.supply_cap - config.initial_supply);
}

/// A price observation accepted on commit, then undone on rollback, leaves
/// the multiplier exactly as it was before the observation arrived.
#[test]
fn price_message_rollback_restores_prior_multiplier() {
    let (mut engine, _cache, _statement) = harness();
    let publisher = engine.config().publisher_public_key;

    let notification = PriceMessageNotification {
        sender_public_key: publisher,
        block_height: 10,
        low_price: 100,
        high_price: 200,
    };

    engine.on_price_message(notification, NotifyMode::Commit).unwrap();
    engine.on_price_message(notification, NotifyMode::Rollback).unwrap();

    // a second, identical commit must succeed exactly as the first did,
    // which would not be true if rollback had left stale state behind.
    engine.on_price_message(notification, NotifyMode::Commit).unwrap();
}

/// Price observations from an unrecognized publisher are silently ignored
/// rather than rejected with an error.
#[test]
fn price_message_from_unknown_publisher_is_ignored() {
    let (mut engine, _cache, _statement) = harness();
    let notification = PriceMessageNotification {
        sender_public_key: addr(0xff),
        block_height: 10,
        low_price: 100,
        high_price: 200,
    };
    engine.on_price_message(notification, NotifyMode::Commit).unwrap();
}
