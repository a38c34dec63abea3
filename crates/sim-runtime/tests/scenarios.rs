use persistence::SnapshotStore;
use rust_decimal::Decimal;
use sim_core::constants::{MAX_DEBT_TO_GDP, MAX_SECTOR_PERCENT, MIN_SECTOR_PERCENT};
use sim_core::{
    validate_country_state, CountryCatalog, CountryDefinition, CountryName, EngineConfig,
    PolicyLever, Product, RoomName, TradeKind,
};
use sim_econ::sectors::{refresh_sectors, trade_impact};
use sim_runtime::{
    AgreementSource, BroadcastTransport, Collaborators, EconomyService, EngineEvent,
    Notification, OnlinePlayers, RuntimeError, TradeBook,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    service: EconomyService,
    online: Arc<OnlinePlayers>,
    trades: Arc<TradeBook>,
    transport: BroadcastTransport,
}

fn harness(config: EngineConfig, persistence: Option<SnapshotStore>) -> Harness {
    let online = Arc::new(OnlinePlayers::default());
    let trades = Arc::new(TradeBook::default());
    let transport = BroadcastTransport::new(4096);
    let collaborators = Collaborators {
        presence: online.clone(),
        agreements: trades.clone(),
        transport: Arc::new(transport.clone()),
    };
    let service = EconomyService::new(config, collaborators, persistence).unwrap();
    Harness {
        service,
        online,
        trades,
        transport,
    }
}

fn room() -> RoomName {
    "room-1".into()
}

fn x() -> CountryName {
    "X".into()
}

fn single(def: CountryDefinition) -> CountryCatalog {
    [(x(), def)].into_iter().collect()
}

async fn open_room(h: &Harness, catalog: &CountryCatalog) {
    h.service.initialize_room(room(), catalog).await.unwrap();
    for country in catalog.keys() {
        h.online
            .join(room(), country.clone(), format!("player-{country}").into());
    }
}

#[tokio::test]
async fn equilibrium_is_near_fixed_point() {
    let h = harness(EngineConfig::default(), None);
    open_room(&h, &single(CountryDefinition::default())).await;
    h.service.tick_room(&room()).await.unwrap();
    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert_eq!(s.cycle_count, 1);
    assert!(s.gdp > 100.0 && s.gdp < 100.05, "gdp {}", s.gdp);
    assert!((s.inflation - 0.04).abs() < 0.001, "inflation {}", s.inflation);
    assert!((s.unemployment - 12.5).abs() < 0.05);
}

#[tokio::test]
async fn oversized_bond_request_is_rejected() {
    let h = harness(EngineConfig::default(), None);
    open_room(&h, &single(CountryDefinition::default())).await;
    let resp = h.service.issue_debt_bonds(&room(), &x(), 2000.0).await.unwrap();
    assert!(!resp.success);
    assert!(resp.message.contains("1000"), "{}", resp.message);
    assert!(resp.new_contract.is_none());
    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert_eq!(s.public_debt, 0.0);
    assert_eq!(s.treasury, 10.0);
}

#[tokio::test]
async fn accepted_bond_request_reports_contract() {
    let h = harness(EngineConfig::default(), None);
    open_room(&h, &single(CountryDefinition::default())).await;
    let resp = h.service.issue_debt_bonds(&room(), &x(), 50.0).await.unwrap();
    assert!(resp.success);
    let contract = resp.new_contract.unwrap();
    assert_eq!(resp.effective_rate, Some(contract.interest_rate));
    let summary = h.service.debt_summary(&room(), &x()).await.unwrap();
    assert_eq!(summary.number_of_contracts, 1);
    assert_eq!(summary.public_debt, Decimal::new(50, 0));
}

#[tokio::test]
async fn raising_taxes_costs_popularity_and_raises_revenue() {
    let taxed = harness(EngineConfig::default(), None);
    let base = harness(EngineConfig::default(), None);
    open_room(&taxed, &single(CountryDefinition::default())).await;
    open_room(&base, &single(CountryDefinition::default())).await;

    let t = taxed
        .service
        .update_parameter(&room(), &x(), PolicyLever::TaxBurden, 45.0)
        .await
        .unwrap();
    let b = base
        .service
        .update_parameter(&room(), &x(), PolicyLever::TaxBurden, 40.0)
        .await
        .unwrap();
    assert_eq!(t.tax_burden, 45.0);
    assert!(t.popularity < b.popularity);
    assert_eq!(t.cycle_count, 0);

    taxed.service.tick_room(&room()).await.unwrap();
    base.service.tick_room(&room()).await.unwrap();
    let t = taxed.service.country_state(&room(), &x()).await.unwrap();
    let b = base.service.country_state(&room(), &x()).await.unwrap();
    assert!(t.treasury > b.treasury);
}

#[tokio::test]
async fn policy_changes_respect_steps_and_are_idempotent() {
    let h = harness(EngineConfig::default(), None);
    open_room(&h, &single(CountryDefinition::default())).await;
    let lever = PolicyLever::InterestRate;
    let first = h.service.update_parameter(&room(), &x(), lever, 10.0).await.unwrap();
    let second = h.service.update_parameter(&room(), &x(), lever, 10.0).await.unwrap();
    assert_eq!(first.interest_rate, 10.0);
    assert_eq!(second.interest_rate, 10.0);

    let err = h
        .service
        .update_parameter(&room(), &x(), lever, 13.0)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidParameter { .. }));
    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert_eq!(s.interest_rate, 10.0);
}

#[tokio::test]
async fn export_agreement_balances_commodities() {
    let h = harness(EngineConfig::default(), None);
    h.trades
        .create(&room(), TradeKind::Export, Product::Commodity, "A".into(), "B".into(), 30.0)
        .unwrap();
    let agreements = h.trades.trade_agreements(&room());

    let mut a = CountryDefinition {
        services: Some(30.0),
        commodities: Some(50.0),
        manufactures: Some(20.0),
        ..Default::default()
    }
    .seed_state();
    a.commodities_needs_pct = 20.0;
    a.unemployment = 15.0;
    refresh_sectors(&mut a, trade_impact(&agreements, &"A".into()));
    assert!((a.commodities_output - 50.0).abs() < 1e-9);
    assert!((a.commodities_needs - 20.0).abs() < 1e-9);
    assert!(a.commodities_balance.abs() < 1e-9, "balance {}", a.commodities_balance);

    let b = trade_impact(&agreements, &"B".into());
    assert_eq!(b.commodity_imports, 30.0);
}

#[tokio::test]
async fn trade_flows_reach_country_state() {
    let h = harness(EngineConfig::default(), None);
    let catalog: CountryCatalog = [
        ("A".into(), CountryDefinition::default()),
        ("B".into(), CountryDefinition::default()),
    ]
    .into_iter()
    .collect();
    open_room(&h, &catalog).await;
    h.trades
        .create(&room(), TradeKind::Export, Product::Manufacture, "A".into(), "B".into(), 8.0)
        .unwrap();
    h.service.tick_room(&room()).await.unwrap();
    let a = h.service.country_state(&room(), &"A".into()).await.unwrap();
    let b = h.service.country_state(&room(), &"B".into()).await.unwrap();
    assert_eq!(a.trade_stats.manufacture_exports, 8.0);
    assert_eq!(b.trade_stats.manufacture_imports, 8.0);
    let expected = a.manufactures_output - 8.0 - a.manufactures_needs;
    assert!((a.manufactures_balance - expected).abs() < 1e-9);
}

#[tokio::test]
async fn emergency_bonds_cover_a_negative_treasury() {
    let h = harness(EngineConfig::default(), None);
    let mut rx = h.transport.subscribe();
    open_room(
        &h,
        &single(CountryDefinition {
            treasury: Some(-15.0),
            ..Default::default()
        }),
    )
    .await;
    h.service.tick_room(&room()).await.unwrap();

    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert!(s.treasury >= 0.0);
    assert!((s.public_debt - 17.994).abs() < 1e-6, "debt {}", s.public_debt);

    let mut saw_notice = false;
    let mut saw_states = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            EngineEvent::Notify {
                player,
                notification: Notification::EmergencyBondsIssued { at_limit, .. },
                ..
            } => {
                assert_eq!(player.0, "player-X");
                assert!(!at_limit);
                saw_notice = true;
            }
            EngineEvent::StatesUpdated { .. } => saw_states = true,
            _ => {}
        }
    }
    assert!(saw_notice && saw_states);
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<EngineEvent>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::Notify { notification, .. } = event {
            out.push(notification);
        }
    }
    out
}

#[tokio::test]
async fn ceiling_lock_is_reported_and_released() {
    let h = harness(EngineConfig::default(), None);
    let mut rx = h.transport.subscribe();
    open_room(
        &h,
        &single(CountryDefinition {
            public_debt: Some(119.0),
            treasury: Some(-5.0),
            ..Default::default()
        }),
    )
    .await;

    h.service.tick_room(&room()).await.unwrap();
    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert!(s.debt_ceiling_locked);
    assert_eq!(s.treasury, 0.0);
    assert_eq!(s.public_debt, 119.0);
    let notices = drain(&mut rx);
    assert!(
        notices.iter().any(|n| matches!(
            n,
            Notification::DebtCeilingLocked { shortfall, .. } if (shortfall - 4.995).abs() < 1e-6
        )),
        "{notices:?}"
    );

    h.service
        .update_parameter(&room(), &x(), PolicyLever::TaxBurden, 45.0)
        .await
        .unwrap();
    h.service.tick_room(&room()).await.unwrap();
    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert!(s.treasury > 0.0);
    assert!(!s.debt_ceiling_locked);
    assert!(!drain(&mut rx)
        .iter()
        .any(|n| matches!(n, Notification::DebtCeilingLocked { .. })));
}

#[tokio::test]
async fn emergency_issue_capped_at_ceiling_is_flagged() {
    let h = harness(EngineConfig::default(), None);
    let mut rx = h.transport.subscribe();
    open_room(
        &h,
        &single(CountryDefinition {
            public_debt: Some(117.0),
            treasury: Some(-2.6),
            ..Default::default()
        }),
    )
    .await;

    h.service.tick_room(&room()).await.unwrap();
    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert!(!s.debt_ceiling_locked);
    assert!(s.treasury >= 0.0);
    assert!((s.public_debt - 120.0).abs() < 1e-6, "debt {}", s.public_debt);
    let notices = drain(&mut rx);
    assert!(
        notices.iter().any(|n| matches!(
            n,
            Notification::EmergencyBondsIssued { at_limit: true, amount, .. } if (amount - 3.0).abs() < 1e-6
        )),
        "{notices:?}"
    );
}

#[tokio::test]
async fn invariants_hold_over_a_long_run() {
    let h = harness(EngineConfig::default(), None);
    let catalog: CountryCatalog = [
        ("Balanced".into(), CountryDefinition::default()),
        (
            "Indebted".into(),
            CountryDefinition {
                public_debt: Some(110.0),
                inflation: Some(0.12),
                ..Default::default()
            },
        ),
        (
            "Spender".into(),
            CountryDefinition {
                gdp: Some(300.0),
                tax_burden: Some(10.0),
                public_services: Some(60.0),
                interest_rate: Some(2.0),
                ..Default::default()
            },
        ),
    ]
    .into_iter()
    .collect();
    open_room(&h, &catalog).await;

    let mut previous = h.service.room_states(&room()).await.unwrap();
    for _ in 0..720 {
        let report = h.service.tick_room(&room()).await.unwrap().unwrap();
        assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
        let states = h.service.room_states(&room()).await.unwrap();
        for (country, s) in &states {
            validate_country_state(s).unwrap();
            let sum = s.services + s.commodities + s.manufactures;
            assert!((99.0..=101.0).contains(&sum));
            for share in s.sector_shares() {
                assert!((MIN_SECTOR_PERCENT - 1e-9..=MAX_SECTOR_PERCENT + 1e-9).contains(&share));
            }
            // Issuance happens before the tick's growth is applied.
            if s.public_debt > previous[country].public_debt + 1e-9 {
                assert!(
                    s.debt_to_gdp() <= MAX_DEBT_TO_GDP * 1.005,
                    "{country} issued past the ceiling"
                );
            }
        }
        previous = states;
    }
}

#[tokio::test]
async fn bond_amortises_over_120_months() {
    let config = EngineConfig::default();
    let month = config.monthly_period;
    let h = harness(config, None);
    open_room(&h, &single(CountryDefinition::default())).await;
    let contract = h
        .service
        .issue_debt_bonds(&room(), &x(), 100.0)
        .await
        .unwrap()
        .new_contract
        .unwrap();

    for _ in 0..(119 * month) {
        h.service.tick_room(&room()).await.unwrap();
    }
    let snap = h.service.snapshot_room(&room()).await.unwrap();
    let live = snap.debts[&x()].iter().find(|c| c.id == contract.id).unwrap();
    assert_eq!(live.remaining_installments, 1);
    assert!((live.remaining_value - contract.monthly_payment).abs() < 1e-6);

    for _ in 0..month {
        h.service.tick_room(&room()).await.unwrap();
    }
    let snap = h.service.snapshot_room(&room()).await.unwrap();
    assert!(snap.debts[&x()].iter().all(|c| c.id != contract.id));
}

#[tokio::test]
async fn missing_rooms_and_countries_are_not_found() {
    let h = harness(EngineConfig::default(), None);
    assert!(h.service.tick_room(&room()).await.unwrap_err().is_not_found());
    open_room(&h, &single(CountryDefinition::default())).await;
    let err = h
        .service
        .update_parameter(&room(), &"Atlantis".into(), PolicyLever::TaxBurden, 40.0)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::CountryNotFound { .. }));
    assert!(h
        .service
        .issue_debt_bonds(&room(), &"Atlantis".into(), 10.0)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn empty_rooms_are_not_ticked() {
    let h = harness(EngineConfig::default(), None);
    h.service
        .initialize_room(room(), &single(CountryDefinition::default()))
        .await
        .unwrap();
    assert!(h.service.tick_room(&room()).await.unwrap().is_none());
    let s = h.service.country_state(&room(), &x()).await.unwrap();
    assert_eq!(s.cycle_count, 0);
}

#[tokio::test]
async fn removing_a_room_purges_it_and_saves_a_final_snapshot() {
    let store = SnapshotStore::memory();
    let h = harness(EngineConfig::default(), Some(store.clone()));
    open_room(&h, &single(CountryDefinition::default())).await;
    h.service.tick_room(&room()).await.unwrap();
    h.service.start_room(&room()).await.unwrap();

    h.service.remove_room(&room()).await.unwrap();
    assert!(!h.service.is_scheduled(&room()).await);
    assert!(h.service.room_names().await.is_empty());
    assert!(h.service.tick_room(&room()).await.unwrap_err().is_not_found());
    assert!(h.service.remove_room(&room()).await.is_err());

    let saved = store.load_room(&room()).await.unwrap().unwrap();
    assert_eq!(saved.states[&x()].cycle_count, 1);
}

#[tokio::test]
async fn removed_room_is_not_restored() {
    let store = SnapshotStore::memory();
    let h = harness(EngineConfig::default(), Some(store.clone()));
    open_room(&h, &single(CountryDefinition::default())).await;
    h.service.save_snapshot().await.unwrap();
    assert!(store.load_aggregate().await.unwrap().unwrap().rooms.contains_key(&room()));

    h.service.remove_room(&room()).await.unwrap();

    let fresh = harness(EngineConfig::default(), Some(store));
    assert_eq!(fresh.service.restore_snapshot().await.unwrap(), 0);
    assert!(fresh.service.room_names().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn scheduler_ticks_until_stopped() {
    let h = harness(EngineConfig::default(), None);
    open_room(&h, &single(CountryDefinition::default())).await;
    h.service.start_room(&room()).await.unwrap();
    assert!(h.service.is_scheduled(&room()).await);

    tokio::time::sleep(Duration::from_millis(1_600)).await;
    let ticked = h.service.country_state(&room(), &x()).await.unwrap().cycle_count;
    assert!((2..=3).contains(&ticked), "ticked {ticked}");

    assert!(h.service.stop_room(&room()).await);
    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let after = h.service.country_state(&room(), &x()).await.unwrap().cycle_count;
    assert_eq!(after, ticked);
}

#[tokio::test(start_paused = true)]
async fn bridge_snapshots_and_restores() {
    let store = SnapshotStore::memory();
    let config = EngineConfig {
        save_interval_ms: 5_000,
        ..Default::default()
    };
    let h = harness(config.clone(), Some(store.clone()));
    open_room(&h, &single(CountryDefinition::default())).await;
    h.service.tick_room(&room()).await.unwrap();
    h.service.start_persistence().await;

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    let aggregate = store.load_aggregate().await.unwrap().unwrap();
    assert!(aggregate.rooms.contains_key(&room()));
    h.service.stop_persistence().await;

    let fresh = harness(config, Some(store));
    assert_eq!(fresh.service.restore_snapshot().await.unwrap(), 1);
    let s = fresh.service.country_state(&room(), &x()).await.unwrap();
    assert_eq!(s.cycle_count, 1);
}
