//! End-to-end scenarios through the public engine API.

use data_clicker::{
    Catalog, Command, Engine, EngineConfig, EngineEvent, ManualClock, MemoryStore, NumberFormat,
    PurchaseError, Setting, SnapshotStore,
};

const KEY: &str = "dataStorageGameSave";
const HOUR_MS: u64 = 60 * 60 * 1000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_engine(store: &MemoryStore, clock: &ManualClock) -> Engine<MemoryStore, ManualClock> {
    init_logging();
    Engine::new(
        Catalog::standard(),
        EngineConfig::default(),
        store.clone(),
        clock.clone(),
    )
}

/// Click until the first punch card is affordable and buy it.
fn buy_first_card(engine: &mut Engine<MemoryStore, ManualClock>) {
    while engine.snapshot().total_data < 15.0 {
        engine.click();
    }
    engine.buy_device("punchCard").unwrap();
}

#[test]
fn first_purchase_with_exact_funds() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);
    for _ in 0..3 {
        engine.click();
    }
    assert_eq!(engine.snapshot().total_data, 15.0);

    let receipt = engine.buy_device("punchCard").unwrap();
    assert_eq!(receipt.cost, 15.0);
    let state = engine.snapshot();
    assert_eq!(state.total_data, 0.0);
    assert_eq!(state.device_count("punchCard"), 1);
    assert_eq!(state.device("punchCard").unwrap().cost, 19.0);
}

#[test]
fn production_runs_through_ticks() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);
    buy_first_card(&mut engine);
    // 20 s cycle at 0.1 s per tick
    for _ in 0..205 {
        engine.tick(0.1);
    }
    assert_eq!(engine.snapshot().total_data, 80.0);
    assert!(engine.drain_events().iter().any(|e| matches!(
        e,
        EngineEvent::CycleCompleted { device, cycles: 1, .. } if device == "punchCard"
    )));
}

#[test]
fn offline_earnings_are_capped_at_one_day() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(10 * HOUR_MS));
    let mut engine = new_engine(&store, &clock);
    buy_first_card(&mut engine);
    engine.save().unwrap();
    let data_at_save = engine.snapshot().total_data;

    clock.advance(48 * HOUR_MS);
    let mut reloaded = new_engine(&store, &clock);
    let report = reloaded.boot().unwrap().unwrap();
    assert_eq!(report.elapsed_ms, 24 * HOUR_MS);
    assert!((report.rate - 4.0).abs() < 1e-12);
    assert!((report.earned - 4.0 * 86_400.0).abs() < 1e-6);
    assert!((reloaded.snapshot().total_data - (data_at_save + report.earned)).abs() < 1e-6);
    assert!(reloaded
        .drain_events()
        .contains(&EngineEvent::OfflineEarnings(report)));
}

#[test]
fn short_reload_awards_nothing() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);
    buy_first_card(&mut engine);
    engine.save().unwrap();

    clock.advance(30_000);
    let mut reloaded = new_engine(&store, &clock);
    assert_eq!(reloaded.boot().unwrap(), None);
    assert_eq!(reloaded.snapshot().total_data, 0.0);
    assert_eq!(reloaded.snapshot().device_count("punchCard"), 1);
}

#[test]
fn corrupt_snapshot_falls_back_to_defaults() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    store.insert(KEY, "{ definitely not json");
    let mut engine = new_engine(&store, &clock);
    let err = engine.boot().unwrap_err();
    assert!(err.is_corrupt());
    assert_eq!(engine.snapshot().total_data, 0.0);
    assert_eq!(engine.snapshot().click_power, 5.0);
    assert!(store.get(KEY).is_none());
}

#[test]
fn corrupt_load_replaces_progress() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);
    buy_first_card(&mut engine);
    assert!(engine.load(b"[").is_err());
    assert_eq!(engine.snapshot().device_count("punchCard"), 0);
    assert_eq!(engine.estimated_rate(), 0.0);
}

#[test]
fn legacy_snapshot_from_older_catalog() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    store.insert(
        KEY,
        r#"{
            "totalData": 5000,
            "clickPower": 10,
            "devices": {
                "punchCard": { "count": 12, "cost": 1, "progress": 3 },
                "laserDisc": { "count": 4 }
            },
            "upgrades": { "punchCard_click_1": true },
            "revealedDevices": { "punchCard": true, "floppy": true },
            "settings": { "numberFormat": "long" }
        }"#,
    );
    let mut engine = new_engine(&store, &clock);
    assert_eq!(engine.boot().unwrap(), None);

    let state = engine.snapshot();
    assert_eq!(state.total_data, 5000.0);
    assert_eq!(state.total_earned, 5000.0);
    assert_eq!(state.click_power, 10.0);
    assert_eq!(state.device_count("punchCard"), 12);
    assert_eq!(state.device("punchCard").unwrap().cost, (15.0 * 1.3f64.powi(12)).floor());
    assert!(state.device("laserDisc").is_none());
    assert_eq!(state.device_count("quantumDrive"), 0);
    assert!(state.owns_upgrade("punchCard_click_1"));
    assert_eq!(state.settings.number_format, NumberFormat::Long);
    assert_eq!(state.settings.auto_save_interval, 30_000);
    // Achievements are re-evaluated against the loaded counts.
    assert!(state.has_achievement("d_count_punchCard_1"));
    assert!((engine.estimated_rate() - 12.0 * 4.0).abs() < 1e-9);
}

#[test]
fn autosave_follows_interval_changes() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);

    engine.update_setting(Setting::AutoSaveInterval(0));
    for _ in 0..600 {
        engine.tick(0.1);
    }
    assert!(store.get(KEY).is_none());

    engine.update_setting(Setting::AutoSaveInterval(5_000));
    engine.update_setting(Setting::AutoSaveInterval(5_000));
    for _ in 0..105 {
        engine.tick(0.1);
    }
    let autosaves = engine
        .drain_events()
        .iter()
        .filter(|e| **e == EngineEvent::Autosaved)
        .count();
    assert_eq!(autosaves, 2);
    assert!(store.get(KEY).is_some());
}

#[test]
fn reset_clears_progress_and_snapshot() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);
    buy_first_card(&mut engine);
    engine.update_setting(Setting::AutoSaveInterval(0));
    engine.save().unwrap();

    engine.dispatch(Command::Reset).unwrap();
    assert_eq!(engine.snapshot().device_count("punchCard"), 0);
    assert_eq!(engine.snapshot().settings.auto_save_interval, 30_000);
    assert!(engine.scheduler().autosave.is_active());
    assert_eq!(store.read(KEY).unwrap(), None);
}

#[test]
fn purchase_errors_are_reported_in_order() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);
    assert_eq!(
        engine.buy_upgrade("floppy_speed_0"),
        Err(PurchaseError::RequirementNotMet("floppy_speed_0".into()))
    );
    assert_eq!(
        engine.buy_device("laserDisc"),
        Err(PurchaseError::UnknownEntityId("laserDisc".into()))
    );
    assert!(matches!(
        engine.buy_device("floppy"),
        Err(PurchaseError::InsufficientResource { .. })
    ));
}

#[test]
fn save_stamps_the_clock() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(1_234_567));
    let mut engine = new_engine(&store, &clock);
    engine.save().unwrap();
    assert_eq!(engine.snapshot().last_save_time, Some(1_234_567));
    let json: serde_json::Value = serde_json::from_slice(&store.get(KEY).unwrap()).unwrap();
    assert_eq!(json["lastSaveTime"], 1_234_567);
}

#[test]
fn loaded_reveal_set_is_taken_as_stored() {
    let (store, clock) = (MemoryStore::new(), ManualClock::new(0));
    let mut engine = new_engine(&store, &clock);
    engine.load(br#"{ "revealedDevices": ["floppy"] }"#).unwrap();
    let revealed: Vec<&str> = engine
        .snapshot()
        .revealed_devices
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(revealed, ["floppy"]);
    assert!(!engine.device_view("punchCard").unwrap().revealed);
}
