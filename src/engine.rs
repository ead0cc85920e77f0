//! The engine: owns the progression state and exposes the command/query
//! surface used by rendering, input and storage collaborators.

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::actions::{Command, CommandOutcome};
use crate::catalog::{Catalog, UpgradeDefinition};
use crate::config::EngineConfig;
use crate::error::{CommandError, PurchaseError, SettingError, SnapshotError};
use crate::format::format_number;
use crate::logic::{self, Receipt, TickOutcome, Unlocks};
use crate::multiplier;
use crate::offline::{self, OfflineReport};
use crate::save::{self, SnapshotStore};
use crate::schedule::Scheduler;
use crate::state::{ProgressionState, Setting};
use crate::time::{Clock, FrameClock};

/// Notifications for the presentation layer, drained with
/// [`Engine::drain_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    CycleCompleted { device: String, cycles: u64, amount: f64 },
    DeviceRevealed(String),
    AchievementUnlocked(String),
    DevicePurchased { device: String, count: u64 },
    UpgradePurchased(String),
    Autosaved,
    /// Time to show a "did you know" message.
    TriviaDue,
    OfflineEarnings(OfflineReport),
}

/// Read model of one device for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceView {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub count: u64,
    pub cost: f64,
    pub cycle_duration: f64,
    /// Data produced per completed cycle by all owned units.
    pub output_per_cycle: f64,
    /// Progress through the current cycle, 0.0..1.0.
    pub progress_fraction: f64,
    pub revealed: bool,
    pub affordable: bool,
}

pub struct Engine<S: SnapshotStore, C: Clock> {
    catalog: Catalog,
    config: EngineConfig,
    state: ProgressionState,
    store: S,
    clock: C,
    scheduler: Scheduler,
    frame_clock: FrameClock,
    /// Cached aggregate production rate.
    rate: f64,
    events: VecDeque<EngineEvent>,
}

impl<S: SnapshotStore, C: Clock> Engine<S, C> {
    /// A fresh game. Call [`Engine::boot`] to restore a stored snapshot.
    pub fn new(catalog: Catalog, config: EngineConfig, store: S, clock: C) -> Self {
        let state = ProgressionState::new(&catalog);
        let scheduler = Scheduler::new(state.settings.auto_save_interval, config.trivia_interval_seconds);
        let frame_clock = FrameClock::new(config.max_tick_seconds);
        Self {
            catalog,
            config,
            state,
            store,
            clock,
            scheduler,
            frame_clock,
            rate: 0.0,
            events: VecDeque::new(),
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn snapshot(&self) -> &ProgressionState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Data per second across all devices.
    pub fn estimated_rate(&self) -> f64 {
        self.rate
    }

    /// Data the next click will award.
    pub fn click_power(&self) -> f64 {
        logic::click_value(&self.state, self.rate)
    }

    /// Format an amount with the player's number format.
    pub fn format_data(&self, amount: f64) -> String {
        format_number(amount, self.state.settings.number_format)
    }

    pub fn available_upgrades(&self) -> Vec<&UpgradeDefinition> {
        logic::available_upgrades(&self.catalog, &self.state)
    }

    pub fn can_afford_device(&self, id: &str) -> bool {
        logic::can_afford_device(&self.state, id)
    }

    pub fn can_afford_upgrade(&self, id: &str) -> bool {
        logic::can_afford_upgrade(&self.catalog, &self.state, id)
    }

    pub fn device_view(&self, id: &str) -> Option<DeviceView> {
        let def = self.catalog.device(id)?;
        let device = self.state.device(id)?;
        let production = multiplier::compose(def, &self.state, device);
        let progress_fraction = if device.count > 0 && production.cycle_duration > 0.0 {
            (device.progress / production.cycle_duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(DeviceView {
            id: def.id.clone(),
            name: def.name.clone(),
            creator: def.creator.clone(),
            count: device.count,
            cost: device.cost,
            cycle_duration: production.cycle_duration,
            output_per_cycle: production.output_per_cycle,
            progress_fraction,
            revealed: self.state.is_revealed(id),
            affordable: self.state.total_data >= device.cost,
        })
    }

    /// Every device in tier order.
    pub fn devices(&self) -> Vec<DeviceView> {
        self.catalog
            .devices()
            .iter()
            .filter_map(|def| self.device_view(&def.id))
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    // ── Player actions ──────────────────────────────────────────────

    /// Returns the data awarded.
    pub fn click(&mut self) -> f64 {
        let outcome = logic::click(&self.catalog, &mut self.state, self.rate);
        self.record_unlocks(outcome.unlocks);
        outcome.amount
    }

    pub fn buy_device(&mut self, id: &str) -> Result<Receipt, PurchaseError> {
        let receipt = logic::buy_device(&self.catalog, &mut self.state, id)
            .inspect_err(|e| log_rejection(id, e))?;
        let count = self.state.device_count(id);
        self.push_event(EngineEvent::DevicePurchased {
            device: id.into(),
            count,
        });
        self.record_unlocks(receipt.unlocks.clone());
        self.refresh_rate();
        Ok(receipt)
    }

    pub fn buy_upgrade(&mut self, id: &str) -> Result<Receipt, PurchaseError> {
        let receipt = logic::buy_upgrade(&self.catalog, &mut self.state, id)
            .inspect_err(|e| log_rejection(id, e))?;
        self.push_event(EngineEvent::UpgradePurchased(id.into()));
        self.record_unlocks(receipt.unlocks.clone());
        self.refresh_rate();
        Ok(receipt)
    }

    pub fn update_setting(&mut self, setting: Setting) {
        self.state.settings.apply(&setting);
        if let Setting::AutoSaveInterval(ms) = setting {
            self.scheduler.set_autosave_ms(ms);
            info!("autosave interval set to {ms} ms");
        }
    }

    /// String-keyed variant of [`Engine::update_setting`].
    pub fn update_setting_str(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        let setting = Setting::parse(key, value)?;
        self.update_setting(setting);
        Ok(())
    }

    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        Ok(match command {
            Command::Click => CommandOutcome::Clicked(self.click()),
            Command::BuyDevice(id) => CommandOutcome::Purchased(self.buy_device(&id)?),
            Command::BuyUpgrade(id) => CommandOutcome::Purchased(self.buy_upgrade(&id)?),
            Command::Save => CommandOutcome::Saved(self.save()?),
            Command::Reset => {
                self.reset()?;
                CommandOutcome::Reset
            }
            Command::UpdateSetting(setting) => {
                self.update_setting(setting);
                CommandOutcome::SettingUpdated
            }
        })
    }

    // ── Time ────────────────────────────────────────────────────────

    /// Advance the simulation and the timers by `delta` seconds, clamped to
    /// the configured maximum step.
    pub fn tick(&mut self, delta: f64) -> TickOutcome {
        let max_step = self.config.max_tick_seconds.max(0.0);
        let dt = if delta.is_finite() {
            delta.max(0.0).min(max_step)
        } else {
            0.0
        };
        let outcome = self.simulate(dt);
        self.run_timers(dt);
        outcome
    }

    /// Drive the engine from a render loop timestamp. Timers see the full
    /// wall-clock delta; the simulation sees the clamped one.
    pub fn frame(&mut self, now_ms: f64) -> TickOutcome {
        let delta = self.frame_clock.update(now_ms);
        let outcome = self.simulate(delta.sim_seconds);
        self.run_timers(delta.wall_seconds);
        outcome
    }

    fn simulate(&mut self, dt: f64) -> TickOutcome {
        let outcome = logic::advance(&self.catalog, &mut self.state, dt);
        for completion in &outcome.completions {
            self.push_event(EngineEvent::CycleCompleted {
                device: completion.device.clone(),
                cycles: completion.cycles,
                amount: completion.amount,
            });
        }
        self.record_unlocks(outcome.unlocks.clone());
        if !outcome.completions.is_empty() {
            self.refresh_rate();
        }
        outcome
    }

    fn run_timers(&mut self, dt: f64) {
        let due = self.scheduler.advance(dt);
        if due.autosave {
            match self.save() {
                Ok(_) => self.push_event(EngineEvent::Autosaved),
                Err(e) => warn!("autosave failed: {e}"),
            }
        }
        if due.trivia && self.state.owns_any_device() {
            self.push_event(EngineEvent::TriviaDue);
        }
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Encode the state, stamped with the current time, and write it to the
    /// store. Returns the written bytes.
    pub fn save(&mut self) -> Result<Vec<u8>, SnapshotError> {
        let bytes = save::serialize(&mut self.state, self.clock.now_ms())?;
        self.store.write(&self.config.storage_key, &bytes)?;
        debug!("saved {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Save before the process goes away.
    pub fn shutdown(&mut self) -> Result<(), SnapshotError> {
        self.save().map(|_| info!("saved on shutdown"))
    }

    /// Restore the stored snapshot, if there is one.
    pub fn boot(&mut self) -> Result<Option<OfflineReport>, SnapshotError> {
        match self.store.read(&self.config.storage_key) {
            Ok(Some(bytes)) => self.load(&bytes),
            Ok(None) => {
                info!("no saved game, starting fresh");
                self.refresh_rate();
                Ok(None)
            }
            Err(e) => {
                warn!("could not read saved game: {e}");
                Err(e.into())
            }
        }
    }

    /// Replace the state with a decoded snapshot and award offline earnings.
    ///
    /// A corrupt snapshot leaves a fresh game, deletes the stored copy and
    /// is reported as the error.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Option<OfflineReport>, SnapshotError> {
        let defaults = ProgressionState::new(&self.catalog);
        let state = match save::deserialize(&self.catalog, bytes, defaults) {
            Ok(state) => state,
            Err(e) => {
                warn!("discarding saved game: {e}");
                self.install(ProgressionState::new(&self.catalog));
                if let Err(remove) = self.store.remove(&self.config.storage_key) {
                    warn!("could not delete corrupt save: {remove}");
                }
                return Err(e);
            }
        };

        self.install(state);
        let now = self.clock.now_ms();
        let report = offline::reconcile(&self.catalog, &mut self.state, now, &self.config);
        let unlocks = logic::refresh_unlocks(&self.catalog, &mut self.state);
        self.record_unlocks(unlocks);
        if let Some(report) = report {
            self.push_event(EngineEvent::OfflineEarnings(report));
        }
        let owned = self.state.devices.values().filter(|d| d.count > 0).count();
        info!("loaded saved game, {owned} device kinds owned");
        Ok(report)
    }

    /// Back to a fresh game. The stored snapshot is deleted.
    pub fn reset(&mut self) -> Result<(), SnapshotError> {
        self.install(ProgressionState::new(&self.catalog));
        self.events.clear();
        self.store.remove(&self.config.storage_key)?;
        info!("game reset");
        Ok(())
    }

    fn install(&mut self, state: ProgressionState) {
        self.state = state;
        self.scheduler.set_autosave_ms(self.state.settings.auto_save_interval);
        self.scheduler.trivia.reschedule(self.config.trivia_interval_seconds);
        self.refresh_rate();
    }

    // ── Internals ───────────────────────────────────────────────────

    fn refresh_rate(&mut self) {
        self.rate = multiplier::estimated_rate(&self.catalog, &self.state);
    }

    fn record_unlocks(&mut self, unlocks: Unlocks) {
        if unlocks.is_empty() {
            return;
        }
        for id in unlocks.revealed {
            self.push_event(EngineEvent::DeviceRevealed(id));
        }
        for id in unlocks.achievements {
            self.push_event(EngineEvent::AchievementUnlocked(id));
        }
    }

    /// Oldest events are dropped once the queue is full.
    fn push_event(&mut self, event: EngineEvent) {
        if self.config.event_capacity == 0 {
            return;
        }
        while self.events.len() >= self.config.event_capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

fn log_rejection(id: &str, error: &PurchaseError) {
    match error {
        PurchaseError::UnknownEntityId(_) => warn!("rejected purchase: {error}"),
        _ => debug!("purchase of {id} rejected: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::MemoryStore;
    use crate::state::NumberFormat;
    use crate::time::ManualClock;

    type TestEngine = Engine<MemoryStore, ManualClock>;

    fn engine() -> (TestEngine, MemoryStore, ManualClock) {
        let store = MemoryStore::new();
        let clock = ManualClock::new(1_000_000);
        let engine = Engine::new(
            Catalog::standard(),
            EngineConfig::default(),
            store.clone(),
            clock.clone(),
        );
        (engine, store, clock)
    }

    #[test]
    fn click_then_buy_first_device() {
        let (mut engine, _, _) = engine();
        for _ in 0..3 {
            assert_eq!(engine.click(), 5.0);
        }
        engine.buy_device("punchCard").unwrap();
        assert_eq!(engine.snapshot().total_data, 0.0);
        assert!((engine.estimated_rate() - 4.0).abs() < 1e-12);
        let events = engine.drain_events();
        assert!(events.contains(&EngineEvent::DevicePurchased {
            device: "punchCard".into(),
            count: 1
        }));
        assert!(events.contains(&EngineEvent::AchievementUnlocked("d_count_punchCard_0".into())));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn rejected_purchase_changes_nothing() {
        let (mut engine, _, _) = engine();
        let before = engine.snapshot().clone();
        assert!(engine.buy_device("punchCard").is_err());
        assert!(engine.buy_upgrade("nope").is_err());
        assert_eq!(engine.snapshot(), &before);
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn tick_is_clamped() {
        let (mut engine, _, _) = engine();
        engine.state.device_mut("floppy").unwrap().count = 1;
        engine.tick(60.0);
        let progress = engine.snapshot().device("floppy").unwrap().progress;
        assert!((progress - 0.1).abs() < 1e-12);
        engine.tick(f64::NAN);
        engine.tick(-1.0);
        let progress = engine.snapshot().device("floppy").unwrap().progress;
        assert!((progress - 0.1).abs() < 1e-12);
    }

    #[test]
    fn unchecked_negative_step_stalls_instead_of_panicking() {
        let config = EngineConfig {
            max_tick_seconds: -1.0,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(
            Catalog::standard(),
            config,
            MemoryStore::new(),
            ManualClock::new(0),
        );
        engine.state.device_mut("floppy").unwrap().count = 1;
        engine.tick(0.05);
        engine.frame(0.0);
        engine.frame(50.0);
        assert_eq!(engine.snapshot().device("floppy").unwrap().progress, 0.0);
    }

    #[test]
    fn frame_clamps_simulation_but_not_timers() {
        let (mut engine, store, _) = engine();
        engine.state.device_mut("punchCard").unwrap().count = 1;
        engine.frame(0.0);
        engine.frame(31_000.0);
        let progress = engine.snapshot().device("punchCard").unwrap().progress;
        assert!((progress - 0.1).abs() < 1e-12);
        assert!(store.get("dataStorageGameSave").is_some());
        assert!(engine.drain_events().contains(&EngineEvent::Autosaved));
    }

    #[test]
    fn trivia_waits_for_first_device() {
        let (mut engine, _, _) = engine();
        engine.update_setting(Setting::AutoSaveInterval(0));
        for _ in 0..1300 {
            engine.tick(0.1);
        }
        assert!(!engine.drain_events().contains(&EngineEvent::TriviaDue));
        engine.state.device_mut("punchCard").unwrap().count = 1;
        for _ in 0..1300 {
            engine.tick(0.1);
        }
        assert!(engine.drain_events().contains(&EngineEvent::TriviaDue));
    }

    #[test]
    fn event_queue_is_bounded() {
        let config = EngineConfig {
            event_capacity: 2,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(
            Catalog::standard(),
            config,
            MemoryStore::new(),
            ManualClock::new(0),
        );
        engine.state.total_data = 1e9;
        for _ in 0..5 {
            engine.buy_device("punchCard").unwrap();
        }
        let events = engine.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            EngineEvent::DevicePurchased {
                device: "punchCard".into(),
                count: 5
            }
        );
    }

    #[test]
    fn string_settings() {
        let (mut engine, _, _) = engine();
        engine.update_setting_str("numberFormat", "long").unwrap();
        assert_eq!(engine.snapshot().settings.number_format, NumberFormat::Long);
        assert_eq!(engine.format_data(1_234_567.0), "1,234,567");
        assert!(engine.update_setting_str("numberFormat", "huge").is_err());
        engine.update_setting_str("autoSaveInterval", "0").unwrap();
        assert!(!engine.scheduler().autosave.is_active());
    }

    #[test]
    fn dispatch_routes_commands() {
        let (mut engine, store, _) = engine();
        assert_eq!(
            engine.dispatch(Command::Click).unwrap(),
            CommandOutcome::Clicked(5.0)
        );
        assert_eq!(
            engine.dispatch(Command::BuyDevice("punchCard".into())),
            Err(CommandError::Purchase(PurchaseError::InsufficientResource {
                cost: 15.0,
                available: 5.0
            }))
        );
        assert!(matches!(
            engine.dispatch(Command::Save),
            Ok(CommandOutcome::Saved(_))
        ));
        assert!(store.get("dataStorageGameSave").is_some());
        assert_eq!(engine.dispatch(Command::Reset).unwrap(), CommandOutcome::Reset);
        assert!(store.get("dataStorageGameSave").is_none());
        assert_eq!(engine.snapshot().total_data, 0.0);
    }

    #[test]
    fn device_views_follow_tier_order() {
        let (mut engine, _, _) = engine();
        engine.state.device_mut("punchCard").unwrap().count = 2;
        engine.state.device_mut("punchCard").unwrap().progress = 5.0;
        let views = engine.devices();
        assert_eq!(views.len(), 9);
        assert_eq!(views[0].id, "punchCard");
        assert_eq!(views[0].output_per_cycle, 160.0);
        assert!((views[0].progress_fraction - 0.25).abs() < 1e-12);
        assert!(views[0].revealed);
        assert!(!views[1].revealed);
        assert!(engine.device_view("betamax").is_none());
    }

    #[test]
    fn click_power_includes_rate_share() {
        let (mut engine, _, _) = engine();
        engine.state.device_mut("punchCard").unwrap().count = 50;
        engine.state.total_data = 1e6;
        engine.buy_upgrade("punchCard_click_3").unwrap();
        let expected = 5.0 + engine.estimated_rate() * 0.01;
        assert!((engine.click_power() - expected).abs() < 1e-9);
    }
}
