//! Save/load of the progression state.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION`: current snapshot format. Bump when fields are added.
//! - `MIN_COMPATIBLE_VERSION`: oldest format that can still be merged. Bump
//!   only when an existing field changes meaning or is removed.
//!
//! Snapshots without a `version` field predate versioning and count as
//! version 1. Every field of a snapshot is optional: whatever is missing is
//! taken from the defaults, so saves from older catalogs load cleanly.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::{device_cost, Catalog};
use crate::error::{SnapshotError, StoreError};
use crate::state::{NumberFormat, ProgressionState, Settings};

/// Snapshot format written by this build.
pub const SAVE_VERSION: u32 = 2;

/// Oldest snapshot format that is still merged instead of discarded.
pub const MIN_COMPATIBLE_VERSION: u32 = 1;

/// External key-value byte store holding the snapshot.
pub trait SnapshotStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process store. Clones share the same entries, so a test can keep a
/// handle while the engine owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.borrow_mut().insert(key.into(), bytes.into());
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.insert(key, bytes);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Browser `localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
fn get_storage() -> Result<web_sys::Storage, StoreError> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .ok_or(StoreError::Unavailable)
}

#[cfg(target_arch = "wasm32")]
impl SnapshotStore for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        get_storage()?
            .get_item(key)
            .map(|item| item.map(String::into_bytes))
            .map_err(|e| StoreError::Read(format!("{e:?}")))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let text = std::str::from_utf8(bytes).map_err(|e| StoreError::Write(e.to_string()))?;
        get_storage()?
            .set_item(key, text)
            .map_err(|e| StoreError::Write(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        get_storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Write(format!("{e:?}")))
    }
}

#[derive(Serialize)]
struct SaveEnvelope<'a> {
    version: u32,
    #[serde(flatten)]
    state: &'a ProgressionState,
}

/// Stamp the state with `now_ms` and encode it.
pub fn serialize(state: &mut ProgressionState, now_ms: u64) -> Result<Vec<u8>, SnapshotError> {
    state.last_save_time = Some(now_ms);
    serde_json::to_vec(&SaveEnvelope {
        version: SAVE_VERSION,
        state,
    })
    .map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// A snapshot as found in storage: every field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub version: Option<u32>,
    pub total_data: Option<f64>,
    pub total_earned: Option<f64>,
    pub click_power: Option<f64>,
    pub dps_to_click_rate: Option<f64>,
    pub last_save_time: Option<f64>,
    pub devices: Option<BTreeMap<String, StoredDevice>>,
    pub upgrades: Option<IdSet>,
    pub achievements: Option<IdSet>,
    pub revealed_devices: Option<IdSet>,
    pub settings: Option<StoredSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredDevice {
    pub count: Option<f64>,
    pub progress: Option<f64>,
    pub speed_multiplier: Option<f64>,
    pub amount_multiplier: Option<f64>,
    pub creator_buff: Option<f64>,
    pub has_self_synergy: Option<bool>,
    pub cross_synergy_sources: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredSettings {
    pub shadows_enabled: Option<bool>,
    pub floating_text_enabled: Option<bool>,
    pub number_format: Option<String>,
    pub auto_save_interval: Option<f64>,
}

/// Id sets are written as lists; legacy saves wrote `{ "id": true }` maps.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdSet {
    List(Vec<String>),
    Flags(BTreeMap<String, bool>),
}

impl IdSet {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            IdSet::List(ids) => ids.into_iter().collect(),
            IdSet::Flags(flags) => flags
                .into_iter()
                .filter_map(|(id, on)| on.then_some(id))
                .collect(),
        }
    }
}

fn finite_at_least(value: Option<f64>, default: f64, min: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= min => v,
        _ => default,
    }
}

fn whole(value: Option<f64>, default: u64) -> u64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v.floor() as u64,
        _ => default,
    }
}

fn merge_settings(settings: &mut Settings, stored: StoredSettings) {
    if let Some(on) = stored.shadows_enabled {
        settings.shadows_enabled = on;
    }
    if let Some(on) = stored.floating_text_enabled {
        settings.floating_text_enabled = on;
    }
    match stored.number_format.as_deref() {
        Some("short") => settings.number_format = NumberFormat::Short,
        Some("long") => settings.number_format = NumberFormat::Long,
        Some(other) => warn!("ignoring unknown number format {other:?}"),
        None => {}
    }
    settings.auto_save_interval = whole(stored.auto_save_interval, settings.auto_save_interval);
}

/// Overlay a stored snapshot onto `defaults`, field by field.
///
/// The defaults decide which devices exist: stored devices missing from
/// them are dropped, and catalog devices missing from the snapshot keep
/// their fresh state. Device cost is recomputed from the owned count.
/// Stored upgrade, achievement and revealed id sets replace the default
/// ones wholesale.
pub fn merge(catalog: &Catalog, defaults: ProgressionState, snapshot: StoredSnapshot) -> ProgressionState {
    let mut state = defaults;

    state.total_data = finite_at_least(snapshot.total_data, state.total_data, 0.0);
    state.total_earned =
        finite_at_least(snapshot.total_earned, state.total_earned, 0.0).max(state.total_data);
    state.click_power = finite_at_least(snapshot.click_power, state.click_power, 0.0);
    state.dps_to_click_rate = finite_at_least(snapshot.dps_to_click_rate, state.dps_to_click_rate, 0.0);
    if let Some(ts) = snapshot.last_save_time {
        state.last_save_time = (ts.is_finite() && ts >= 0.0).then_some(ts as u64);
    }

    let known: BTreeSet<String> = state.devices.keys().cloned().collect();
    let mut stored_devices = snapshot.devices.unwrap_or_default();
    for (id, device) in state.devices.iter_mut() {
        let Some(stored) = stored_devices.remove(id) else {
            continue;
        };
        device.count = whole(stored.count, device.count);
        device.progress = if device.count == 0 {
            0.0
        } else {
            finite_at_least(stored.progress, device.progress, 0.0)
        };
        device.speed_multiplier = finite_at_least(stored.speed_multiplier, device.speed_multiplier, 1.0);
        device.amount_multiplier =
            finite_at_least(stored.amount_multiplier, device.amount_multiplier, 1.0);
        device.creator_buff = finite_at_least(stored.creator_buff, device.creator_buff, 1.0);
        if let Some(on) = stored.has_self_synergy {
            device.has_self_synergy = on;
        }
        if let Some(sources) = stored.cross_synergy_sources {
            device.cross_synergy_sources = sources
                .into_iter()
                .filter(|(source, rate)| {
                    let keep = known.contains(source) && rate.is_finite() && *rate >= 0.0;
                    if !keep {
                        warn!("{id}: dropping stale synergy source {source}");
                    }
                    keep
                })
                .collect();
        }
        if let Some(def) = catalog.device(id) {
            device.cost = device_cost(def.cost, device.count);
        }
    }
    for id in stored_devices.keys() {
        warn!("dropping obsolete device {id} from save");
    }

    if let Some(ids) = snapshot.upgrades {
        state.upgrades = ids.into_set();
    }
    if let Some(ids) = snapshot.achievements {
        state.achievements = ids.into_set();
    }
    if let Some(ids) = snapshot.revealed_devices {
        state.revealed_devices = ids.into_set();
    }
    if let Some(settings) = snapshot.settings {
        merge_settings(&mut state.settings, settings);
    }

    state
}

/// Decode a snapshot and merge it over `defaults`.
pub fn deserialize(
    catalog: &Catalog,
    bytes: &[u8],
    defaults: ProgressionState,
) -> Result<ProgressionState, SnapshotError> {
    let snapshot: StoredSnapshot =
        serde_json::from_slice(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))?;

    let version = snapshot.version.unwrap_or(1);
    if version < MIN_COMPATIBLE_VERSION {
        return Err(SnapshotError::Incompatible {
            saved: version,
            min_compatible: MIN_COMPATIBLE_VERSION,
        });
    }
    if version < SAVE_VERSION {
        info!("migrating save from version {version} to {SAVE_VERSION}");
    } else if version > SAVE_VERSION {
        warn!("save version {version} is newer than {SAVE_VERSION}, loading known fields only");
    }

    Ok(merge(catalog, defaults, snapshot))
}
