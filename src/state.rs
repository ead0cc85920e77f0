//! Progression state: the single mutable aggregate behind a save.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, DeviceDefinition};
use crate::error::SettingError;

/// Base click power of a fresh game.
pub const DEFAULT_CLICK_POWER: f64 = 5.0;
/// Autosave period of a fresh game, in milliseconds.
pub const DEFAULT_AUTOSAVE_MS: u64 = 30_000;

/// Live counters and modifiers of one device kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub id: String,
    pub count: u64,
    /// Price of the next unit.
    pub cost: f64,
    /// Seconds accumulated toward the current cycle.
    pub progress: f64,
    pub speed_multiplier: f64,
    pub amount_multiplier: f64,
    pub creator_buff: f64,
    pub has_self_synergy: bool,
    /// Source device id → per-unit rate added to this device's output.
    pub cross_synergy_sources: BTreeMap<String, f64>,
}

impl DeviceState {
    pub fn new(def: &DeviceDefinition) -> Self {
        Self {
            id: def.id.clone(),
            count: 0,
            cost: def.cost,
            progress: 0.0,
            speed_multiplier: 1.0,
            amount_multiplier: 1.0,
            creator_buff: 1.0,
            has_self_synergy: false,
            cross_synergy_sources: BTreeMap::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.count == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// `1.50 MB`
    #[default]
    Short,
    /// `1,500,000`
    Long,
}

impl NumberFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberFormat::Short => "short",
            NumberFormat::Long => "long",
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player preferences. Visual toggles are stored for the presentation layer
/// and otherwise ignored by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub shadows_enabled: bool,
    pub floating_text_enabled: bool,
    pub number_format: NumberFormat,
    /// Milliseconds between autosaves; 0 disables autosave.
    pub auto_save_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shadows_enabled: true,
            floating_text_enabled: true,
            number_format: NumberFormat::Short,
            auto_save_interval: DEFAULT_AUTOSAVE_MS,
        }
    }
}

impl Settings {
    pub fn apply(&mut self, setting: &Setting) {
        match *setting {
            Setting::ShadowsEnabled(on) => self.shadows_enabled = on,
            Setting::FloatingTextEnabled(on) => self.floating_text_enabled = on,
            Setting::NumberFormat(format) => self.number_format = format,
            Setting::AutoSaveInterval(ms) => self.auto_save_interval = ms,
        }
    }
}

/// One settings change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setting {
    ShadowsEnabled(bool),
    FloatingTextEnabled(bool),
    NumberFormat(NumberFormat),
    AutoSaveInterval(u64),
}

impl Setting {
    /// Parse a string-keyed change, using the persisted key names.
    pub fn parse(key: &str, value: &str) -> Result<Self, SettingError> {
        let invalid = || SettingError::InvalidValue {
            key: key.into(),
            value: value.into(),
        };
        let flag = || match value.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(invalid()),
        };
        match key {
            "shadowsEnabled" => flag().map(Setting::ShadowsEnabled),
            "floatingTextEnabled" => flag().map(Setting::FloatingTextEnabled),
            "numberFormat" => match value.trim() {
                "short" => Ok(Setting::NumberFormat(NumberFormat::Short)),
                "long" => Ok(Setting::NumberFormat(NumberFormat::Long)),
                _ => Err(invalid()),
            },
            "autoSaveInterval" => value
                .trim()
                .parse::<u64>()
                .map(Setting::AutoSaveInterval)
                .map_err(|_| invalid()),
            _ => Err(SettingError::UnknownKey(key.into())),
        }
    }
}

/// Everything a save contains.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    /// Spendable data.
    pub total_data: f64,
    /// Data ever gained; purchases never lower it.
    pub total_earned: f64,
    pub click_power: f64,
    /// Fraction of the production rate added to each click.
    pub dps_to_click_rate: f64,
    /// Unix milliseconds of the last save, if any.
    pub last_save_time: Option<u64>,
    pub devices: BTreeMap<String, DeviceState>,
    pub upgrades: BTreeSet<String>,
    pub achievements: BTreeSet<String>,
    pub revealed_devices: BTreeSet<String>,
    pub settings: Settings,
}

impl ProgressionState {
    /// Fresh game: nothing owned, the first tier visible.
    pub fn new(catalog: &Catalog) -> Self {
        let devices = catalog
            .devices()
            .iter()
            .map(|def| (def.id.clone(), DeviceState::new(def)))
            .collect();
        let revealed_devices = catalog
            .devices()
            .first()
            .map(|def| def.id.clone())
            .into_iter()
            .collect();
        Self {
            total_data: 0.0,
            total_earned: 0.0,
            click_power: DEFAULT_CLICK_POWER,
            dps_to_click_rate: 0.0,
            last_save_time: None,
            devices,
            upgrades: BTreeSet::new(),
            achievements: BTreeSet::new(),
            revealed_devices,
            settings: Settings::default(),
        }
    }

    pub fn device(&self, id: &str) -> Option<&DeviceState> {
        self.devices.get(id)
    }

    pub fn device_mut(&mut self, id: &str) -> Option<&mut DeviceState> {
        self.devices.get_mut(id)
    }

    /// Owned count, 0 for ids not in the state.
    pub fn device_count(&self, id: &str) -> u64 {
        self.devices.get(id).map_or(0, |d| d.count)
    }

    pub fn owns_upgrade(&self, id: &str) -> bool {
        self.upgrades.contains(id)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.contains(id)
    }

    pub fn is_revealed(&self, id: &str) -> bool {
        self.revealed_devices.contains(id)
    }

    pub fn owns_any_device(&self) -> bool {
        self.devices.values().any(|d| d.count > 0)
    }

    /// Add income to both totals. Returns the amount actually credited.
    ///
    /// NaN and negative amounts are dropped; totals saturate at `f64::MAX`.
    pub fn credit(&mut self, amount: f64) -> f64 {
        if amount.is_nan() || amount < 0.0 {
            warn!("dropping invalid income {amount}");
            return 0.0;
        }
        if amount == 0.0 {
            return 0.0;
        }
        let before = self.total_data;
        self.total_data = saturating_add(self.total_data, amount);
        self.total_earned = saturating_add(self.total_earned, amount);
        self.total_data - before
    }

    /// Deduct a purchase. Callers check affordability first.
    pub(crate) fn spend(&mut self, cost: f64) {
        self.total_data = (self.total_data - cost).max(0.0);
    }
}

fn saturating_add(total: f64, amount: f64) -> f64 {
    let sum = total + amount;
    if sum.is_finite() {
        sum
    } else {
        warn!("data total overflowed, clamping to f64::MAX");
        f64::MAX
    }
}
