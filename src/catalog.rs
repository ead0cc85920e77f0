//! Static game content: device definitions and the upgrade/achievement
//! catalogs derived from them.
//!
//! Everything here is a pure function of the device table. Upgrades and
//! achievements carry small descriptors ([`Requirement`], [`UpgradeEffect`])
//! instead of closures; `logic` interprets them against the live state.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::format::format_number;
use crate::state::{NumberFormat, ProgressionState};

/// Each purchase multiplies a device's price by this factor.
pub const COST_GROWTH: f64 = 1.30;
/// Speed and amount ladders each have this many tiers per device.
pub const LADDER_LENGTH: usize = 100;
/// A device is revealed once total data reaches `cost / REVEAL_DIVISOR`.
pub const REVEAL_DIVISOR: f64 = 3.0;
/// Creator buff installed by a device's creator upgrade.
pub const CREATOR_BUFF: f64 = 1.5;
/// Per-unit bonus a tier grants to its predecessor.
pub const CROSS_SYNERGY_RATE: f64 = 0.01;
/// Per-unit bonus of the storage hierarchy mesh.
pub const MESH_SYNERGY_RATE: f64 = 0.1;

const COUNT_TIERS: [u64; 8] = [1, 10, 25, 50, 100, 250, 500, 1000];
const DATA_MILESTONES: [f64; 8] = [1e6, 1e9, 1e12, 1e15, 1e18, 1e21, 1e24, 1e27];
const MESH_DEVICES: [&str; 3] = ["hdd", "sata", "nvme"];

/// Price of the next unit when `count` units are already owned.
pub fn device_cost(base_cost: f64, count: u64) -> f64 {
    (base_cost * COST_GROWTH.powf(count as f64)).floor()
}

/// Multiplicative effect of ladder tier `tier` (0-indexed).
pub fn ladder_effect(tier: usize) -> f64 {
    1.0 + (0.25 + 0.05 * tier as f64)
}

/// Standard subtractive Roman numerals. Values below 1 fall back to decimal.
pub fn to_roman(n: i64) -> String {
    if n < 1 {
        return n.to_string();
    }
    const NUMERALS: [(i64, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut rest = n;
    let mut out = String::new();
    for (value, symbol) in NUMERALS {
        while rest >= value {
            out.push_str(symbol);
            rest -= value;
        }
    }
    out
}

/// Static stats of one device kind. The table order is the tier order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub creator: String,
    /// Price of the first unit.
    pub cost: f64,
    /// Seconds per production cycle before speed upgrades.
    pub base_time: f64,
    /// Data produced per unit per cycle before amount upgrades.
    pub base_amount: f64,
    /// Display name of the speed ladder ("RPM Boost").
    #[serde(default)]
    pub speed_ladder: String,
    /// Display name of the amount ladder ("Extra Platters").
    #[serde(default)]
    pub amount_ladder: String,
}

impl DeviceDefinition {
    fn new(
        id: &str,
        name: &str,
        creator: &str,
        cost: f64,
        base_time: f64,
        base_amount: f64,
        ladders: (&str, &str),
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            creator: creator.into(),
            cost,
            base_time,
            base_amount,
            speed_ladder: ladders.0.into(),
            amount_ladder: ladders.1.into(),
        }
    }

    fn check(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidDevice {
            id: self.id.clone(),
            reason: reason.into(),
        };
        if self.id.is_empty() {
            return Err(invalid("empty id"));
        }
        if !(self.cost.is_finite() && self.cost > 0.0) {
            return Err(invalid("cost must be positive"));
        }
        if !(self.base_time.is_finite() && self.base_time > 0.0) {
            return Err(invalid("base time must be positive"));
        }
        if !(self.base_amount.is_finite() && self.base_amount >= 0.0) {
            return Err(invalid("base amount must be non-negative"));
        }
        Ok(())
    }
}

/// The shipped device table, early game to endgame.
#[rustfmt::skip]
pub fn standard_devices() -> Vec<DeviceDefinition> {
    vec![
        DeviceDefinition::new(
            "punchCard", "Punch Card", "Herman Hollerith", 15.0, 20.0, 80.0,
            ("Accelerated Mechanism", "Bigger Cards"),
        ),
        DeviceDefinition::new(
            "floppy", "Floppy Disk", "Alan Shugart", 1000.0, 15.0, 2000.0,
            ("Faster Motor", "Extra Sectors"),
        ),
        DeviceDefinition::new(
            "zipDrive", "Zip Drive", "Iomega Corp", 8e4, 12.0, 25_000.0,
            ("Voice Coil Actuator", "Cobalt Particles"),
        ),
        DeviceDefinition::new(
            "hdd", "Hard Disk", "Reynold B. Johnson", 5e6, 8.0, 2.5e5,
            ("RPM Boost", "Extra Platters"),
        ),
        DeviceDefinition::new(
            "sata", "SATA SSD", "SATA-IO", 4e8, 4.0, 5e6,
            ("AHCI Protocol", "MLC Cells"),
        ),
        DeviceDefinition::new(
            "nvme", "NVMe SSD", "NVM Express Workgroup", 9e10, 2.5, 1e8,
            ("Phison Controller", "3D QLC NAND"),
        ),
        DeviceDefinition::new(
            "dataCenter", "Data Center", "Uptime Institute", 3e14, 1.0, 5e9,
            ("100GbE Network", "Server Virtualization"),
        ),
        DeviceDefinition::new(
            "cloudStorage", "Cloud Storage", "J. C. R. Licklider", 8e18, 0.5, 2e12,
            ("Global CDN", "Object Storage"),
        ),
        DeviceDefinition::new(
            "quantumDrive", "Quantum Drive", "David Deutsch", 2e24, 0.1, 1e15,
            ("Quantum Error Correction", "State Superposition"),
        ),
    ]
}

/// Predicate over the progression state that gates an upgrade or unlocks an
/// achievement. Every variant is monotone in normal play.
#[derive(Clone, Debug, PartialEq)]
pub enum Requirement {
    /// `device` owned count is at least `at_least`.
    DeviceCount { device: String, at_least: u64 },
    /// Every listed device is owned at least once.
    AllOwned(Vec<String>),
    /// Lifetime data earned is at least the threshold.
    TotalEarned(f64),
}

impl Requirement {
    pub fn is_met(&self, state: &ProgressionState) -> bool {
        match self {
            Requirement::DeviceCount { device, at_least } => {
                state.device_count(device) >= *at_least
            }
            Requirement::AllOwned(devices) => devices.iter().all(|d| state.device_count(d) >= 1),
            Requirement::TotalEarned(threshold) => state.total_earned >= *threshold,
        }
    }

    fn devices(&self) -> Vec<&str> {
        match self {
            Requirement::DeviceCount { device, .. } => vec![device.as_str()],
            Requirement::AllOwned(devices) => devices.iter().map(String::as_str).collect(),
            Requirement::TotalEarned(_) => Vec::new(),
        }
    }
}

/// What buying an upgrade does. Applied exactly once, by `logic::apply_effect`.
#[derive(Clone, Debug, PartialEq)]
pub enum UpgradeEffect {
    /// Multiply the device's speed multiplier.
    Speed { device: String, factor: f64 },
    /// Multiply the device's amount multiplier.
    Amount { device: String, factor: f64 },
    /// Set the device's creator buff.
    CreatorBuff { device: String, buff: f64 },
    /// Enable the count-proportional self bonus.
    SelfSynergy { device: String },
    /// Each unit of `source` raises `target` output by `rate`.
    CrossSynergy { target: String, source: String, rate: f64 },
    /// Every device in the group boosts every other one by `rate` per unit.
    SynergyMesh { devices: Vec<String>, rate: f64 },
    /// Multiply base click power.
    ClickMultiplier(f64),
    /// Set the fraction of the production rate added to each click.
    DpsToClick(f64),
}

impl UpgradeEffect {
    fn devices(&self) -> Vec<&str> {
        match self {
            UpgradeEffect::Speed { device, .. }
            | UpgradeEffect::Amount { device, .. }
            | UpgradeEffect::CreatorBuff { device, .. }
            | UpgradeEffect::SelfSynergy { device } => vec![device.as_str()],
            UpgradeEffect::CrossSynergy { target, source, .. } => {
                vec![target.as_str(), source.as_str()]
            }
            UpgradeEffect::SynergyMesh { devices, .. } => {
                devices.iter().map(String::as_str).collect()
            }
            UpgradeEffect::ClickMultiplier(_) | UpgradeEffect::DpsToClick(_) => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: f64,
    pub requirement: Requirement,
    pub effect: UpgradeEffect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub requirement: Requirement,
}

/// Read-only game content shared by every engine operation.
#[derive(Clone, Debug)]
pub struct Catalog {
    devices: Vec<DeviceDefinition>,
    upgrades: Vec<UpgradeDefinition>,
    achievements: Vec<AchievementDefinition>,
    device_index: HashMap<String, usize>,
    upgrade_index: HashMap<String, usize>,
    achievement_index: HashMap<String, usize>,
}

impl Catalog {
    /// The shipped catalog.
    pub fn standard() -> Self {
        let catalog = Self::build(standard_devices());
        debug_assert!(catalog.validate().is_ok(), "standard catalog is miswired");
        catalog
    }

    /// Build and validate a catalog from a custom device table.
    pub fn generate(devices: Vec<DeviceDefinition>) -> Result<Self, CatalogError> {
        if devices.is_empty() {
            return Err(CatalogError::EmptyDeviceTable);
        }
        let mut seen = HashSet::new();
        for def in &devices {
            def.check()?;
            if !seen.insert(def.id.as_str()) {
                return Err(CatalogError::DuplicateId(def.id.clone()));
            }
        }
        let catalog = Self::build(devices);
        catalog.validate()?;
        Ok(catalog)
    }

    /// Build a catalog from a JSON array of device definitions.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let devices: Vec<DeviceDefinition> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::generate(devices)
    }

    fn build(devices: Vec<DeviceDefinition>) -> Self {
        let upgrades = generate_upgrades(&devices);
        let achievements = generate_achievements(&devices);
        let device_index = index_by(&devices, |d| &d.id);
        let upgrade_index = index_by(&upgrades, |u| &u.id);
        let achievement_index = index_by(&achievements, |a| &a.id);
        Self {
            devices,
            upgrades,
            achievements,
            device_index,
            upgrade_index,
            achievement_index,
        }
    }

    /// Check that ids are unique and every descriptor names a real device.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for upgrade in &self.upgrades {
            if !seen.insert(upgrade.id.as_str()) {
                return Err(CatalogError::DuplicateId(upgrade.id.clone()));
            }
            let referenced = upgrade
                .effect
                .devices()
                .into_iter()
                .chain(upgrade.requirement.devices());
            for device in referenced {
                if self.device(device).is_none() {
                    return Err(CatalogError::DanglingReference {
                        upgrade: upgrade.id.clone(),
                        device: device.into(),
                    });
                }
            }
        }
        let mut seen = HashSet::new();
        for achievement in &self.achievements {
            if !seen.insert(achievement.id.as_str()) {
                return Err(CatalogError::DuplicateId(achievement.id.clone()));
            }
        }
        Ok(())
    }

    pub fn devices(&self) -> &[DeviceDefinition] {
        &self.devices
    }

    pub fn device(&self, id: &str) -> Option<&DeviceDefinition> {
        self.device_index.get(id).map(|&i| &self.devices[i])
    }

    pub fn upgrades(&self) -> &[UpgradeDefinition] {
        &self.upgrades
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDefinition> {
        self.upgrade_index.get(id).map(|&i| &self.upgrades[i])
    }

    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    pub fn achievement(&self, id: &str) -> Option<&AchievementDefinition> {
        self.achievement_index.get(id).map(|&i| &self.achievements[i])
    }
}

fn index_by<T>(items: &[T], key: impl Fn(&T) -> &String) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (key(item).clone(), i))
        .collect()
}

fn count_at_least(device: &str, at_least: u64) -> Requirement {
    Requirement::DeviceCount {
        device: device.into(),
        at_least,
    }
}

fn ladder_name(label: &str, fallback: &str, device: &DeviceDefinition) -> String {
    if label.is_empty() {
        format!("{} {}", device.name, fallback)
    } else {
        label.to_string()
    }
}

fn generate_upgrades(devices: &[DeviceDefinition]) -> Vec<UpgradeDefinition> {
    let mut upgrades = Vec::with_capacity(devices.len() * (2 * LADDER_LENGTH + 3) + 4);

    for (index, def) in devices.iter().enumerate() {
        let speed_label = ladder_name(&def.speed_ladder, "Overclock", def);
        let amount_label = ladder_name(&def.amount_ladder, "Expansion", def);

        for i in 0..LADDER_LENGTH {
            let effect = ladder_effect(i);
            let percent = ((effect - 1.0) * 100.0).round();
            let tier = to_roman(i as i64 + 1);
            let step = 5 * i as u64;

            upgrades.push(UpgradeDefinition {
                id: format!("{}_speed_{}", def.id, i),
                name: format!("{speed_label} {tier}"),
                description: format!("Increases {} transfer speed by {percent}%.", def.name),
                cost: def.cost * 40.0 * 2.8_f64.powi(i as i32),
                requirement: count_at_least(&def.id, 5 + step),
                effect: UpgradeEffect::Speed {
                    device: def.id.clone(),
                    factor: effect,
                },
            });
            upgrades.push(UpgradeDefinition {
                id: format!("{}_amount_{}", def.id, i),
                name: format!("{amount_label} {tier}"),
                description: format!("Increases {} data per cycle by {percent}%.", def.name),
                cost: def.cost * 30.0 * 2.7_f64.powi(i as i32),
                requirement: count_at_least(&def.id, 1 + step),
                effect: UpgradeEffect::Amount {
                    device: def.id.clone(),
                    factor: effect,
                },
            });
        }

        let creator = if def.creator.is_empty() {
            def.name.as_str()
        } else {
            def.creator.as_str()
        };
        upgrades.push(UpgradeDefinition {
            id: format!("{}_creator", def.id),
            name: format!("{creator}'s Vision"),
            description: format!("Boosts the effect of every other {} upgrade by 50%.", def.name),
            cost: def.cost * 1e6,
            requirement: count_at_least(&def.id, 50),
            effect: UpgradeEffect::CreatorBuff {
                device: def.id.clone(),
                buff: CREATOR_BUFF,
            },
        });

        upgrades.push(UpgradeDefinition {
            id: format!("{}_self_synergy", def.id),
            name: format!("Adaptive Firmware: {}", def.name),
            description: format!("Each {} owned adds 0.5% to its data per cycle.", def.name),
            cost: def.cost * 2500.0,
            requirement: count_at_least(&def.id, 25),
            effect: UpgradeEffect::SelfSynergy {
                device: def.id.clone(),
            },
        });

        if index > 0 {
            let prev = &devices[index - 1];
            upgrades.push(UpgradeDefinition {
                id: format!("{}_cross_synergy_{}", def.id, prev.id),
                name: format!("Synergy: {}", def.name),
                description: format!("Each {} raises {} output by 1%.", def.name, prev.name),
                cost: def.cost * 5000.0,
                requirement: count_at_least(&def.id, 10),
                effect: UpgradeEffect::CrossSynergy {
                    target: prev.id.clone(),
                    source: def.id.clone(),
                    rate: CROSS_SYNERGY_RATE,
                },
            });
        }
    }

    let has = |id: &str| devices.iter().any(|d| d.id == id);
    if MESH_DEVICES.iter().all(|&id| has(id)) {
        let mesh: Vec<String> = MESH_DEVICES.iter().map(|s| s.to_string()).collect();
        upgrades.push(UpgradeDefinition {
            id: format!("triple_synergy_{}", MESH_DEVICES.join("_")),
            name: "Storage Hierarchy".into(),
            description: "Hard disks, SATA SSDs and NVMe SSDs raise each other's output by 10% per unit."
                .into(),
            cost: 5e9,
            requirement: Requirement::AllOwned(mesh.clone()),
            effect: UpgradeEffect::SynergyMesh {
                devices: mesh,
                rate: MESH_SYNERGY_RATE,
            },
        });
    }

    // Click upgrades hang off the first tier.
    if let Some(first) = devices.first() {
        let clicks = [
            ("Nimble Fingers", "Doubles your click power.", 750.0, 10, UpgradeEffect::ClickMultiplier(2.0)),
            ("Card Mouse", "Triples your click power.", 15_000.0, 25, UpgradeEffect::ClickMultiplier(3.0)),
            (
                "Synergetic Click",
                "Adds 1% of your total production rate to each click.",
                150_000.0,
                50,
                UpgradeEffect::DpsToClick(0.01),
            ),
        ];
        for (n, (name, description, cost, at_least, effect)) in clicks.into_iter().enumerate() {
            upgrades.push(UpgradeDefinition {
                id: format!("{}_click_{}", first.id, n + 1),
                name: name.into(),
                description: description.into(),
                cost,
                requirement: count_at_least(&first.id, at_least),
                effect,
            });
        }
    }

    upgrades
}

fn generate_achievements(devices: &[DeviceDefinition]) -> Vec<AchievementDefinition> {
    let mut achievements = Vec::with_capacity(devices.len() * COUNT_TIERS.len() + DATA_MILESTONES.len());

    for def in devices {
        for (i, &tier) in COUNT_TIERS.iter().enumerate() {
            achievements.push(AchievementDefinition {
                id: format!("d_count_{}_{}", def.id, i),
                name: format!("{} Collector {}", def.name, to_roman(i as i64 + 1)),
                description: format!("Own {tier} × {}.", def.name),
                requirement: count_at_least(&def.id, tier),
            });
        }
    }

    for (i, &milestone) in DATA_MILESTONES.iter().enumerate() {
        achievements.push(AchievementDefinition {
            id: format!("data_{i}"),
            name: format!("Data Hoarder {}", to_roman(i as i64 + 1)),
            description: format!(
                "Accumulate {} of data.",
                format_number(milestone, NumberFormat::Short)
            ),
            requirement: Requirement::TotalEarned(milestone),
        });
    }

    achievements
}
