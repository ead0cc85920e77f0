//! Game logic: pure functions over the progression state, fully testable.
//!
//! Nothing here touches storage, clocks or the event queue. The engine
//! wraps these functions and turns their outcomes into events.

use log::{debug, warn};

use crate::catalog::{device_cost, Catalog, UpgradeDefinition, UpgradeEffect, REVEAL_DIVISOR};
use crate::error::PurchaseError;
use crate::multiplier;
use crate::state::{DeviceState, ProgressionState};

/// Devices revealed and achievements unlocked by one operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Unlocks {
    pub revealed: Vec<String>,
    pub achievements: Vec<String>,
}

impl Unlocks {
    pub fn is_empty(&self) -> bool {
        self.revealed.is_empty() && self.achievements.is_empty()
    }
}

/// Cycles finished by one device during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub device: String,
    pub cycles: u64,
    pub amount: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    /// Data credited this tick.
    pub income: f64,
    pub completions: Vec<Completion>,
    pub unlocks: Unlocks,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClickOutcome {
    pub amount: f64,
    pub unlocks: Unlocks,
}

/// Result of a successful purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    pub cost: f64,
    pub unlocks: Unlocks,
}

/// Advance every owned device by `delta` seconds.
///
/// Callers clamp `delta`; a single call may still complete several cycles
/// of a fast device. The sub-cycle remainder is carried over.
pub fn advance(catalog: &Catalog, state: &mut ProgressionState, delta: f64) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    if !(delta.is_finite() && delta > 0.0) {
        return outcome;
    }

    let mut income = 0.0;
    for def in catalog.devices() {
        let Some(device) = state.device(&def.id) else {
            continue;
        };
        if device.is_idle() {
            continue;
        }
        // Composed per tick: a purchase may have changed the multipliers.
        let production = multiplier::compose(def, state, device);
        let (cycles, remainder) = split_cycles(device.progress + delta, production.cycle_duration);

        if let Some(device) = state.device_mut(&def.id) {
            device.progress = remainder;
        }
        if cycles > 0 {
            let amount = cycles as f64 * production.output_per_cycle;
            debug!("{}: {cycles} cycle(s), +{amount}", def.id);
            income += amount;
            outcome.completions.push(Completion {
                device: def.id.clone(),
                cycles,
                amount,
            });
        }
    }

    outcome.income = state.credit(income);
    if outcome.income > 0.0 {
        outcome.unlocks = refresh_unlocks(catalog, state);
    }
    outcome
}

/// Whole cycles contained in `progress` and the leftover, which always lies
/// in `[0, cycle)`.
fn split_cycles(progress: f64, cycle: f64) -> (u64, f64) {
    if !(cycle.is_finite() && cycle > 0.0) || progress < cycle {
        return (0, progress.max(0.0));
    }
    let mut cycles = (progress / cycle).floor();
    let mut remainder = progress - cycles * cycle;
    if remainder >= cycle {
        cycles += 1.0;
        remainder -= cycle;
    }
    (cycles as u64, remainder.max(0.0))
}

/// Data awarded by one click at the given production rate.
pub fn click_value(state: &ProgressionState, estimated_rate: f64) -> f64 {
    state.click_power + estimated_rate * state.dps_to_click_rate
}

pub fn click(catalog: &Catalog, state: &mut ProgressionState, estimated_rate: f64) -> ClickOutcome {
    let amount = state.credit(click_value(state, estimated_rate));
    let unlocks = refresh_unlocks(catalog, state);
    ClickOutcome { amount, unlocks }
}

pub fn buy_device(
    catalog: &Catalog,
    state: &mut ProgressionState,
    id: &str,
) -> Result<Receipt, PurchaseError> {
    let unknown = || PurchaseError::UnknownEntityId(id.into());
    let def = catalog.device(id).ok_or_else(unknown)?;
    let cost = state.device(id).ok_or_else(unknown)?.cost;
    if state.total_data < cost {
        return Err(PurchaseError::InsufficientResource {
            cost,
            available: state.total_data,
        });
    }

    state.spend(cost);
    if let Some(device) = state.device_mut(id) {
        device.count += 1;
        device.cost = device_cost(def.cost, device.count);
        debug!("bought {id} #{} for {cost}, next {}", device.count, device.cost);
    }

    let unlocks = refresh_unlocks(catalog, state);
    Ok(Receipt { cost, unlocks })
}

pub fn buy_upgrade(
    catalog: &Catalog,
    state: &mut ProgressionState,
    id: &str,
) -> Result<Receipt, PurchaseError> {
    let def = catalog
        .upgrade(id)
        .ok_or_else(|| PurchaseError::UnknownEntityId(id.into()))?;
    if state.owns_upgrade(id) {
        return Err(PurchaseError::AlreadyOwned(id.into()));
    }
    if !def.requirement.is_met(state) {
        return Err(PurchaseError::RequirementNotMet(id.into()));
    }
    if state.total_data < def.cost {
        return Err(PurchaseError::InsufficientResource {
            cost: def.cost,
            available: state.total_data,
        });
    }

    state.spend(def.cost);
    state.upgrades.insert(def.id.clone());
    apply_effect(state, &def.effect);
    debug!("bought upgrade {id} for {}", def.cost);

    let unlocks = refresh_unlocks(catalog, state);
    Ok(Receipt {
        cost: def.cost,
        unlocks,
    })
}

fn with_device(state: &mut ProgressionState, id: &str, f: impl FnOnce(&mut DeviceState)) {
    let device = state.device_mut(id);
    debug_assert!(device.is_some(), "upgrade effect targets unknown device {id}");
    match device {
        Some(device) => f(device),
        None => warn!("upgrade effect targets unknown device {id}"),
    }
}

fn add_synergy(state: &mut ProgressionState, target: &str, source: &str, rate: f64) {
    with_device(state, target, |device| {
        let entry = device
            .cross_synergy_sources
            .entry(source.to_string())
            .or_insert(rate);
        *entry = entry.max(rate);
    });
}

/// Apply an upgrade's effect. Called once, when the upgrade is bought.
pub fn apply_effect(state: &mut ProgressionState, effect: &UpgradeEffect) {
    match effect {
        UpgradeEffect::Speed { device, factor } => {
            with_device(state, device, |d| d.speed_multiplier *= factor)
        }
        UpgradeEffect::Amount { device, factor } => {
            with_device(state, device, |d| d.amount_multiplier *= factor)
        }
        UpgradeEffect::CreatorBuff { device, buff } => {
            with_device(state, device, |d| d.creator_buff = *buff)
        }
        UpgradeEffect::SelfSynergy { device } => {
            with_device(state, device, |d| d.has_self_synergy = true)
        }
        UpgradeEffect::CrossSynergy { target, source, rate } => {
            add_synergy(state, target, source, *rate)
        }
        UpgradeEffect::SynergyMesh { devices, rate } => {
            for target in devices {
                for source in devices.iter().filter(|s| *s != target) {
                    add_synergy(state, target, source, *rate);
                }
            }
        }
        UpgradeEffect::ClickMultiplier(factor) => state.click_power *= factor,
        UpgradeEffect::DpsToClick(rate) => state.dps_to_click_rate = *rate,
    }
}

/// Unlock every achievement whose requirement now holds. Unlocked ones are
/// never re-evaluated.
pub fn check_achievements(catalog: &Catalog, state: &mut ProgressionState) -> Vec<String> {
    let newly: Vec<String> = catalog
        .achievements()
        .iter()
        .filter(|a| !state.has_achievement(&a.id) && a.requirement.is_met(state))
        .map(|a| a.id.clone())
        .collect();
    for id in &newly {
        debug!("achievement unlocked: {id}");
        state.achievements.insert(id.clone());
    }
    newly
}

/// Reveal every device whose threshold the current data total has reached.
pub fn check_revelations(catalog: &Catalog, state: &mut ProgressionState) -> Vec<String> {
    let newly: Vec<String> = catalog
        .devices()
        .iter()
        .filter(|d| !state.is_revealed(&d.id) && state.total_data >= d.cost / REVEAL_DIVISOR)
        .map(|d| d.id.clone())
        .collect();
    for id in &newly {
        debug!("device revealed: {id}");
        state.revealed_devices.insert(id.clone());
    }
    newly
}

pub fn refresh_unlocks(catalog: &Catalog, state: &mut ProgressionState) -> Unlocks {
    Unlocks {
        revealed: check_revelations(catalog, state),
        achievements: check_achievements(catalog, state),
    }
}

/// Unowned upgrades whose requirement holds, cheapest first.
pub fn available_upgrades<'a>(
    catalog: &'a Catalog,
    state: &ProgressionState,
) -> Vec<&'a UpgradeDefinition> {
    let mut list: Vec<&UpgradeDefinition> = catalog
        .upgrades()
        .iter()
        .filter(|u| !state.owns_upgrade(&u.id) && u.requirement.is_met(state))
        .collect();
    list.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    list
}

pub fn can_afford_device(state: &ProgressionState, id: &str) -> bool {
    state.device(id).is_some_and(|d| state.total_data >= d.cost)
}

pub fn can_afford_upgrade(catalog: &Catalog, state: &ProgressionState, id: &str) -> bool {
    catalog
        .upgrade(id)
        .is_some_and(|u| !state.owns_upgrade(id) && state.total_data >= u.cost)
}
