//! Multiplier composition: turns a device's base stats and modifiers into
//! an effective cycle duration and per-cycle output.

use log::warn;

use crate::catalog::{Catalog, DeviceDefinition};
use crate::state::{DeviceState, ProgressionState};

/// Self-synergy bonus per owned unit.
pub const SELF_SYNERGY_PER_UNIT: f64 = 0.005;

/// Amplify the excess of `base` over 1 by the creator buff.
pub fn buffed(base: f64, creator_buff: f64) -> f64 {
    1.0 + (base - 1.0) * creator_buff
}

pub fn speed_multiplier(device: &DeviceState) -> f64 {
    buffed(device.speed_multiplier, device.creator_buff)
}

/// Buffed amount multiplier, then self synergy, then one factor per
/// cross-synergy source.
pub fn amount_multiplier(state: &ProgressionState, device: &DeviceState) -> f64 {
    let mut total = buffed(device.amount_multiplier, device.creator_buff);
    if device.has_self_synergy {
        total *= 1.0 + device.count as f64 * SELF_SYNERGY_PER_UNIT;
    }
    for (source, rate) in &device.cross_synergy_sources {
        let source_state = state.device(source);
        debug_assert!(
            source_state.is_some(),
            "{} has a synergy from unknown device {source}",
            device.id
        );
        let count = source_state.map_or_else(
            || {
                warn!("{}: ignoring synergy from unknown device {source}", device.id);
                0
            },
            |d| d.count,
        );
        total *= 1.0 + count as f64 * rate;
    }
    total
}

/// Effective numbers for one device at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Production {
    pub speed_multiplier: f64,
    pub amount_multiplier: f64,
    /// Seconds per cycle.
    pub cycle_duration: f64,
    /// Data produced by all owned units per completed cycle.
    pub output_per_cycle: f64,
}

impl Production {
    /// Data per second.
    pub fn rate(&self) -> f64 {
        if self.cycle_duration > 0.0 {
            self.output_per_cycle / self.cycle_duration
        } else {
            0.0
        }
    }
}

pub fn compose(def: &DeviceDefinition, state: &ProgressionState, device: &DeviceState) -> Production {
    let speed = speed_multiplier(device);
    let amount = amount_multiplier(state, device);
    Production {
        speed_multiplier: speed,
        amount_multiplier: amount,
        cycle_duration: def.base_time / speed,
        output_per_cycle: device.count as f64 * def.base_amount * amount,
    }
}

/// Aggregate data per second over every owned device.
pub fn estimated_rate(catalog: &Catalog, state: &ProgressionState) -> f64 {
    catalog
        .devices()
        .iter()
        .filter_map(|def| state.device(&def.id).map(|d| (def, d)))
        .filter(|(_, d)| d.count > 0)
        .map(|(def, d)| compose(def, state, d).rate())
        .sum()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_buffed_formula(m in 1.0f64..1e6, b in 1.0f64..10.0) {
            let expected = 1.0 + (m - 1.0) * b;
            prop_assert!((buffed(m, b) - expected).abs() <= expected * 1e-12);
        }

        #[test]
        fn prop_buffed_identity(m in 0.0f64..1e9) {
            prop_assert!((buffed(m, 1.0) - m).abs() <= m.abs() * 1e-12 + 1e-12);
        }

        #[test]
        fn prop_buffed_never_below_base_for_upgrades(m in 1.0f64..1e6, b in 1.0f64..10.0) {
            prop_assert!(buffed(m, b) >= m);
        }
    }
}
