//! Offline catch-up: a single lump award for the time the game was closed.

use std::fmt;

use log::info;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::format::{format_duration, format_number};
use crate::multiplier::estimated_rate;
use crate::state::{NumberFormat, ProgressionState};

/// What the player earned while away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OfflineReport {
    /// Credited window in milliseconds, after the cap.
    pub elapsed_ms: u64,
    /// Production rate the award was computed with, per second.
    pub rate: f64,
    pub earned: f64,
}

impl OfflineReport {
    pub fn describe(&self, format: NumberFormat) -> String {
        format!(
            "While you were away for {}, your devices stored {}.",
            format_duration(self.elapsed_ms),
            format_number(self.earned, format)
        )
    }
}

impl fmt::Display for OfflineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(NumberFormat::Short))
    }
}

/// Credit `rate × elapsed` for the window since the last save.
///
/// Nothing is awarded without a save timestamp, for windows shorter than
/// the configured floor, or when nothing is producing. The window is capped
/// before the rate is applied.
pub fn reconcile(
    catalog: &Catalog,
    state: &mut ProgressionState,
    now_ms: u64,
    config: &EngineConfig,
) -> Option<OfflineReport> {
    let last = state.last_save_time?;
    let cap_ms = (config.offline_cap_seconds.max(0.0) * 1000.0) as u64;
    let elapsed_ms = now_ms.saturating_sub(last).min(cap_ms);
    let elapsed = elapsed_ms as f64 / 1000.0;
    if elapsed < config.offline_floor_seconds {
        return None;
    }

    let rate = estimated_rate(catalog, state);
    if rate <= 0.0 {
        return None;
    }

    let earned = state.credit(rate * elapsed);
    info!("offline for {elapsed}s at {rate}/s, awarded {earned}");
    Some(OfflineReport {
        elapsed_ms,
        rate,
        earned,
    })
}
