//! Player commands.
//!
//! Input layers translate their own events (clicks, keys, buttons) into a
//! [`Command`] and hand it to `Engine::dispatch`.

use crate::logic::Receipt;
use crate::state::Setting;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    // ── Core actions ────────────────────────────────────────────────
    Click,
    BuyDevice(String),
    BuyUpgrade(String),

    // ── Persistence ─────────────────────────────────────────────────
    Save,
    /// Wipe progress and the stored snapshot.
    Reset,

    // ── Settings ────────────────────────────────────────────────────
    UpdateSetting(Setting),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    /// Data awarded by the click.
    Clicked(f64),
    Purchased(Receipt),
    /// Encoded snapshot that was written to the store.
    Saved(Vec<u8>),
    Reset,
    SettingUpdated,
}
