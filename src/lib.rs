//! Data Clicker: the headless production and progression engine of an idle
//! game about collecting data on ever faster storage devices.
//!
//! The engine owns one [`ProgressionState`]. Rendering and input layers talk
//! to it through [`Engine`]'s commands and queries; storage sits behind the
//! [`SnapshotStore`] trait and time behind [`Clock`].

pub mod actions;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod logic;
pub mod multiplier;
pub mod offline;
pub mod save;
pub mod schedule;
pub mod state;
pub mod time;

mod simulator;

pub use actions::{Command, CommandOutcome};
pub use catalog::{Catalog, DeviceDefinition};
pub use config::EngineConfig;
pub use engine::{DeviceView, Engine, EngineEvent};
pub use error::{
    CatalogError, CommandError, ConfigError, PurchaseError, SettingError, SnapshotError, StoreError,
};
pub use offline::OfflineReport;
#[cfg(target_arch = "wasm32")]
pub use save::LocalStorage;
pub use save::{MemoryStore, SnapshotStore};
pub use state::{NumberFormat, ProgressionState, Setting};
pub use time::{Clock, ManualClock, SystemClock};
