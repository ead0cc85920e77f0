//! Error types for player actions, persistence, settings and catalog setup.
//!
//! Player-facing errors are values, never panics: a rejected purchase leaves
//! the state untouched and a corrupt snapshot is recovered by the engine.

use thiserror::Error;

/// Why a device or upgrade purchase was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PurchaseError {
    #[error("insufficient data: costs {cost}, have {available}")]
    InsufficientResource { cost: f64, available: f64 },
    #[error("unknown id `{0}`")]
    UnknownEntityId(String),
    #[error("upgrade `{0}` is already owned")]
    AlreadyOwned(String),
    #[error("requirement for `{0}` is not met")]
    RequirementNotMet(String),
}

/// Failures of the external key-value byte store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend is unavailable")]
    Unavailable,
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("storage write failed: {0}")]
    Write(String),
}

/// Errors raised while encoding, decoding or persisting a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(String),
    #[error("corrupt snapshot: {0}")]
    Decode(String),
    #[error("snapshot version {saved} is older than the minimum compatible version {min_compatible}")]
    Incompatible { saved: u32, min_compatible: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SnapshotError {
    /// True for the kinds that mean "the stored bytes are unusable".
    pub fn is_corrupt(&self) -> bool {
        matches!(self, SnapshotError::Decode(_) | SnapshotError::Incompatible { .. })
    }
}

/// Errors from the string-keyed settings entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("invalid value `{value}` for setting `{key}`")]
    InvalidValue { key: String, value: String },
}

/// Errors found while building a catalog from a device table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("device table is empty")]
    EmptyDeviceTable,
    #[error("duplicate id `{0}`")]
    DuplicateId(String),
    #[error("device `{id}` is invalid: {reason}")]
    InvalidDevice { id: String, reason: String },
    #[error("upgrade `{upgrade}` references unknown device `{device}`")]
    DanglingReference { upgrade: String, device: String },
    #[error("device table could not be parsed: {0}")]
    Parse(String),
}

/// Errors found while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("engine config could not be parsed: {0}")]
    Parse(String),
    #[error("`{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Any failure of a dispatched [`Command`](crate::actions::Command).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
