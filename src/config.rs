//! Runtime knobs of the engine: tick clamping, the offline window, timers
//! and the storage key. Game balance (costs, curves, ladders) lives in the
//! catalog instead.

use serde::Deserialize;

use crate::error::ConfigError;

/// Engine configuration. Every field has a default, so a JSON document only
/// needs to name the knobs it overrides.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Largest simulated step a single tick may advance, in seconds.
    pub max_tick_seconds: f64,
    /// Offline catch-up never credits more than this many seconds.
    pub offline_cap_seconds: f64,
    /// Offline windows shorter than this award nothing.
    pub offline_floor_seconds: f64,
    /// Seconds between "did you know" trivia prompts.
    pub trivia_interval_seconds: f64,
    /// Key under which the snapshot is written to the byte store.
    pub storage_key: String,
    /// Maximum number of undrained engine events kept in the queue.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tick_seconds: 0.1,
            offline_cap_seconds: 24.0 * 60.0 * 60.0,
            offline_floor_seconds: 60.0,
            trivia_interval_seconds: 120.0,
            storage_key: "dataStorageGameSave".into(),
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The tick step must be positive. The offline window and the trivia
    /// period may be zero (zero trivia disables it) but never negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("maxTickSeconds", self.max_tick_seconds, false),
            ("offlineCapSeconds", self.offline_cap_seconds, true),
            ("offlineFloorSeconds", self.offline_floor_seconds, true),
            ("triviaIntervalSeconds", self.trivia_interval_seconds, true),
        ];
        for (field, value, zero_ok) in checks {
            let in_range = value.is_finite() && (value > 0.0 || (zero_ok && value == 0.0));
            if !in_range {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_balance() {
        let cfg = EngineConfig::default();
        assert!((cfg.max_tick_seconds - 0.1).abs() < f64::EPSILON);
        assert!((cfg.offline_cap_seconds - 86_400.0).abs() < f64::EPSILON);
        assert!((cfg.offline_floor_seconds - 60.0).abs() < f64::EPSILON);
        assert_eq!(cfg.storage_key, "dataStorageGameSave");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg = EngineConfig::from_json(r#"{ "offlineCapSeconds": 3600 }"#).unwrap();
        assert!((cfg.offline_cap_seconds - 3600.0).abs() < f64::EPSILON);
        assert!((cfg.max_tick_seconds - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.event_capacity, 256);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            EngineConfig::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn non_positive_tick_step_is_rejected() {
        for json in [r#"{ "maxTickSeconds": -1 }"#, r#"{ "maxTickSeconds": 0 }"#] {
            assert!(matches!(
                EngineConfig::from_json(json),
                Err(ConfigError::OutOfRange { field: "maxTickSeconds", .. })
            ));
        }
    }

    #[test]
    fn negative_offline_window_is_rejected() {
        assert_eq!(
            EngineConfig::from_json(r#"{ "offlineFloorSeconds": -5 }"#),
            Err(ConfigError::OutOfRange {
                field: "offlineFloorSeconds",
                value: -5.0
            })
        );
        assert!(EngineConfig::from_json(r#"{ "offlineCapSeconds": -1 }"#).is_err());
    }

    #[test]
    fn zero_offline_window_and_trivia_are_allowed() {
        let cfg = EngineConfig::from_json(
            r#"{ "offlineCapSeconds": 0, "offlineFloorSeconds": 0, "triviaIntervalSeconds": 0 }"#,
        )
        .unwrap();
        assert_eq!(cfg.offline_cap_seconds, 0.0);
        assert!(EngineConfig::default().validate().is_ok());
    }
}
