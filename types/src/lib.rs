//! Shared configuration types for Tricorder
//!
//! This crate contains the serializable settings shared between the
//! aggregation engine (tricorder-core) and whatever outer surface loads,
//! edits, and persists them. The engine only ever reads these values.

use serde::{Deserialize, Serialize};

/// Tuning for the realtime aggregation engine.
///
/// Every field has a default, so a partially populated settings file
/// deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Track per-entity inactivity (dead-zone) intervals.
    pub inactive_time_enabled: bool,

    /// Minimum gap between two consecutive events before the pause counts
    /// as inactivity. Values below one second are treated as one second.
    pub min_inactive_seconds: u32,

    /// Lower bound for reported per-entity combat duration. Combats shorter
    /// than this are reported at exactly this length.
    pub min_combat_duration_seconds: u32,

    /// Quiet time after which the next event opens a new combat session.
    /// Consumed by the routing layer that constructs `RealtimeCombat`
    /// instances, not by the engine itself.
    pub seconds_before_new_combat: u32,

    /// Cadence at which the host triggers a cascading refresh of the
    /// aggregates.
    pub refresh_interval_seconds: u32,

    /// Quiet time before an idle entity is dropped from display grids.
    /// Zero keeps entities listed for the life of the session.
    pub seconds_before_grid_removal: u32,

    /// Display name of the local player character, when known.
    pub my_character: Option<String>,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            inactive_time_enabled: true,
            min_inactive_seconds: 6,
            min_combat_duration_seconds: 4,
            seconds_before_new_combat: 20,
            refresh_interval_seconds: 3,
            seconds_before_grid_removal: 0,
            my_character: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_with_defaults() {
        let settings: RealtimeSettings =
            serde_json::from_str(r#"{ "min_inactive_seconds": 10 }"#).unwrap();
        assert_eq!(settings.min_inactive_seconds, 10);
        assert!(settings.inactive_time_enabled);
        assert_eq!(settings.min_combat_duration_seconds, 4);
        assert_eq!(settings.my_character, None);
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = RealtimeSettings::default();
        assert_eq!(settings.min_inactive_seconds, 6);
        assert_eq!(settings.seconds_before_new_combat, 20);
        assert_eq!(settings.refresh_interval_seconds, 3);
        assert_eq!(settings.seconds_before_grid_removal, 0);
    }
}
