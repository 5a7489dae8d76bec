use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Internal ids of player characters start with this prefix; everything
/// else (NPCs, pets) uses a different scheme.
pub const PLAYER_ID_PREFIX: &str = "P[";

/// Event type tags emitted by the game's combat log.
pub mod event_type {
    /// Shield damage line. Counts toward magnitude but not attacks.
    pub const SHIELD: &str = "Shield";
    /// Hull/health change line. Excluded from magnitude totals and attacks.
    pub const HIT_POINTS: &str = "HitPoints";
}

/// Flag qualifiers carried by [`CombatEvent::flags`], lowercase for
/// case-insensitive matching.
pub mod event_flag {
    pub const KILL: &str = "kill";
}

/// A single parsed combat-log line, produced by the external parser.
///
/// Timestamps are monotonically non-decreasing within one owner's stream.
/// The engine appends events in arrival order and never re-sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub timestamp: NaiveDateTime,
    /// Human-readable label of the owning entity.
    pub owner_display: String,
    /// Stable internal id of the owning entity; aggregation identity.
    pub owner_internal: String,
    pub source_display: String,
    pub source_internal: String,
    pub target_display: String,
    pub target_internal: String,
    /// Ability/effect name as shown in game.
    pub event_display: String,
    /// Ability/effect internal id.
    pub event_internal: String,
    /// Type tag: `"Shield"`, `"HitPoints"`, or an attack damage type.
    pub event_type: String,
    /// Comma-separated qualifiers, e.g. `"Critical,Kill"`. May be empty.
    pub flags: String,
    /// Signed size of the effect; sign indicates direction, aggregates use
    /// the absolute value.
    pub magnitude: f64,
    /// Pre-mitigation magnitude.
    pub magnitude_base: f64,
}

impl CombatEvent {
    /// True when the owning entity is a player character.
    pub fn is_owner_player(&self) -> bool {
        self.owner_internal.starts_with(PLAYER_ID_PREFIX)
    }

    /// True for hull/health lines, which never count toward magnitude
    /// totals or attacks.
    pub fn is_hit_points(&self) -> bool {
        self.event_type.eq_ignore_ascii_case(event_type::HIT_POINTS)
    }

    /// True for shield lines, which count toward magnitude but not attacks.
    pub fn is_shield(&self) -> bool {
        self.event_type.eq_ignore_ascii_case(event_type::SHIELD)
    }

    /// True for lines counted as attacks.
    pub fn is_attack(&self) -> bool {
        !self.is_shield() && !self.is_hit_points()
    }

    /// True when the flags mark a killing blow, matched case-insensitively.
    pub fn is_kill(&self) -> bool {
        self.flags.to_ascii_lowercase().contains(event_flag::KILL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(owner_internal: &str, event_type: &str, flags: &str) -> CombatEvent {
        CombatEvent {
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 4)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            owner_display: "Kirk".into(),
            owner_internal: owner_internal.into(),
            source_display: "Kirk".into(),
            source_internal: owner_internal.into(),
            target_display: "Borg Drone".into(),
            target_internal: "C[42 Mission_Borg_Drone]".into(),
            event_display: "Phaser Array".into(),
            event_internal: "Pn.Xnk4qy".into(),
            event_type: event_type.into(),
            flags: flags.into(),
            magnitude: -120.5,
            magnitude_base: -140.0,
        }
    }

    #[test]
    fn player_detection_uses_id_prefix() {
        assert!(event("P[12345@6789 Kirk@enterprise]", "Phaser", "").is_owner_player());
        assert!(!event("C[42 Mission_Borg_Drone]", "Phaser", "").is_owner_player());
        assert!(!event("", "Phaser", "").is_owner_player());
    }

    #[test]
    fn type_predicates_ignore_case() {
        assert!(event("x", "hitpoints", "").is_hit_points());
        assert!(event("x", "SHIELD", "").is_shield());
        assert!(event("x", "Phaser", "").is_attack());
        assert!(!event("x", "Shield", "").is_attack());
        assert!(!event("x", "HitPoints", "").is_attack());
    }

    #[test]
    fn kill_flag_matches_anywhere_in_flags() {
        assert!(event("x", "Phaser", "Critical,Kill").is_kill());
        assert!(event("x", "Phaser", "KILL").is_kill());
        assert!(!event("x", "Phaser", "Critical").is_kill());
        assert!(!event("x", "Phaser", "").is_kill());
    }
}
