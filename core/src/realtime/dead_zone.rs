//! Inactivity ("dead zone") detection over an entity's event history.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::combat_log::CombatEvent;

/// An interval during which an entity produced no combat events for at
/// least the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeadZone {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DeadZone {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Scan an ordered event sequence for gaps of at least `min_inactive`,
/// floored at one second.
///
/// Gaps are measured strictly between consecutive events and never merged,
/// so several sub-threshold pauses that sum past the threshold go
/// unreported. Events sharing the first event's timestamp belong to combat
/// start and are skipped without advancing the cursor.
pub fn detect_dead_zones(events: &[CombatEvent], min_inactive: TimeDelta) -> Vec<DeadZone> {
    let Some(first) = events.first() else {
        return Vec::new();
    };

    let threshold = min_inactive.max(TimeDelta::seconds(1));
    let combat_start = first.timestamp;
    let mut cursor = combat_start;
    let mut zones = Vec::new();

    for event in events {
        if event.timestamp == combat_start {
            continue;
        }

        if event.timestamp - cursor >= threshold {
            zones.push(DeadZone {
                start: cursor,
                end: event.timestamp,
            });
        }
        cursor = event.timestamp;
    }

    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 4)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
            + TimeDelta::seconds(secs)
    }

    fn events(seconds: &[i64]) -> Vec<CombatEvent> {
        seconds
            .iter()
            .map(|&s| CombatEvent {
                timestamp: at(s),
                owner_display: "Kirk".into(),
                owner_internal: "P[1@1 Kirk@enterprise]".into(),
                source_display: String::new(),
                source_internal: String::new(),
                target_display: String::new(),
                target_internal: String::new(),
                event_display: String::new(),
                event_internal: String::new(),
                event_type: "Phaser".into(),
                flags: String::new(),
                magnitude: 10.0,
                magnitude_base: 10.0,
            })
            .collect()
    }

    #[test]
    fn single_gap_past_threshold() {
        let zones = detect_dead_zones(&events(&[0, 1, 2, 10, 11]), TimeDelta::seconds(5));
        assert_eq!(
            zones,
            vec![DeadZone {
                start: at(2),
                end: at(10),
            }]
        );
    }

    #[test]
    fn adjacent_small_gaps_do_not_accumulate() {
        // Three 4s pauses sum to 12s but no single gap reaches 5s.
        let zones = detect_dead_zones(&events(&[0, 4, 8, 12]), TimeDelta::seconds(5));
        assert!(zones.is_empty());
    }

    #[test]
    fn threshold_floors_at_one_second() {
        let zones = detect_dead_zones(&events(&[0, 1]), TimeDelta::zero());
        assert_eq!(
            zones,
            vec![DeadZone {
                start: at(0),
                end: at(1),
            }]
        );
    }

    #[test]
    fn events_at_combat_start_are_skipped() {
        // Duplicates of the first timestamp never advance the cursor.
        let zones = detect_dead_zones(&events(&[0, 0, 0, 10]), TimeDelta::seconds(5));
        assert_eq!(
            zones,
            vec![DeadZone {
                start: at(0),
                end: at(10),
            }]
        );
    }

    #[test]
    fn empty_and_single_event_sequences_yield_nothing() {
        assert!(detect_dead_zones(&[], TimeDelta::seconds(5)).is_empty());
        assert!(detect_dead_zones(&events(&[3]), TimeDelta::seconds(5)).is_empty());
    }

    #[test]
    fn consecutive_gaps_measure_from_previous_event() {
        // Each zone starts at the event before the gap, not at the end of
        // any earlier zone.
        let zones = detect_dead_zones(&events(&[0, 10, 20]), TimeDelta::seconds(5));
        assert_eq!(
            zones,
            vec![
                DeadZone {
                    start: at(0),
                    end: at(10),
                },
                DeadZone {
                    start: at(10),
                    end: at(20),
                },
            ]
        );
    }
}
