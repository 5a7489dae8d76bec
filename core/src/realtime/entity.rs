//! Per-owner combat aggregate: event history plus lazily derived statistics.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDateTime, TimeDelta};
use tokio::sync::broadcast;
use tricorder_types::RealtimeSettings;

use crate::combat_log::{CombatEvent, PLAYER_ID_PREFIX};
use crate::format::{format_duration, format_magnitude};

use super::dead_zone::{DeadZone, detect_dead_zones};
use super::error::RealtimeError;
use super::refresh::{CHANGE_CHANNEL_CAPACITY, Cached, EntityField, StatChange};

/// Cache block for an entity's derived statistics, one slot per
/// [`EntityField`].
#[derive(Debug, Clone, Default)]
struct EntityStats {
    combat_start: Cached<Option<NaiveDateTime>>,
    combat_end: Cached<Option<NaiveDateTime>>,
    combat_duration: Cached<TimeDelta>,
    total_magnitude: Cached<f64>,
    max_magnitude: Cached<f64>,
    attack_count: Cached<usize>,
    kill_count: Cached<usize>,
    dead_zones: Cached<Vec<DeadZone>>,
    inactive_duration: Cached<TimeDelta>,
    magnitude_per_second: Cached<f64>,
}

impl EntityStats {
    /// Clear one slot from the reset table.
    fn invalidate(&mut self, field: EntityField) {
        match field {
            EntityField::CombatStart => self.combat_start.invalidate(),
            EntityField::CombatEnd => self.combat_end.invalidate(),
            EntityField::CombatDuration => self.combat_duration.invalidate(),
            EntityField::TotalMagnitude => self.total_magnitude.invalidate(),
            EntityField::MaxMagnitude => self.max_magnitude.invalidate(),
            EntityField::AttackCount => self.attack_count.invalidate(),
            EntityField::KillCount => self.kill_count.invalidate(),
            EntityField::DeadZones => self.dead_zones.invalidate(),
            EntityField::InactiveDuration => self.inactive_duration.invalidate(),
            EntityField::MagnitudePerSecond => self.magnitude_per_second.invalidate(),
        }
    }

    /// Clear every slot; the next read of any field recomputes it.
    fn invalidate_all(&mut self) {
        for field in EntityField::ALL {
            self.invalidate(field);
        }
    }
}

/// State guarded by the entity's single lock: the append-only event history,
/// per-entity configuration, and the cache block. Appends and lazy
/// recomputation share this scope, so readers always observe values derived
/// from a consistent event snapshot.
#[derive(Debug)]
struct EntityState {
    owner_display: String,
    is_in_combat: bool,
    inactive_tracking_enabled: bool,
    min_inactive: TimeDelta,
    min_combat_duration: TimeDelta,
    events: Vec<CombatEvent>,
    stats: EntityStats,
}

impl EntityState {
    fn new(owner_display: String, settings: &RealtimeSettings) -> Self {
        Self {
            owner_display,
            is_in_combat: false,
            inactive_tracking_enabled: settings.inactive_time_enabled,
            min_inactive: TimeDelta::seconds(i64::from(settings.min_inactive_seconds)),
            min_combat_duration: TimeDelta::seconds(i64::from(
                settings.min_combat_duration_seconds,
            )),
            events: Vec::new(),
            stats: EntityStats::default(),
        }
    }

    fn combat_start(&mut self) -> Option<NaiveDateTime> {
        if let Some(cached) = self.stats.combat_start.get() {
            return cached;
        }
        let start = self.events.first().map(|e| e.timestamp);
        self.stats.combat_start.store(start)
    }

    fn combat_end(&mut self) -> Option<NaiveDateTime> {
        if let Some(cached) = self.stats.combat_end.get() {
            return cached;
        }
        let end = self.events.last().map(|e| e.timestamp);
        self.stats.combat_end.store(end)
    }

    fn combat_duration(&mut self) -> TimeDelta {
        if let Some(cached) = self.stats.combat_duration.get() {
            return cached;
        }
        let duration = match (self.combat_start(), self.combat_end()) {
            (Some(start), Some(end)) if end - start > self.min_combat_duration => end - start,
            (Some(_), Some(_)) => self.min_combat_duration,
            _ => TimeDelta::zero(),
        };
        self.stats.combat_duration.store(duration)
    }

    fn total_magnitude(&mut self) -> f64 {
        if let Some(cached) = self.stats.total_magnitude.get() {
            return cached;
        }
        let total = self
            .events
            .iter()
            .filter(|e| !e.is_hit_points())
            .map(|e| e.magnitude.abs())
            .sum();
        self.stats.total_magnitude.store(total)
    }

    fn max_magnitude(&mut self) -> f64 {
        if let Some(cached) = self.stats.max_magnitude.get() {
            return cached;
        }
        let max = self
            .events
            .iter()
            .filter(|e| !e.is_hit_points())
            .map(|e| e.magnitude.abs())
            .fold(0.0, f64::max);
        self.stats.max_magnitude.store(max)
    }

    fn attack_count(&mut self) -> usize {
        if let Some(cached) = self.stats.attack_count.get() {
            return cached;
        }
        let count = self.events.iter().filter(|e| e.is_attack()).count();
        self.stats.attack_count.store(count)
    }

    fn kill_count(&mut self) -> usize {
        if let Some(cached) = self.stats.kill_count.get() {
            return cached;
        }
        let count = self.events.iter().filter(|e| e.is_kill()).count();
        self.stats.kill_count.store(count)
    }

    fn dead_zones(&mut self) -> Vec<DeadZone> {
        if let Some(cached) = self.stats.dead_zones.get() {
            return cached;
        }
        let zones = if self.inactive_tracking_enabled {
            detect_dead_zones(&self.events, self.min_inactive)
        } else {
            Vec::new()
        };
        self.stats.dead_zones.store(zones)
    }

    fn inactive_duration(&mut self) -> TimeDelta {
        if let Some(cached) = self.stats.inactive_duration.get() {
            return cached;
        }
        let total = self
            .dead_zones()
            .iter()
            .fold(TimeDelta::zero(), |acc, zone| acc + zone.duration());
        self.stats.inactive_duration.store(total)
    }

    fn magnitude_per_second(&mut self) -> f64 {
        if let Some(cached) = self.stats.magnitude_per_second.get() {
            return cached;
        }
        let has_magnitude_events = self.events.iter().any(|e| !e.is_hit_points());
        let active = self.combat_duration() - self.inactive_duration();
        let mps = if has_magnitude_events && active > TimeDelta::zero() {
            self.total_magnitude() / (active.num_milliseconds() as f64 / 1000.0)
        } else {
            0.0
        };
        self.stats.magnitude_per_second.store(mps)
    }
}

/// A combat participant aggregated from the log stream.
///
/// Owns its ordered event history and a block of lazily computed
/// statistics. All mutation and recomputation happens under one internal
/// lock, so one producer and any number of readers can share the entity.
#[derive(Debug)]
pub struct RealtimeEntity {
    owner_internal: String,
    is_player: bool,
    state: Mutex<EntityState>,
    changes: broadcast::Sender<StatChange>,
}

impl RealtimeEntity {
    /// Build an entity from its first event, seeded with the active
    /// settings.
    pub fn new(event: CombatEvent, settings: &RealtimeSettings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self::with_notifier(event, settings, changes)
    }

    /// Build an entity with no history yet (deserialized sessions).
    pub fn with_owner(
        owner_display: impl Into<String>,
        owner_internal: impl Into<String>,
        settings: &RealtimeSettings,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let owner_internal = owner_internal.into();
        Self {
            is_player: owner_internal.starts_with(PLAYER_ID_PREFIX),
            owner_internal,
            state: Mutex::new(EntityState::new(owner_display.into(), settings)),
            changes,
        }
    }

    /// Like [`RealtimeEntity::new`], publishing change signals into an
    /// existing channel. Used by the owning session so one subscription
    /// observes the whole hierarchy.
    pub(crate) fn with_notifier(
        event: CombatEvent,
        settings: &RealtimeSettings,
        changes: broadcast::Sender<StatChange>,
    ) -> Self {
        let entity = Self {
            owner_internal: event.owner_internal.clone(),
            is_player: event.is_owner_player(),
            state: Mutex::new(EntityState::new(event.owner_display.clone(), settings)),
            changes,
        };
        entity
            .add_event(event)
            .expect("first event owner matches the entity");
        entity
    }

    fn state(&self) -> MutexGuard<'_, EntityState> {
        self.state.lock().expect("entity state lock poisoned")
    }

    // --- Mutation ---

    /// Append one event. The append and the cache invalidation form a
    /// single atomic unit with respect to readers. No notification fires
    /// here; staleness is only announced by [`RealtimeEntity::refresh`].
    pub fn add_event(&self, event: CombatEvent) -> Result<(), RealtimeError> {
        if event.owner_internal != self.owner_internal {
            return Err(RealtimeError::OwnerMismatch {
                expected: self.owner_internal.clone(),
                actual: event.owner_internal,
            });
        }

        let mut state = self.state();
        state.is_in_combat = true;
        state.events.push(event);
        state.stats.invalidate_all();
        Ok(())
    }

    /// Invalidate every derived statistic and announce the observable
    /// fields in declaration order. Nothing is recomputed here; observers
    /// pull values on their next read.
    pub fn refresh(&self) {
        self.state().stats.invalidate_all();
        for field in EntityField::OBSERVABLE {
            let _ = self.changes.send(StatChange::Entity {
                owner: self.owner_internal.clone(),
                field,
            });
        }
    }

    /// Subscribe to the field-change signals emitted by refresh.
    pub fn subscribe(&self) -> broadcast::Receiver<StatChange> {
        self.changes.subscribe()
    }

    // --- Identity ---

    pub fn owner_internal(&self) -> &str {
        &self.owner_internal
    }

    pub fn is_player(&self) -> bool {
        self.is_player
    }

    /// Human-readable label; mutable separately from the identity key.
    pub fn owner_display(&self) -> String {
        self.state().owner_display.clone()
    }

    pub fn set_owner_display(&self, name: impl Into<String>) {
        self.state().owner_display = name.into();
    }

    // --- Combat participation ---

    /// True once any event has been added. Gates participation in the
    /// session's cascading refresh.
    pub fn is_in_combat(&self) -> bool {
        self.state().is_in_combat
    }

    /// Hand-off for the external removal policy: an entity taken out of
    /// combat stops participating in periodic refresh.
    pub fn set_in_combat(&self, in_combat: bool) {
        self.state().is_in_combat = in_combat;
    }

    // --- Configuration ---

    pub fn inactive_tracking_enabled(&self) -> bool {
        self.state().inactive_tracking_enabled
    }

    /// Enable or disable inactivity tracking. Counts as a mutation: the
    /// cache block is invalidated so the next read reflects the change.
    pub fn set_inactive_tracking(&self, enabled: bool) {
        let mut state = self.state();
        state.inactive_tracking_enabled = enabled;
        state.stats.invalidate_all();
    }

    pub fn min_inactive(&self) -> TimeDelta {
        self.state().min_inactive
    }

    /// Adjust the inactivity threshold. Counts as a mutation.
    pub fn set_min_inactive_seconds(&self, seconds: u32) {
        let mut state = self.state();
        state.min_inactive = TimeDelta::seconds(i64::from(seconds));
        state.stats.invalidate_all();
    }

    // --- Event history ---

    pub fn event_count(&self) -> usize {
        self.state().events.len()
    }

    /// Snapshot of the event history in arrival order.
    pub fn events(&self) -> Vec<CombatEvent> {
        self.state().events.clone()
    }

    // --- Derived statistics ---

    /// Timestamp of the first event, `None` while the history is empty.
    pub fn combat_start(&self) -> Option<NaiveDateTime> {
        self.state().combat_start()
    }

    /// Timestamp of the last event, `None` while the history is empty.
    pub fn combat_end(&self) -> Option<NaiveDateTime> {
        self.state().combat_end()
    }

    /// End minus start, floored at the configured minimum combat duration.
    /// Zero while the history is empty.
    pub fn combat_duration(&self) -> TimeDelta {
        self.state().combat_duration()
    }

    /// Sum of absolute magnitudes over non-HitPoints events.
    pub fn total_magnitude(&self) -> f64 {
        self.state().total_magnitude()
    }

    /// Largest absolute magnitude over non-HitPoints events, 0 if none.
    pub fn max_magnitude(&self) -> f64 {
        self.state().max_magnitude()
    }

    /// Number of events typed neither Shield nor HitPoints.
    pub fn attack_count(&self) -> usize {
        self.state().attack_count()
    }

    /// Number of events flagged as killing blows.
    pub fn kill_count(&self) -> usize {
        self.state().kill_count()
    }

    /// Detected inactivity intervals, in order. Empty when tracking is
    /// disabled.
    pub fn dead_zones(&self) -> Vec<DeadZone> {
        self.state().dead_zones()
    }

    /// Total time spent inside dead zones.
    pub fn inactive_duration(&self) -> TimeDelta {
        self.state().inactive_duration()
    }

    /// Total magnitude per second of active combat (duration minus
    /// inactivity). Zero when there is no active time.
    pub fn magnitude_per_second(&self) -> f64 {
        self.state().magnitude_per_second()
    }

    /// One-line stat summary for logs and status surfaces.
    pub fn summary(&self) -> String {
        let mut state = self.state();
        let owner = state.owner_display.clone();
        let attacks = state.attack_count();
        let total = format_magnitude(state.total_magnitude());
        let mps = format_magnitude(state.magnitude_per_second());
        let inactive = format_duration(state.inactive_duration());
        format!("{owner}: Attacks={attacks}, Dam={total}, DPS={mps}, InActive={inactive}")
    }
}

impl fmt::Display for RealtimeEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = self.state();
        let owner = state.owner_display.clone();
        let kills = state.kill_count();
        let duration = state.combat_duration();
        let start = state.combat_start();
        let end = state.combat_end();
        write!(
            f,
            "Owner={owner}, Player={}, Kills={kills}, Duration={}s, Start={start:?}, End={end:?}",
            self.is_player,
            duration.num_seconds(),
        )
    }
}
