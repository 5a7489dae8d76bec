//! Session-level aggregate: the set of player entities in one combat.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{NaiveDateTime, TimeDelta};
use hashbrown::HashMap;
use tokio::sync::broadcast;
use tricorder_types::RealtimeSettings;

use crate::combat_log::CombatEvent;

use super::entity::RealtimeEntity;
use super::error::RealtimeError;
use super::refresh::{CHANGE_CHANNEL_CAPACITY, Cached, CombatField, StatChange};

/// Player entities in arrival order plus an id index for routing.
#[derive(Debug, Default)]
struct EntityRoster {
    entities: Vec<Arc<RealtimeEntity>>,
    by_owner: HashMap<String, usize>,
}

impl EntityRoster {
    fn get(&self, owner_internal: &str) -> Option<&Arc<RealtimeEntity>> {
        self.by_owner
            .get(owner_internal)
            .map(|&idx| &self.entities[idx])
    }

    fn insert(&mut self, entity: Arc<RealtimeEntity>) {
        self.by_owner
            .insert(entity.owner_internal().to_string(), self.entities.len());
        self.entities.push(entity);
    }
}

/// Cache block for the session-level derived fields.
///
/// Recomputation runs outside this lock (it walks the entities), so the
/// block carries a generation stamp: a computation that started before an
/// invalidation is handed back to its caller but never stored.
#[derive(Debug, Default)]
struct CombatStats {
    generation: u64,
    combat_start: Cached<Option<NaiveDateTime>>,
    combat_end: Cached<Option<NaiveDateTime>>,
    combat_duration: Cached<TimeDelta>,
    event_count: Cached<usize>,
    all_events: Cached<Arc<[CombatEvent]>>,
}

impl CombatStats {
    /// Clear one slot from the reset table.
    fn invalidate(&mut self, field: CombatField) {
        match field {
            CombatField::CombatStart => self.combat_start.invalidate(),
            CombatField::CombatEnd => self.combat_end.invalidate(),
            CombatField::CombatDuration => self.combat_duration.invalidate(),
            CombatField::EventCount => self.event_count.invalidate(),
            CombatField::AllEvents => self.all_events.invalidate(),
            // Computed per read; no slot to clear.
            CombatField::EntitiesByName => {}
        }
    }

    /// Clear every slot and advance the generation.
    fn invalidate_all(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        for field in CombatField::ALL {
            self.invalidate(field);
        }
    }
}

/// One combat session: routes incoming events to player entities and keeps
/// session-wide derived fields.
///
/// The entity collection and the cache block have separate exclusion
/// scopes, so inserting a new owner and mutating an existing one do not
/// serialize against each other beyond the brief map access.
#[derive(Debug)]
pub struct RealtimeCombat {
    settings: RealtimeSettings,
    roster: RwLock<EntityRoster>,
    stats: Mutex<CombatStats>,
    changes: broadcast::Sender<StatChange>,
}

impl RealtimeCombat {
    pub fn new(settings: RealtimeSettings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            settings,
            roster: RwLock::new(EntityRoster::default()),
            stats: Mutex::new(CombatStats::default()),
            changes,
        }
    }

    /// Build a session from its first event.
    pub fn with_event(
        event: CombatEvent,
        settings: RealtimeSettings,
    ) -> Result<Self, RealtimeError> {
        let combat = Self::new(settings);
        combat.add_event(event)?;
        Ok(combat)
    }

    fn stats(&self) -> MutexGuard<'_, CombatStats> {
        self.stats.lock().expect("session stats lock poisoned")
    }

    fn roster(&self) -> std::sync::RwLockReadGuard<'_, EntityRoster> {
        self.roster.read().expect("entity roster lock poisoned")
    }

    // --- Mutation ---

    /// Route one event. Non-player owners are ignored. First sight of a
    /// player owner creates its entity seeded with this event and the
    /// session settings; otherwise the event is delegated to the existing
    /// entity. The session's own cache block is invalidated afterwards.
    pub fn add_event(&self, event: CombatEvent) -> Result<(), RealtimeError> {
        if !event.is_owner_player() {
            tracing::trace!(owner = %event.owner_internal, "ignoring non-player event");
            return Ok(());
        }

        let existing = self.roster().get(&event.owner_internal).cloned();
        match existing {
            Some(entity) => entity.add_event(event)?,
            None => self.insert_entity(event)?,
        }

        self.stats().invalidate_all();
        Ok(())
    }

    fn insert_entity(&self, event: CombatEvent) -> Result<(), RealtimeError> {
        let mut roster = self.roster.write().expect("entity roster lock poisoned");
        if let Some(entity) = roster.get(&event.owner_internal).cloned() {
            drop(roster);
            return entity.add_event(event);
        }

        tracing::debug!(
            owner = %event.owner_internal,
            display = %event.owner_display,
            "tracking new player entity"
        );
        let entity = Arc::new(RealtimeEntity::with_notifier(
            event,
            &self.settings,
            self.changes.clone(),
        ));
        roster.insert(entity);
        Ok(())
    }

    /// Cascading refresh: every entity still in combat refreshes first,
    /// then the session's own fields are invalidated and announced in
    /// declaration order. Entity statistics are never recomputed here; each
    /// entity re-derives on its next read.
    pub fn refresh(&self) {
        for entity in self.entities() {
            if entity.is_in_combat() {
                entity.refresh();
            }
        }

        self.stats().invalidate_all();
        for field in CombatField::OBSERVABLE {
            let _ = self.changes.send(StatChange::Combat { field });
        }
    }

    /// Subscribe to change signals for the session and every entity it
    /// created.
    pub fn subscribe(&self) -> broadcast::Receiver<StatChange> {
        self.changes.subscribe()
    }

    // --- Entity access ---

    /// Snapshot of the tracked entities in arrival order.
    pub fn entities(&self) -> Vec<Arc<RealtimeEntity>> {
        self.roster().entities.clone()
    }

    /// Snapshot of the tracked entities ordered by display name.
    pub fn entities_by_name(&self) -> Vec<Arc<RealtimeEntity>> {
        let mut entities = self.entities();
        entities.sort_by_key(|e| e.owner_display());
        entities
    }

    pub fn entity(&self, owner_internal: &str) -> Option<Arc<RealtimeEntity>> {
        self.roster().get(owner_internal).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.roster().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster().entities.is_empty()
    }

    pub fn settings(&self) -> &RealtimeSettings {
        &self.settings
    }

    // --- Derived statistics ---

    /// Lazy-cache helper: recomputes outside the stats lock and stores the
    /// result only when no invalidation intervened.
    fn cached_field<T: Clone>(
        &self,
        get: impl Fn(&CombatStats) -> Option<T>,
        compute: impl FnOnce() -> T,
        store: impl FnOnce(&mut CombatStats, T) -> T,
    ) -> T {
        let generation = {
            let stats = self.stats();
            if let Some(value) = get(&stats) {
                return value;
            }
            stats.generation
        };

        let value = compute();

        let mut stats = self.stats();
        if stats.generation == generation {
            store(&mut stats, value)
        } else {
            value
        }
    }

    /// Earliest combat start across entities, `None` while empty.
    pub fn combat_start(&self) -> Option<NaiveDateTime> {
        self.cached_field(
            |stats| stats.combat_start.get(),
            || {
                self.entities()
                    .iter()
                    .filter_map(|e| e.combat_start())
                    .min()
            },
            |stats, value| stats.combat_start.store(value),
        )
    }

    /// Latest combat end across entities, `None` while empty.
    pub fn combat_end(&self) -> Option<NaiveDateTime> {
        self.cached_field(
            |stats| stats.combat_end.get(),
            || self.entities().iter().filter_map(|e| e.combat_end()).max(),
            |stats, value| stats.combat_end.store(value),
        )
    }

    /// Session end minus session start, zero while empty.
    pub fn combat_duration(&self) -> TimeDelta {
        self.cached_field(
            |stats| stats.combat_duration.get(),
            || match (self.combat_start(), self.combat_end()) {
                (Some(start), Some(end)) => end - start,
                _ => TimeDelta::zero(),
            },
            |stats, value| stats.combat_duration.store(value),
        )
    }

    /// Total number of events across all entities.
    pub fn event_count(&self) -> usize {
        self.cached_field(
            |stats| stats.event_count.get(),
            || self.entities().iter().map(|e| e.event_count()).sum(),
            |stats, value| stats.event_count.store(value),
        )
    }

    /// Read-only merged view of every entity's event history, in entity
    /// arrival order.
    pub fn all_events(&self) -> Arc<[CombatEvent]> {
        self.cached_field(
            |stats| stats.all_events.get(),
            || {
                let mut events = Vec::new();
                for entity in self.entities() {
                    events.extend(entity.events());
                }
                Arc::from(events)
            },
            |stats, value| stats.all_events.store(value),
        )
    }
}

impl fmt::Display for RealtimeCombat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Duration={}s, Start={:?}, End={:?}, Entities={}",
            self.combat_duration().num_seconds(),
            self.combat_start(),
            self.combat_end(),
            self.entity_count(),
        )
    }
}
