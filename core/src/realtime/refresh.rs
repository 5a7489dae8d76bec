//! Refresh/invalidation protocol shared by the realtime aggregates.
//!
//! Every derived statistic lives in a [`Cached`] slot. Mutations invalidate
//! slots without recomputing anything; the next read of a field recomputes
//! and stores it. A `refresh()` call additionally publishes one
//! [`StatChange`] per field in the aggregate's `OBSERVABLE` table, in
//! declaration order, so subscribers can pull the recomputed values.

use serde::Serialize;

/// Capacity of the broadcast channel behind change subscriptions.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A lazily computed statistic slot: stale, or holding the value computed
/// since the last invalidation.
#[derive(Debug, Clone)]
pub(crate) struct Cached<T> {
    slot: Option<T>,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T: Clone> Cached<T> {
    /// The cached value, if one is currently valid.
    pub fn get(&self) -> Option<T> {
        self.slot.clone()
    }

    /// Store a freshly computed value and hand it back.
    pub fn store(&mut self, value: T) -> T {
        self.slot = Some(value.clone());
        value
    }

    /// Drop the cached value; the next read recomputes.
    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

/// Derived fields of a [`RealtimeEntity`](super::RealtimeEntity).
///
/// Declaration order is the notification order on refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityField {
    CombatStart,
    CombatEnd,
    CombatDuration,
    TotalMagnitude,
    MaxMagnitude,
    AttackCount,
    KillCount,
    DeadZones,
    InactiveDuration,
    MagnitudePerSecond,
}

impl EntityField {
    /// Reset table: every slot cleared on mutation and on refresh.
    pub const ALL: [EntityField; 10] = [
        EntityField::CombatStart,
        EntityField::CombatEnd,
        EntityField::CombatDuration,
        EntityField::TotalMagnitude,
        EntityField::MaxMagnitude,
        EntityField::AttackCount,
        EntityField::KillCount,
        EntityField::DeadZones,
        EntityField::InactiveDuration,
        EntityField::MagnitudePerSecond,
    ];

    /// Notify table: fields announced on refresh. Dead zones are reset but
    /// not announced; observers reach them through `InactiveDuration`.
    pub const OBSERVABLE: [EntityField; 9] = [
        EntityField::CombatStart,
        EntityField::CombatEnd,
        EntityField::CombatDuration,
        EntityField::TotalMagnitude,
        EntityField::MaxMagnitude,
        EntityField::AttackCount,
        EntityField::KillCount,
        EntityField::InactiveDuration,
        EntityField::MagnitudePerSecond,
    ];
}

/// Derived fields of a [`RealtimeCombat`](super::RealtimeCombat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CombatField {
    CombatStart,
    CombatEnd,
    CombatDuration,
    EventCount,
    AllEvents,
    EntitiesByName,
}

impl CombatField {
    /// Reset table. `EntitiesByName` has no slot; it is computed per read.
    pub const ALL: [CombatField; 5] = [
        CombatField::CombatStart,
        CombatField::CombatEnd,
        CombatField::CombatDuration,
        CombatField::EventCount,
        CombatField::AllEvents,
    ];

    /// Notify table: fields announced on refresh.
    pub const OBSERVABLE: [CombatField; 6] = [
        CombatField::CombatStart,
        CombatField::CombatEnd,
        CombatField::CombatDuration,
        CombatField::EventCount,
        CombatField::AllEvents,
        CombatField::EntitiesByName,
    ];
}

/// Change signal published on refresh. Payloads name the field only;
/// subscribers pull the recomputed value through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatChange {
    /// A per-entity derived field was re-announced.
    Entity {
        owner: String,
        field: EntityField,
    },
    /// A session-level derived field was re-announced.
    Combat { field: CombatField },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_slot_lifecycle() {
        let mut slot: Cached<u32> = Cached::default();
        assert_eq!(slot.get(), None);
        assert_eq!(slot.store(7), 7);
        assert_eq!(slot.get(), Some(7));
        slot.invalidate();
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn observable_tables_are_subsets_of_reset_tables() {
        for field in EntityField::OBSERVABLE {
            assert!(EntityField::ALL.contains(&field));
        }
        assert!(!EntityField::OBSERVABLE.contains(&EntityField::DeadZones));
    }
}
