//! Realtime combat aggregation.
//!
//! A [`RealtimeCombat`] owns the player entities observed in one combat
//! session; each [`RealtimeEntity`] owns its ordered event history and a
//! block of lazily computed statistics. Mutation marks the block stale,
//! reads recompute on demand, and `refresh()` re-announces the observable
//! fields to subscribers without recomputing anything itself.

mod combat;
mod dead_zone;
mod entity;
mod error;
mod refresh;


pub use combat::RealtimeCombat;
pub use dead_zone::{DeadZone, detect_dead_zones};
pub use entity::RealtimeEntity;
pub use error::RealtimeError;
pub use refresh::{CombatField, EntityField, StatChange};
