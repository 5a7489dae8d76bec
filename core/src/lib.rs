pub mod combat_log;
pub mod format;
pub mod realtime;

// Re-exports for convenience
pub use combat_log::*;
pub use realtime::{
    CombatField, DeadZone, EntityField, RealtimeCombat, RealtimeEntity, RealtimeError, StatChange,
    detect_dead_zones,
};
pub use tricorder_types::RealtimeSettings;
