//! # Hollowmere Gameplay
//!
//! Simulation core for Hollowmere, a top-down action RPG.
//!
//! This crate owns everything that happens inside a play session:
//! - Tile maps, collision and line of sight
//! - Alert-state enemy AI with budgeted pathfinding and flanking
//! - Ten enemy behaviors and five multi-phase bosses
//! - Projectiles, hazard zones and loot drops
//! - Quests, achievements and the inventory
//! - Camera-locked rooms
//! - Save slots
//! - The event bus tying it all together
//!
//! Rendering, audio and input live elsewhere; they read from [`GameWorld`]
//! and feed it [`PlayerInput`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod achievement;
pub mod alert;
pub mod boss;
pub mod content;
pub mod context;
pub mod drops;
pub mod effects;
pub mod enemy;
pub mod enemy_behavior;
pub mod entity;
pub mod events;
pub mod inventory;
pub mod perception;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod quest;
pub mod room;
pub mod save;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::achievement::*;
    pub use crate::alert::*;
    pub use crate::boss::*;
    pub use crate::content::*;
    pub use crate::context::*;
    pub use crate::drops::*;
    pub use crate::effects::*;
    pub use crate::enemy::*;
    pub use crate::enemy_behavior::*;
    pub use crate::entity::*;
    pub use crate::events::*;
    pub use crate::inventory::*;
    pub use crate::perception::*;
    pub use crate::physics::*;
    pub use crate::player::*;
    pub use crate::projectile::*;
    pub use crate::quest::*;
    pub use crate::room::*;
    pub use crate::save::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_builtin_content_builds_managers() {
        let content = GameContent::builtin();
        assert!(content.validate().is_ok());
        assert!(!content.quest_manager().is_empty());
        assert!(content.item_registry().contains("potion"));
    }

    #[test]
    fn test_event_bus_roundtrip() {
        let bus = EventBus::new(4);
        assert!(bus.publish(GameEvent::LevelUp { level: 2 }));
        assert_eq!(bus.drain(), vec![GameEvent::LevelUp { level: 2 }]);
    }

    #[test]
    fn test_world_starts_alive() {
        let world = GameWorld::new(
            Box::new(GridMap::walled(12, 12)),
            &GameContent::builtin(),
            WorldTuning::default(),
            1,
            Vec2::new(96.0, 96.0),
        );
        assert!(!world.is_game_over());
        assert_eq!(world.player().level(), 1);
    }
}
