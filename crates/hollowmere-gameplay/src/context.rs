//! Per-tick context lent to every combatant.

use crate::perception::PathfindBudget;
use crate::physics::TileMap;
use crate::player::PlayerView;

/// Shared, read-mostly world state for one tick.
///
/// Enemies and bosses read the map and the player snapshot, spend
/// pathfinding budget and draw randomness through here. Nothing in the
/// context lets one combatant reach another.
pub struct SimContext<'a> {
    /// Tile map
    pub map: &'a dyn TileMap,
    /// Player snapshot taken before enemies update
    pub player: PlayerView,
    /// Pathfinding allowance for this frame
    pub budget: &'a mut PathfindBudget,
    /// Seeded random source
    pub rng: &'a mut fastrand::Rng,
}

impl<'a> SimContext<'a> {
    /// Bundles the tick context.
    pub fn new(
        map: &'a dyn TileMap,
        player: PlayerView,
        budget: &'a mut PathfindBudget,
        rng: &'a mut fastrand::Rng,
    ) -> Self {
        Self {
            map,
            player,
            budget,
            rng,
        }
    }
}
