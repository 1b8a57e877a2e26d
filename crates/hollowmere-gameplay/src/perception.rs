//! Perception services: line of sight, grid pathfinding and the per-frame
//! pathfinding budget.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;
use glam::Vec2;
use hollowmere_common::TileCoord;
use serde::{Deserialize, Serialize};

use crate::physics::TileMap;

/// Extra step cost for walking across a hazard tile when avoiding hazards.
pub const HAZARD_PENALTY: u32 = 6;

/// Upper bound on nodes expanded by a single search.
pub const MAX_EXPANSIONS: usize = 4096;

/// Samples taken per tile along a sight line.
const LOS_SAMPLES_PER_TILE: f32 = 4.0;

/// Checks whether a straight segment between two world points is clear.
///
/// Samples the segment at quarter-tile spacing and returns `false` as soon as
/// a sample lands on a solid tile.
pub fn has_line_of_sight(map: &dyn TileMap, from: Vec2, to: Vec2) -> bool {
    let distance = from.distance(to);
    let step = map.tile_size() / LOS_SAMPLES_PER_TILE;
    let samples = (distance / step).ceil().max(1.0) as u32;

    (0..=samples).all(|i| {
        let t = i as f32 / samples as f32;
        !map.is_solid_at(from.lerp(to, t))
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct ScoredNode {
    tile: TileCoord,
    f_score: u32,
    h_score: u32,
}

// BinaryHeap is a max-heap, so we reverse the ordering for min-heap behavior
impl Ord for ScoredNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
    }
}

impl PartialOrd for ScoredNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds a route between two world positions over the tile grid.
///
/// Runs A* over orthogonal moves. Any route whose cost exceeds
/// `max_distance` is abandoned. With `avoid_hazards`, hazard tiles cost
/// [`HAZARD_PENALTY`] extra, so they are only crossed when no safer route
/// fits the budget.
///
/// Returns pixel-space waypoint centers excluding the start tile, or an
/// empty vector when the target is unreachable, solid, already reached, or
/// over budget.
pub fn find_path(
    map: &dyn TileMap,
    from: Vec2,
    to: Vec2,
    max_distance: u32,
    avoid_hazards: bool,
) -> Vec<Vec2> {
    let ts = map.tile_size();
    let start = TileCoord::from_world_sized(from, ts);
    let goal = TileCoord::from_world_sized(to, ts);

    if start == goal || map.is_solid(goal.col, goal.row) {
        return Vec::new();
    }
    if start.manhattan(goal) > max_distance {
        return Vec::new();
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<TileCoord, TileCoord> = AHashMap::new();
    let mut g_score: AHashMap<TileCoord, u32> = AHashMap::new();
    let mut expansions = 0usize;

    g_score.insert(start, 0);
    open_set.push(ScoredNode {
        tile: start,
        f_score: start.manhattan(goal),
        h_score: start.manhattan(goal),
    });

    while let Some(current) = open_set.pop() {
        if current.tile == goal {
            return reconstruct_path(&came_from, goal, ts);
        }

        expansions += 1;
        if expansions > MAX_EXPANSIONS {
            break;
        }

        let current_g = g_score.get(&current.tile).copied().unwrap_or(u32::MAX);
        // Stale heap entry
        if current.f_score > current_g.saturating_add(current.h_score) {
            continue;
        }

        for neighbour in current.tile.neighbours() {
            if map.is_solid(neighbour.col, neighbour.row) {
                continue;
            }

            let mut step_cost = 1;
            if avoid_hazards && map.is_hazard(neighbour.col, neighbour.row) {
                step_cost += HAZARD_PENALTY;
            }

            let tentative_g = current_g.saturating_add(step_cost);
            if tentative_g > max_distance {
                continue;
            }

            let neighbour_g = g_score.get(&neighbour).copied().unwrap_or(u32::MAX);
            if tentative_g < neighbour_g {
                came_from.insert(neighbour, current.tile);
                g_score.insert(neighbour, tentative_g);
                let h = neighbour.manhattan(goal);
                open_set.push(ScoredNode {
                    tile: neighbour,
                    f_score: tentative_g + h,
                    h_score: h,
                });
            }
        }
    }

    Vec::new()
}

/// Rebuilds the tile chain ending at `goal`, dropping the start tile.
fn reconstruct_path(
    came_from: &AHashMap<TileCoord, TileCoord>,
    goal: TileCoord,
    tile_size: f32,
) -> Vec<Vec2> {
    let mut tiles = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        tiles.push(prev);
        current = prev;
    }
    tiles.reverse();
    tiles
        .into_iter()
        .skip(1)
        .map(|t| t.center_sized(tile_size))
        .collect()
}

/// Per-frame allowance of path searches.
///
/// When the allowance is spent, or pathfinding is switched off, callers fall
/// back to straight-line movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathfindBudget {
    enabled: bool,
    per_frame: u32,
    used: u32,
}

impl Default for PathfindBudget {
    fn default() -> Self {
        Self::new(4)
    }
}

impl PathfindBudget {
    /// Creates an enabled budget allowing `per_frame` searches each frame.
    #[must_use]
    pub const fn new(per_frame: u32) -> Self {
        Self {
            enabled: true,
            per_frame,
            used: 0,
        }
    }

    /// Creates a budget that never allows searching.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            per_frame: 0,
            used: 0,
        }
    }

    /// Resets the per-frame counter.
    pub fn begin_frame(&mut self) {
        self.used = 0;
    }

    /// Whether another search may run this frame.
    #[must_use]
    pub const fn can_pathfind(&self) -> bool {
        self.enabled && self.used < self.per_frame
    }

    /// Records a search; returns `false` if none were left.
    pub fn consume(&mut self) -> bool {
        if self.can_pathfind() {
            self.used += 1;
            true
        } else {
            false
        }
    }

    /// Enables or disables pathfinding globally.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Searches run since the last [`Self::begin_frame`].
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.used
    }
}
