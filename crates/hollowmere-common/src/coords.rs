//! Coordinate types for world pixels and the tile grid.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Edge length of one map tile in world pixels.
pub const TILE_SIZE: f32 = 16.0;

/// Tile coordinate (column, row) on a tile map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column index
    pub col: i32,
    /// Row index
    pub row: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Returns the tile containing a world position.
    #[must_use]
    pub fn from_world(pos: Vec2) -> Self {
        Self::from_world_sized(pos, TILE_SIZE)
    }

    /// Returns the tile containing a world position for a given tile size.
    #[must_use]
    pub fn from_world_sized(pos: Vec2, tile_size: f32) -> Self {
        Self {
            col: (pos.x / tile_size).floor() as i32,
            row: (pos.y / tile_size).floor() as i32,
        }
    }

    /// Returns the world-space center of this tile.
    #[must_use]
    pub fn center(self) -> Vec2 {
        self.center_sized(TILE_SIZE)
    }

    /// Returns the world-space center of this tile for a given tile size.
    #[must_use]
    pub fn center_sized(self, tile_size: f32) -> Vec2 {
        Vec2::new(
            (self.col as f32 + 0.5) * tile_size,
            (self.row as f32 + 0.5) * tile_size,
        )
    }

    /// Returns the world-space top-left corner of this tile.
    #[must_use]
    pub fn origin_sized(self, tile_size: f32) -> Vec2 {
        Vec2::new(self.col as f32 * tile_size, self.row as f32 * tile_size)
    }

    /// Manhattan distance to another tile.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }

    /// Returns the four orthogonal neighbours.
    #[must_use]
    pub const fn neighbours(self) -> [Self; 4] {
        [
            Self::new(self.col + 1, self.row),
            Self::new(self.col - 1, self.row),
            Self::new(self.col, self.row + 1),
            Self::new(self.col, self.row - 1),
        ]
    }
}
