//! Tile map contract and AABB collision against the tile grid.
//!
//! This module provides the spatial oracle every movable object consults:
//! - [`Aabb`] rectangles in world pixels
//! - [`TileMap`], the collaborator interface a level implements
//! - [`GridMap`], a dense in-memory tile grid used by demos and tests
//!
//! Collision is resolved one axis at a time: move along X, push out of any
//! solid tile, then do the same for Y.

use glam::Vec2;
use hollowmere_common::{TileCoord, TILE_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Small inset so a rectangle flush against a tile edge does not count as
/// overlapping the neighbouring tile.
const EDGE_EPSILON: f32 = 0.001;

/// Errors that can occur while building tile maps.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MapError {
    /// Map rows have differing lengths
    #[error("row {row} has width {found}, expected {expected}")]
    RaggedRow {
        /// Offending row index
        row: usize,
        /// Width of the first row
        expected: usize,
        /// Width of the offending row
        found: usize,
    },

    /// Unknown tile glyph
    #[error("unknown tile glyph '{glyph}' at ({col}, {row})")]
    UnknownGlyph {
        /// Glyph found
        glyph: char,
        /// Column
        col: usize,
        /// Row
        row: usize,
    },

    /// Map has no rows or no columns
    #[error("map is empty")]
    Empty,
}

/// Axis-aligned bounding box in world pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Top-left corner
    pub min: Vec2,
    /// Bottom-right corner
    pub max: Vec2,
}

impl Aabb {
    /// Creates an AABB from its top-left corner and size.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    /// Creates an AABB from center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec2, half_width: f32, half_height: f32) -> Self {
        Self {
            min: Vec2::new(center.x - half_width, center.y - half_height),
            max: Vec2::new(center.x + half_width, center.y + half_height),
        }
    }

    /// Returns the center of the AABB.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns the width of the AABB.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Returns the height of the AABB.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Checks if this AABB overlaps with another.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Checks if a point lies inside the AABB.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }

    /// Checks if a circle touches the AABB.
    #[must_use]
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    /// Returns the AABB translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Returns the AABB moved so its top-left corner is at `x`.
    #[must_use]
    pub fn with_min_x(&self, x: f32) -> Self {
        let w = self.width();
        Self {
            min: Vec2::new(x, self.min.y),
            max: Vec2::new(x + w, self.max.y),
        }
    }

    /// Returns the AABB moved so its top edge is at `y`.
    #[must_use]
    pub fn with_min_y(&self, y: f32) -> Self {
        let h = self.height();
        Self {
            min: Vec2::new(self.min.x, y),
            max: Vec2::new(self.max.x, y + h),
        }
    }
}

/// Kind of terrain in one map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Walkable ground
    #[default]
    Floor,
    /// Impassable wall
    Wall,
    /// Deep water, impassable on foot
    Water,
    /// Walkable but harmful (lava, spikes)
    Hazard,
}

impl TileKind {
    /// Whether movement is blocked by this tile.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Wall | Self::Water)
    }

    /// Whether standing on this tile hurts.
    #[must_use]
    pub const fn is_hazard(self) -> bool {
        matches!(self, Self::Hazard)
    }

    /// Parses an ASCII map glyph.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' | ' ' => Some(Self::Floor),
            '#' => Some(Self::Wall),
            '~' => Some(Self::Water),
            '^' => Some(Self::Hazard),
            _ => None,
        }
    }
}

/// Spatial oracle the simulation core consults.
///
/// Coordinates outside the map are treated as solid so nothing can walk or
/// see off the edge of a level.
pub trait TileMap {
    /// Map width in tiles.
    fn width(&self) -> i32;

    /// Map height in tiles.
    fn height(&self) -> i32;

    /// Tile at a grid position, `None` when out of bounds.
    fn tile(&self, col: i32, row: i32) -> Option<TileKind>;

    /// Edge length of a tile in pixels.
    fn tile_size(&self) -> f32 {
        TILE_SIZE
    }

    /// Checks whether a grid position lies inside the map.
    fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && col < self.width() && row < self.height()
    }

    /// Checks if the tile blocks movement and sight.
    fn is_solid(&self, col: i32, row: i32) -> bool {
        self.tile(col, row).map_or(true, TileKind::is_solid)
    }

    /// Checks if the tile damages whoever stands on it.
    fn is_hazard(&self, col: i32, row: i32) -> bool {
        self.tile(col, row).is_some_and(TileKind::is_hazard)
    }

    /// Tile under a world-space pixel position.
    fn get_tile_at(&self, px: f32, py: f32) -> Option<TileKind> {
        let coord = TileCoord::from_world_sized(Vec2::new(px, py), self.tile_size());
        self.tile(coord.col, coord.row)
    }

    /// Checks if a world-space point is inside a solid tile.
    fn is_solid_at(&self, point: Vec2) -> bool {
        let coord = TileCoord::from_world_sized(point, self.tile_size());
        self.is_solid(coord.col, coord.row)
    }

    /// Checks if any tile overlapped by the rectangle is solid.
    fn rect_hits_solid(&self, rect: &Aabb) -> bool {
        let (c0, c1, r0, r1) = tile_span(rect, self.tile_size());
        (r0..=r1).any(|row| (c0..=c1).any(|col| self.is_solid(col, row)))
    }

    /// Pushes a rectangle that just moved `dx` horizontally out of solid tiles.
    ///
    /// Returns the corrected left edge.
    fn resolve_collision_x(&self, rect: Aabb, dx: f32) -> f32 {
        let ts = self.tile_size();
        let (c0, c1, r0, r1) = tile_span(&rect, ts);
        if dx > 0.0 {
            for col in c0..=c1 {
                if (r0..=r1).any(|row| self.is_solid(col, row)) {
                    return col as f32 * ts - rect.width();
                }
            }
        } else if dx < 0.0 {
            for col in (c0..=c1).rev() {
                if (r0..=r1).any(|row| self.is_solid(col, row)) {
                    return (col + 1) as f32 * ts;
                }
            }
        }
        rect.min.x
    }

    /// Pushes a rectangle that just moved `dy` vertically out of solid tiles.
    ///
    /// Returns the corrected top edge.
    fn resolve_collision_y(&self, rect: Aabb, dy: f32) -> f32 {
        let ts = self.tile_size();
        let (c0, c1, r0, r1) = tile_span(&rect, ts);
        if dy > 0.0 {
            for row in r0..=r1 {
                if (c0..=c1).any(|col| self.is_solid(col, row)) {
                    return row as f32 * ts - rect.height();
                }
            }
        } else if dy < 0.0 {
            for row in (r0..=r1).rev() {
                if (c0..=c1).any(|col| self.is_solid(col, row)) {
                    return (row + 1) as f32 * ts;
                }
            }
        }
        rect.min.y
    }
}

/// Inclusive tile range `(col_min, col_max, row_min, row_max)` a rectangle covers.
fn tile_span(rect: &Aabb, tile_size: f32) -> (i32, i32, i32, i32) {
    let c0 = (rect.min.x / tile_size).floor() as i32;
    let c1 = ((rect.max.x - EDGE_EPSILON) / tile_size).floor() as i32;
    let r0 = (rect.min.y / tile_size).floor() as i32;
    let r1 = ((rect.max.y - EDGE_EPSILON) / tile_size).floor() as i32;
    (c0, c1.max(c0), r0, r1.max(r0))
}

/// Picks a random walkable position where a box of `size` fits.
///
/// Returns the top-left corner of the box, or `None` after `attempts` misses.
pub fn random_open_position(
    map: &dyn TileMap,
    rng: &mut fastrand::Rng,
    size: Vec2,
    attempts: u32,
) -> Option<Vec2> {
    if map.width() <= 0 || map.height() <= 0 {
        return None;
    }
    let ts = map.tile_size();
    for _ in 0..attempts {
        let col = rng.i32(0..map.width());
        let row = rng.i32(0..map.height());
        if map.is_solid(col, row) || map.is_hazard(col, row) {
            continue;
        }
        let center = TileCoord::new(col, row).center_sized(ts);
        let rect = Aabb::from_center(center, size.x * 0.5, size.y * 0.5);
        if !map.rect_hits_solid(&rect) {
            return Some(rect.min);
        }
    }
    None
}

/// Dense tile grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMap {
    width: i32,
    height: i32,
    tile_size: f32,
    tiles: Vec<TileKind>,
}

impl GridMap {
    /// Creates a map filled with one tile kind.
    #[must_use]
    pub fn new(width: i32, height: i32, fill: TileKind) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            tile_size: TILE_SIZE,
            tiles: vec![fill; (width * height) as usize],
        }
    }

    /// Creates a floor map ringed by walls.
    #[must_use]
    pub fn walled(width: i32, height: i32) -> Self {
        let mut map = Self::new(width, height, TileKind::Floor);
        for col in 0..width {
            map.set_tile(col, 0, TileKind::Wall);
            map.set_tile(col, height - 1, TileKind::Wall);
        }
        for row in 0..height {
            map.set_tile(0, row, TileKind::Wall);
            map.set_tile(width - 1, row, TileKind::Wall);
        }
        map
    }

    /// Parses a map from ASCII rows.
    ///
    /// `#` wall, `.` floor, `~` water, `^` hazard.
    pub fn from_rows(rows: &[&str]) -> Result<Self, MapError> {
        let expected = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if expected == 0 {
            return Err(MapError::Empty);
        }

        let mut tiles = Vec::with_capacity(expected * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != expected {
                return Err(MapError::RaggedRow {
                    row,
                    expected,
                    found,
                });
            }
            for (col, glyph) in line.chars().enumerate() {
                let tile =
                    TileKind::from_glyph(glyph).ok_or(MapError::UnknownGlyph { glyph, col, row })?;
                tiles.push(tile);
            }
        }

        Ok(Self {
            width: expected as i32,
            height: rows.len() as i32,
            tile_size: TILE_SIZE,
            tiles,
        })
    }

    /// Overrides the tile size.
    #[must_use]
    pub fn with_tile_size(mut self, tile_size: f32) -> Self {
        self.tile_size = tile_size.max(1.0);
        self
    }

    /// Sets a tile; out-of-bounds writes are ignored.
    pub fn set_tile(&mut self, col: i32, row: i32, kind: TileKind) {
        if let Some(index) = self.index(col, row) {
            self.tiles[index] = kind;
        }
    }

    /// Map size in world pixels.
    #[must_use]
    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.tile_size,
            self.height as f32 * self.tile_size,
        )
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if self.in_bounds(col, row) {
            Some((row * self.width + col) as usize)
        } else {
            None
        }
    }
}

impl TileMap for GridMap {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn tile(&self, col: i32, row: i32) -> Option<TileKind> {
        self.index(col, row).map(|i| self.tiles[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> GridMap {
        GridMap::from_rows(&[
            "#######",
            "#.....#",
            "#..#..#",
            "#.....#",
            "#######",
        ])
        .unwrap_or_else(|_| GridMap::walled(7, 5))
    }

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::new(5.0, 5.0, 10.0, 10.0);
        let c = Aabb::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        // Touching edges do not overlap
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_aabb_circle() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects_circle(Vec2::new(15.0, 5.0), 5.0));
        assert!(!a.intersects_circle(Vec2::new(16.0, 5.0), 5.0));
    }

    #[test]
    fn test_from_rows() {
        let map = room();
        assert_eq!(map.width(), 7);
        assert_eq!(map.height(), 5);
        assert!(map.is_solid(0, 0));
        assert!(map.is_solid(3, 2));
        assert!(!map.is_solid(1, 1));
    }

    #[test]
    fn test_from_rows_errors() {
        assert_eq!(GridMap::from_rows(&[]), Err(MapError::Empty));
        assert!(matches!(
            GridMap::from_rows(&["##", "#"]),
            Err(MapError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            GridMap::from_rows(&["#x"]),
            Err(MapError::UnknownGlyph { glyph: 'x', .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_is_solid() {
        let map = room();
        assert!(map.is_solid(-1, 2));
        assert!(map.is_solid(100, 2));
        assert!(!map.is_hazard(-1, 2));
        assert_eq!(map.get_tile_at(-5.0, 5.0), None);
    }

    #[test]
    fn test_resolve_collision_x_moving_right() {
        let map = room();
        // Box 12 wide, pushed into the pillar at column 3 (x = 48..64)
        let rect = Aabb::new(40.0, 36.0, 12.0, 8.0);
        let x = map.resolve_collision_x(rect, 4.0);
        assert!((x - 36.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resolve_collision_x_moving_left() {
        let map = room();
        let rect = Aabb::new(10.0, 20.0, 12.0, 8.0);
        let x = map.resolve_collision_x(rect, -4.0);
        assert!((x - 16.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resolve_collision_y() {
        let map = room();
        let rect = Aabb::new(20.0, 60.0, 8.0, 8.0);
        let y = map.resolve_collision_y(rect, 3.0);
        assert!((y - 56.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_flush_edge_is_not_a_hit() {
        let map = room();
        let rect = Aabb::new(16.0, 16.0, 16.0, 16.0);
        assert!(!map.rect_hits_solid(&rect));
    }

    #[test]
    fn test_random_open_position() {
        let map = room();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..20 {
            let pos = random_open_position(&map, &mut rng, Vec2::splat(8.0), 50);
            let pos = pos.unwrap_or(Vec2::ZERO);
            assert!(!map.rect_hits_solid(&Aabb::new(pos.x, pos.y, 8.0, 8.0)));
        }
    }

    #[test]
    fn test_random_open_position_gives_up() {
        let map = GridMap::new(4, 4, TileKind::Wall);
        let mut rng = fastrand::Rng::with_seed(7);
        assert!(random_open_position(&map, &mut rng, Vec2::splat(8.0), 10).is_none());
    }
}
