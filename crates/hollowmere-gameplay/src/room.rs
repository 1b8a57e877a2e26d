//! Camera-locked rooms and scrolled transitions between them.
//!
//! The tile map is cut into fixed-size rooms. Walking across a room edge
//! scrolls the camera to the neighbour over a short transition. Combat rooms
//! lock on entry and keep the player inside until their enemies are gone.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::physics::Aabb;

/// Default transition duration in seconds.
pub const DEFAULT_TRANSITION_DURATION: f32 = 0.6;

/// Easing function for transition timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEasing {
    /// Linear interpolation.
    Linear,
    /// Ease in and out (slow start and end).
    #[default]
    EaseInOut,
    /// Smooth step (Hermite interpolation).
    SmoothStep,
}

impl TransitionEasing {
    /// Applies the easing function to a normalized time value.
    #[must_use]
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            },
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Room layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Room width in tiles.
    pub room_cols: u32,
    /// Room height in tiles.
    pub room_rows: u32,
    /// Transition length in seconds.
    pub transition_duration: f32,
    /// Transition easing.
    pub easing: TransitionEasing,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            room_cols: 16,
            room_rows: 11,
            transition_duration: DEFAULT_TRANSITION_DURATION,
            easing: TransitionEasing::EaseInOut,
        }
    }
}

/// Grid position of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoomCoord {
    /// Column of rooms.
    pub x: i32,
    /// Row of rooms.
    pub y: i32,
}

impl RoomCoord {
    /// Creates a room coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One room of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Grid position.
    pub coord: RoomCoord,
    /// Pixel bounds.
    pub bounds: Aabb,
    /// Locks on entry until cleared.
    pub is_combat: bool,
    /// Enemies defeated.
    pub cleared: bool,
}

/// Something the room manager wants the game to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// Camera started scrolling.
    TransitionStarted {
        /// Room being left.
        from: RoomCoord,
        /// Room being entered.
        to: RoomCoord,
    },
    /// Camera settled in a new room.
    Entered(RoomCoord),
    /// Combat room locked.
    Locked(RoomCoord),
    /// Combat room cleared and unlocked.
    Unlocked(RoomCoord),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    from: RoomCoord,
    to: RoomCoord,
    elapsed: f32,
}

/// Tracks which room the camera is in.
#[derive(Debug, Clone)]
pub struct RoomManager {
    config: RoomConfig,
    room_size: Vec2,
    cols: i32,
    rows: i32,
    rooms: Vec<Room>,
    current: RoomCoord,
    transition: Option<Transition>,
    locked: bool,
}

impl RoomManager {
    /// Partitions a map of `map_cols x map_rows` tiles into rooms.
    #[must_use]
    pub fn new(map_cols: u32, map_rows: u32, tile_size: f32, config: RoomConfig) -> Self {
        let room_cols = config.room_cols.max(1);
        let room_rows = config.room_rows.max(1);
        let cols = map_cols.div_ceil(room_cols).max(1) as i32;
        let rows = map_rows.div_ceil(room_rows).max(1) as i32;
        let room_size = Vec2::new(room_cols as f32, room_rows as f32) * tile_size;

        let mut rooms = Vec::with_capacity((cols * rows) as usize);
        for y in 0..rows {
            for x in 0..cols {
                let origin = Vec2::new(x as f32, y as f32) * room_size;
                rooms.push(Room {
                    coord: RoomCoord::new(x, y),
                    bounds: Aabb::new(origin.x, origin.y, room_size.x, room_size.y),
                    is_combat: false,
                    cleared: false,
                });
            }
        }

        Self {
            config,
            room_size,
            cols,
            rows,
            rooms,
            current: RoomCoord::default(),
            transition: None,
            locked: false,
        }
    }

    fn index(&self, coord: RoomCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.cols || coord.y >= self.rows {
            return None;
        }
        Some((coord.y * self.cols + coord.x) as usize)
    }

    /// Room size in pixels.
    #[must_use]
    pub fn room_size(&self) -> Vec2 {
        self.room_size
    }

    /// Gets a room.
    #[must_use]
    pub fn room(&self, coord: RoomCoord) -> Option<&Room> {
        self.index(coord).map(|i| &self.rooms[i])
    }

    /// Room containing a pixel position, clamped to the grid.
    #[must_use]
    pub fn room_at(&self, pos: Vec2) -> RoomCoord {
        let x = (pos.x / self.room_size.x).floor() as i32;
        let y = (pos.y / self.room_size.y).floor() as i32;
        RoomCoord::new(x.clamp(0, self.cols - 1), y.clamp(0, self.rows - 1))
    }

    /// Room the camera is in (the destination while scrolling).
    #[must_use]
    pub fn current(&self) -> RoomCoord {
        self.transition.map_or(self.current, |t| t.to)
    }

    /// Marks a room as a combat room.
    pub fn set_combat(&mut self, coord: RoomCoord, is_combat: bool) {
        if let Some(i) = self.index(coord) {
            self.rooms[i].is_combat = is_combat;
        }
    }

    /// Whether the camera is scrolling.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Transition progress in `[0, 1]`, if scrolling.
    #[must_use]
    pub fn transition_progress(&self) -> Option<f32> {
        let duration = self.config.transition_duration.max(f32::EPSILON);
        self.transition
            .map(|t| (t.elapsed / duration).clamp(0.0, 1.0))
    }

    /// Whether the player is shut in the current room.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Top-left corner of the camera in pixels.
    #[must_use]
    pub fn camera_position(&self) -> Vec2 {
        let origin = |c: RoomCoord| Vec2::new(c.x as f32, c.y as f32) * self.room_size;
        match (self.transition, self.transition_progress()) {
            (Some(t), Some(progress)) => {
                let eased = self.config.easing.apply(progress);
                origin(t.from).lerp(origin(t.to), eased)
            },
            _ => origin(self.current),
        }
    }

    /// Jumps straight to the room containing `pos`, without a transition.
    pub fn snap_to(&mut self, pos: Vec2) {
        self.current = self.room_at(pos);
        self.transition = None;
        self.locked = false;
    }

    /// Advances the transition or starts one when the player crosses an edge.
    pub fn update(&mut self, dt: f32, player_center: Vec2) -> Vec<RoomEvent> {
        let mut events = Vec::new();

        if let Some(mut t) = self.transition {
            t.elapsed += dt;
            if t.elapsed >= self.config.transition_duration {
                self.transition = None;
                self.current = t.to;
                debug!("Entered room ({}, {})", t.to.x, t.to.y);
                events.push(RoomEvent::Entered(t.to));
                let lock = self
                    .room(t.to)
                    .is_some_and(|r| r.is_combat && !r.cleared);
                if lock {
                    self.locked = true;
                    info!("Room ({}, {}) locked", t.to.x, t.to.y);
                    events.push(RoomEvent::Locked(t.to));
                }
            } else {
                self.transition = Some(t);
            }
            return events;
        }

        if self.locked {
            return events;
        }
        let target = self.room_at(player_center);
        if target != self.current {
            self.transition = Some(Transition {
                from: self.current,
                to: target,
                elapsed: 0.0,
            });
            events.push(RoomEvent::TransitionStarted {
                from: self.current,
                to: target,
            });
        }
        events
    }

    /// Unlocks the current room once no enemies remain in it.
    pub fn notify_enemies_remaining(&mut self, remaining: usize) -> Option<RoomEvent> {
        if !self.locked || remaining > 0 {
            return None;
        }
        self.locked = false;
        let coord = self.current;
        if let Some(i) = self.index(coord) {
            self.rooms[i].cleared = true;
        }
        info!("Room ({}, {}) cleared", coord.x, coord.y);
        Some(RoomEvent::Unlocked(coord))
    }

    /// Keeps a rectangle's top-left inside the current room while locked.
    #[must_use]
    pub fn clamp_position(&self, top_left: Vec2, size: Vec2) -> Vec2 {
        if !self.locked {
            return top_left;
        }
        let Some(room) = self.room(self.current) else {
            return top_left;
        };
        let max = (room.bounds.max - size).max(room.bounds.min);
        top_left.clamp(room.bounds.min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RoomManager {
        // 2 x 1 rooms of 10 x 10 tiles, 16 px each
        RoomManager::new(
            20,
            10,
            16.0,
            RoomConfig {
                room_cols: 10,
                room_rows: 10,
                transition_duration: 0.5,
                easing: TransitionEasing::Linear,
            },
        )
    }

    #[test]
    fn test_partition() {
        let rooms = manager();
        assert!(rooms.room(RoomCoord::new(1, 0)).is_some());
        assert!(rooms.room(RoomCoord::new(2, 0)).is_none());
        assert_eq!(rooms.room_at(Vec2::new(170.0, 20.0)), RoomCoord::new(1, 0));
        assert_eq!(rooms.room_at(Vec2::new(-5.0, 500.0)), RoomCoord::new(0, 0));
    }

    #[test]
    fn test_transition_scrolls_camera() {
        let mut rooms = manager();
        let events = rooms.update(0.016, Vec2::new(165.0, 80.0));
        assert_eq!(
            events,
            vec![RoomEvent::TransitionStarted {
                from: RoomCoord::new(0, 0),
                to: RoomCoord::new(1, 0),
            }]
        );

        rooms.update(0.25, Vec2::new(165.0, 80.0));
        let progress = rooms.transition_progress().unwrap_or(0.0);
        assert!((progress - 0.5).abs() < 1e-4);
        assert!((rooms.camera_position().x - 80.0).abs() < 1e-3);

        let events = rooms.update(0.3, Vec2::new(165.0, 80.0));
        assert_eq!(events, vec![RoomEvent::Entered(RoomCoord::new(1, 0))]);
        assert!(!rooms.is_transitioning());
        assert_eq!(rooms.camera_position(), Vec2::new(160.0, 0.0));
    }

    #[test]
    fn test_progress_stays_in_unit_range() {
        let mut rooms = manager();
        rooms.update(0.0, Vec2::new(165.0, 80.0));
        for _ in 0..10 {
            if let Some(p) = rooms.transition_progress() {
                assert!((0.0..=1.0).contains(&p));
            }
            rooms.update(0.07, Vec2::new(165.0, 80.0));
        }
    }

    #[test]
    fn test_combat_room_locks_until_clear() {
        let mut rooms = manager();
        rooms.set_combat(RoomCoord::new(1, 0), true);
        rooms.update(0.0, Vec2::new(165.0, 80.0));
        let events = rooms.update(1.0, Vec2::new(165.0, 80.0));
        assert!(events.contains(&RoomEvent::Locked(RoomCoord::new(1, 0))));
        assert!(rooms.is_locked());

        // Walking back does not leave a locked room.
        assert!(rooms.update(0.1, Vec2::new(20.0, 80.0)).is_empty());
        let clamped = rooms.clamp_position(Vec2::new(150.0, 80.0), Vec2::new(12.0, 12.0));
        assert_eq!(clamped.x, 160.0);

        assert_eq!(rooms.notify_enemies_remaining(2), None);
        assert_eq!(
            rooms.notify_enemies_remaining(0),
            Some(RoomEvent::Unlocked(RoomCoord::new(1, 0)))
        );
        assert!(rooms.room(RoomCoord::new(1, 0)).is_some_and(|r| r.cleared));
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            TransitionEasing::Linear,
            TransitionEasing::EaseInOut,
            TransitionEasing::SmoothStep,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(2.0), 1.0);
        }
    }
}
