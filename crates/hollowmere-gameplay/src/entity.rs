//! Entity base shared by every movable object.
//!
//! An [`Entity`] owns position, size, velocity, facing and knockback state.
//! Enemies, bosses and the player all compose one rather than inherit from it.

use glam::Vec2;
use hollowmere_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::physics::{Aabb, TileMap};

/// Per-second retention factor applied to knockback velocity.
///
/// Knockback keeps this fraction of its speed after one second, so it decays
/// smoothly instead of stopping dead when the timer runs out.
pub const KNOCKBACK_DECAY_PER_SECOND: f32 = 0.000_5;

/// Default knockback duration for regular entities, in seconds.
pub const DEFAULT_KNOCKBACK_DURATION: f32 = 0.2;

/// Direction an entity is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Facing up (negative Y)
    Up,
    /// Facing down (default)
    #[default]
    Down,
    /// Facing left
    Left,
    /// Facing right
    Right,
}

impl Facing {
    /// Convert facing to a unit vector.
    #[must_use]
    pub fn to_vec2(self) -> Vec2 {
        match self {
            Facing::Up => Vec2::new(0.0, -1.0),
            Facing::Down => Vec2::new(0.0, 1.0),
            Facing::Left => Vec2::new(-1.0, 0.0),
            Facing::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// Create facing from a movement vector.
    #[must_use]
    pub fn from_vec2(v: Vec2) -> Option<Self> {
        if v.x == 0.0 && v.y == 0.0 {
            return None;
        }

        // Determine primary direction based on largest component
        if v.x.abs() > v.y.abs() {
            if v.x > 0.0 {
                Some(Facing::Right)
            } else {
                Some(Facing::Left)
            }
        } else if v.y > 0.0 {
            Some(Facing::Down)
        } else {
            Some(Facing::Up)
        }
    }
}

/// A movable object in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: EntityId,
    /// Top-left corner in world pixels
    pub pos: Vec2,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
    /// Current velocity in pixels per second
    pub vel: Vec2,
    /// Facing direction
    pub facing: Facing,
    /// Dead entities take no part in collision or rendering
    pub alive: bool,
    /// Knockback velocity in pixels per second
    pub knockback: Vec2,
    /// Remaining knockback time
    pub knockback_timer: f32,
    /// Knockback time applied on each hit
    pub knockback_duration: f32,
}

impl Entity {
    /// Creates a live entity at a top-left position.
    #[must_use]
    pub fn new(id: EntityId, pos: Vec2, width: f32, height: f32) -> Self {
        Self {
            id,
            pos,
            width,
            height,
            vel: Vec2::ZERO,
            facing: Facing::Down,
            alive: true,
            knockback: Vec2::ZERO,
            knockback_timer: 0.0,
            knockback_duration: DEFAULT_KNOCKBACK_DURATION,
        }
    }

    /// Creates a live entity centered on a position.
    #[must_use]
    pub fn centered(id: EntityId, center: Vec2, width: f32, height: f32) -> Self {
        Self::new(
            id,
            center - Vec2::new(width * 0.5, height * 0.5),
            width,
            height,
        )
    }

    /// Sets the knockback duration.
    #[must_use]
    pub fn with_knockback_duration(mut self, duration: f32) -> Self {
        self.knockback_duration = duration.max(0.0);
        self
    }

    /// Center point of the entity.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Moves the entity so its center lands on `center`.
    pub fn set_center(&mut self, center: Vec2) {
        self.pos = center - Vec2::new(self.width * 0.5, self.height * 0.5);
    }

    /// Bounding box of the entity.
    #[must_use]
    pub fn rect(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.width, self.height)
    }

    /// Distance between centers.
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.center().distance(point)
    }

    /// Checks whether two live entities overlap.
    #[must_use]
    pub fn collides_with(&self, other: &Entity) -> bool {
        self.alive && other.alive && self.rect().overlaps(&other.rect())
    }

    /// Checks whether this live entity overlaps a rectangle.
    #[must_use]
    pub fn overlaps_rect(&self, rect: &Aabb) -> bool {
        self.alive && self.rect().overlaps(rect)
    }

    /// Pushes the entity away from a source point.
    ///
    /// A source exactly at the entity center pushes along +X.
    pub fn apply_knockback(&mut self, source: Vec2, strength: f32) {
        let away = self.center() - source;
        let dir = if away.length_squared() > f32::EPSILON {
            away.normalize()
        } else {
            Vec2::X
        };
        self.knockback = dir * strength;
        self.knockback_timer = self.knockback_duration;
    }

    /// Advances knockback decay.
    ///
    /// Once the timer runs out both components and the timer are exactly zero.
    pub fn update_knockback(&mut self, dt: f32) {
        if self.knockback_timer <= 0.0 {
            self.knockback = Vec2::ZERO;
            self.knockback_timer = 0.0;
            return;
        }
        self.knockback_timer -= dt;
        if self.knockback_timer <= 0.0 {
            self.knockback = Vec2::ZERO;
            self.knockback_timer = 0.0;
        } else {
            self.knockback *= KNOCKBACK_DECAY_PER_SECOND.powf(dt);
        }
    }

    /// Whether knockback currently overrides voluntary movement.
    #[must_use]
    pub fn is_knocked_back(&self) -> bool {
        self.knockback_timer > 0.0
    }

    /// Moves by `velocity * dt`, resolving collision one axis at a time.
    ///
    /// Long moves are split into half-tile steps so fast movers cannot
    /// tunnel through a wall in a single frame.
    pub fn move_and_collide(&mut self, velocity: Vec2, dt: f32, map: &dyn TileMap) {
        let delta = velocity * dt;
        let max_step = map.tile_size() * 0.5;
        let steps = (delta.abs().max_element() / max_step).ceil().max(1.0) as u32;
        let step = delta / steps as f32;

        for _ in 0..steps {
            if step.x != 0.0 {
                self.pos.x += step.x;
                self.pos.x = map.resolve_collision_x(self.rect(), step.x);
            }
            if step.y != 0.0 {
                self.pos.y += step.y;
                self.pos.y = map.resolve_collision_y(self.rect(), step.y);
            }
        }
    }

    /// Moves by `velocity * dt` ignoring the tile map.
    pub fn move_free(&mut self, velocity: Vec2, dt: f32) {
        self.pos += velocity * dt;
    }

    /// Turns to face along a vector, keeping the old facing for zero input.
    pub fn face_towards(&mut self, direction: Vec2) {
        if let Some(facing) = Facing::from_vec2(direction) {
            self.facing = facing;
        }
    }
}

/// Velocity that moves from `from` towards `to` at `speed`, zero when already there.
#[must_use]
pub fn seek(from: Vec2, to: Vec2, speed: f32) -> Vec2 {
    let delta = to - from;
    if delta.length_squared() < 1.0 {
        Vec2::ZERO
    } else {
        delta.normalize() * speed
    }
}
