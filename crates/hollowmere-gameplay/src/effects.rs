//! Side effects requested by enemies and bosses during a tick.
//!
//! Combatants never touch the world directly. They push requests into their
//! own [`FrameEffects`] queue, which is cleared at the start of their update
//! and drained by the world (and by renderers or sound layers) afterwards.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::enemy::EnemyKind;
use crate::physics::Aabb;
use crate::player::StatusEffect;

// ============================================================================
// Projectiles
// ============================================================================

/// Visual and behavioral family of a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Thorn spat by a vine snapper
    Thorn,
    /// Lobbed magma glob; arcs over walls
    Magma,
    /// Dark bolt from a boss barrage
    ShadowBolt,
    /// Fireball
    Fireball,
}

impl ProjectileKind {
    /// Lobbed projectiles pass over solid tiles.
    #[must_use]
    pub const fn ignores_walls(self) -> bool {
        matches!(self, Self::Magma)
    }

    /// Collision radius in pixels.
    #[must_use]
    pub const fn radius(self) -> f32 {
        match self {
            Self::Thorn => 3.0,
            Self::Magma => 6.0,
            Self::ShadowBolt | Self::Fireball => 5.0,
        }
    }

    /// Seconds before the projectile fizzles.
    #[must_use]
    pub const fn lifetime(self) -> f32 {
        match self {
            Self::Thorn => 2.0,
            Self::Magma => 1.6,
            Self::ShadowBolt => 3.0,
            Self::Fireball => 2.5,
        }
    }

    /// Status effect applied on hit, if any.
    #[must_use]
    pub const fn status(self) -> Option<StatusEffect> {
        match self {
            Self::Thorn => Some(StatusEffect::Poisoned),
            Self::Magma | Self::Fireball => Some(StatusEffect::Burning),
            Self::ShadowBolt => None,
        }
    }
}

/// Request to spawn a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpawn {
    /// Spawn point
    pub origin: Vec2,
    /// Initial velocity in pixels per second
    pub velocity: Vec2,
    /// Damage dealt on hit
    pub damage: i32,
    /// Projectile family
    pub kind: ProjectileKind,
}

impl ProjectileSpawn {
    /// Projectile flying from `origin` towards `target` at `speed`.
    ///
    /// A target on top of the origin fires along +X.
    #[must_use]
    pub fn aimed(origin: Vec2, target: Vec2, speed: f32, damage: i32, kind: ProjectileKind) -> Self {
        let dir = (target - origin).try_normalize().unwrap_or(Vec2::X);
        Self {
            origin,
            velocity: dir * speed,
            damage,
            kind,
        }
    }

    /// `count` projectiles spread evenly across `arc` radians, centered on `target`.
    #[must_use]
    pub fn fan(
        origin: Vec2,
        target: Vec2,
        count: u32,
        arc: f32,
        speed: f32,
        damage: i32,
        kind: ProjectileKind,
    ) -> Vec<Self> {
        let base = (target - origin).try_normalize().unwrap_or(Vec2::X);
        let base_angle = base.y.atan2(base.x);
        if count <= 1 {
            return vec![Self::aimed(origin, target, speed, damage, kind)];
        }
        let step = arc / (count - 1) as f32;
        (0..count)
            .map(|i| {
                let angle = base_angle - arc * 0.5 + step * i as f32;
                Self {
                    origin,
                    velocity: Vec2::from_angle(angle) * speed,
                    damage,
                    kind,
                }
            })
            .collect()
    }
}

// ============================================================================
// Area effects
// ============================================================================

/// Element of a lingering hazard zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Burning ground
    Fire,
    /// Frost patch
    Ice,
    /// Meteor crater
    Meteor,
}

impl HazardKind {
    /// Status effect applied to the player standing inside.
    #[must_use]
    pub const fn status(self) -> StatusEffect {
        match self {
            Self::Fire | Self::Meteor => StatusEffect::Burning,
            Self::Ice => StatusEffect::Chilled,
        }
    }
}

/// Request to place a timed hazard zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardSpawn {
    /// Zone center
    pub center: Vec2,
    /// Zone radius
    pub radius: f32,
    /// Lifetime in seconds
    pub duration: f32,
    /// Damage per tick of the zone
    pub damage: i32,
    /// Element
    pub kind: HazardKind,
}

/// Request to spawn a minion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummonRequest {
    /// Enemy to spawn
    pub kind: EnemyKind,
    /// Spawn center
    pub position: Vec2,
}

/// Instant circular blast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shockwave {
    /// Blast center
    pub center: Vec2,
    /// Blast radius
    pub radius: f32,
    /// Damage on hit
    pub damage: i32,
    /// Knockback strength applied away from the center
    pub knockback: f32,
}

/// Rectangular damage area active for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageZone {
    /// Area covered
    pub rect: Aabb,
    /// Damage on hit
    pub damage: i32,
    /// Status effect applied on hit
    pub status: Option<StatusEffect>,
}

/// Everything a combatant asked for during its last update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameEffects {
    /// Projectiles to launch
    pub projectiles: Vec<ProjectileSpawn>,
    /// Hazard zones to place
    pub hazards: Vec<HazardSpawn>,
    /// Minions to spawn
    pub summons: Vec<SummonRequest>,
    /// Blasts to resolve
    pub shockwaves: Vec<Shockwave>,
    /// Damage rectangles to resolve
    pub damage_zones: Vec<DamageZone>,
}

impl FrameEffects {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every queue.
    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.hazards.clear();
        self.summons.clear();
        self.shockwaves.clear();
        self.damage_zones.clear();
    }

    /// Whether nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
            && self.hazards.is_empty()
            && self.summons.is_empty()
            && self.shockwaves.is_empty()
            && self.damage_zones.is_empty()
    }

    /// Moves every request of `other` into `self`.
    pub fn append(&mut self, other: &mut FrameEffects) {
        self.projectiles.append(&mut other.projectiles);
        self.hazards.append(&mut other.hazards);
        self.summons.append(&mut other.summons);
        self.shockwaves.append(&mut other.shockwaves);
        self.damage_zones.append(&mut other.damage_zones);
    }

    /// Copies every request of `other` into `self`.
    pub fn extend_from(&mut self, other: &FrameEffects) {
        self.projectiles.extend_from_slice(&other.projectiles);
        self.hazards.extend_from_slice(&other.hazards);
        self.summons.extend_from_slice(&other.summons);
        self.shockwaves.extend_from_slice(&other.shockwaves);
        self.damage_zones.extend_from_slice(&other.damage_zones);
    }
}
