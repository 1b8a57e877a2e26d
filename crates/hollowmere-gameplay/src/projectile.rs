//! Live projectiles and lingering hazard zones.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::effects::{HazardKind, HazardSpawn, ProjectileKind, ProjectileSpawn};
use crate::physics::{Aabb, TileMap};

/// Seconds between damage ticks of a hazard zone.
pub const HAZARD_TICK_INTERVAL: f32 = 0.5;

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Current position.
    pub position: Vec2,
    /// Velocity.
    pub velocity: Vec2,
    /// Damage on hit.
    pub damage: i32,
    /// Family.
    pub kind: ProjectileKind,
    /// Time left before it fizzles.
    pub lifetime: f32,
    /// Whether projectile is still active.
    pub active: bool,
}

impl Projectile {
    /// Launches a requested projectile.
    #[must_use]
    pub fn from_spawn(spawn: &ProjectileSpawn) -> Self {
        Self {
            position: spawn.origin,
            velocity: spawn.velocity,
            damage: spawn.damage,
            kind: spawn.kind,
            lifetime: spawn.kind.lifetime(),
            active: true,
        }
    }

    /// Update projectile position.
    ///
    /// Deactivates when the lifetime runs out or a wall is hit (lobbed kinds
    /// fly over walls).
    pub fn tick(&mut self, dt: f32, map: &dyn TileMap) {
        if !self.active {
            return;
        }
        self.position += self.velocity * dt;
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            self.active = false;
        } else if !self.kind.ignores_walls() && map.is_solid_at(self.position) {
            self.active = false;
        }
    }

    /// Check collision with a rectangle.
    #[must_use]
    pub fn hits(&self, rect: &Aabb) -> bool {
        self.active && rect.intersects_circle(self.position, self.kind.radius())
    }

    /// Deactivate on hit.
    pub fn on_hit(&mut self) {
        self.active = false;
    }
}

/// A lingering damage area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    /// Center.
    pub center: Vec2,
    /// Radius.
    pub radius: f32,
    /// Damage per tick.
    pub damage: i32,
    /// Element.
    pub kind: HazardKind,
    /// Time left.
    pub remaining: f32,
    tick_timer: f32,
}

impl HazardZone {
    /// Places a requested zone.
    #[must_use]
    pub fn from_spawn(spawn: &HazardSpawn) -> Self {
        Self {
            center: spawn.center,
            radius: spawn.radius,
            damage: spawn.damage,
            kind: spawn.kind,
            remaining: spawn.duration,
            tick_timer: 0.0,
        }
    }

    /// Whether the zone has burned out.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Whether a rectangle stands inside the zone.
    #[must_use]
    pub fn covers(&self, rect: &Aabb) -> bool {
        !self.is_expired() && rect.intersects_circle(self.center, self.radius)
    }

    /// Advances timers. Returns `true` on a damage tick.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.is_expired() {
            return false;
        }
        self.remaining -= dt;
        self.tick_timer -= dt;
        if self.tick_timer <= 0.0 {
            self.tick_timer += HAZARD_TICK_INTERVAL;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::GridMap;

    fn spawn(kind: ProjectileKind, velocity: Vec2) -> ProjectileSpawn {
        ProjectileSpawn {
            origin: Vec2::new(40.0, 40.0),
            velocity,
            damage: 1,
            kind,
        }
    }

    #[test]
    fn test_projectile_stops_at_wall() {
        let map = GridMap::walled(10, 10);
        let mut p = Projectile::from_spawn(&spawn(ProjectileKind::Thorn, Vec2::new(-100.0, 0.0)));
        for _ in 0..30 {
            p.tick(1.0 / 60.0, &map);
        }
        assert!(!p.active);
    }

    #[test]
    fn test_lobbed_projectile_ignores_walls() {
        let map = GridMap::walled(10, 10);
        let mut p = Projectile::from_spawn(&spawn(ProjectileKind::Magma, Vec2::new(-60.0, 0.0)));
        for _ in 0..40 {
            p.tick(1.0 / 60.0, &map);
        }
        assert!(p.active);
        assert!(p.position.x < 16.0);
    }

    #[test]
    fn test_projectile_expires() {
        let map = GridMap::walled(100, 100);
        let mut p = Projectile::from_spawn(&spawn(ProjectileKind::Thorn, Vec2::new(1.0, 0.0)));
        p.tick(ProjectileKind::Thorn.lifetime() + 0.1, &map);
        assert!(!p.active);
    }

    #[test]
    fn test_projectile_hits() {
        let p = Projectile::from_spawn(&spawn(ProjectileKind::Thorn, Vec2::ZERO));
        assert!(p.hits(&Aabb::new(36.0, 36.0, 8.0, 8.0)));
        assert!(!p.hits(&Aabb::new(60.0, 60.0, 8.0, 8.0)));
    }

    #[test]
    fn test_hazard_ticks() {
        let mut zone = HazardZone::from_spawn(&HazardSpawn {
            center: Vec2::ZERO,
            radius: 10.0,
            duration: 1.2,
            damage: 1,
            kind: HazardKind::Fire,
        });
        let ticks = (0..80).filter(|_| zone.tick(1.0 / 60.0)).count();
        assert_eq!(ticks, 3);
        assert!(zone.is_expired());
        assert!(!zone.covers(&Aabb::new(-2.0, -2.0, 4.0, 4.0)));
    }
}
