//! Movement and attack patterns of the standard enemy variants.
//!
//! Each [`Behavior`] decides a [`Motion`] per tick and may queue effects.
//! The owning [`Enemy`](crate::enemy::Enemy) handles hit points, knockback
//! and the death timer around it.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::alert::{AlertBehavior, AlertConfig, AlertState};
use crate::context::SimContext;
use crate::effects::{
    FrameEffects, HazardKind, HazardSpawn, ProjectileKind, ProjectileSpawn, Shockwave,
};
use crate::entity::{seek, Entity};
use crate::enemy::{EnemyKind, EnemyStats};
use crate::perception::has_line_of_sight;
use crate::physics::Aabb;

/// Attempts made to find a free teleport destination.
pub const TELEPORT_ATTEMPTS: u32 = 10;

/// Desired movement for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Velocity in pixels per second
    pub velocity: Vec2,
    /// Skip tile collision resolution
    pub through_walls: bool,
}

impl Motion {
    /// Standing still.
    pub const STILL: Self = Self {
        velocity: Vec2::ZERO,
        through_walls: false,
    };

    /// Normal collided movement.
    #[must_use]
    pub const fn walk(velocity: Vec2) -> Self {
        Self {
            velocity,
            through_walls: false,
        }
    }
}

// ============================================================================
// Melee telegraph and lunge
// ============================================================================

/// Stage of a melee strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrikePhase {
    /// Waiting for an opening
    Ready,
    /// Frozen wind-up aimed at a fixed point
    Telegraph {
        /// Time left in the wind-up
        timer: f32,
        /// Point the lunge will head for
        target: Vec2,
    },
    /// Fast dash
    Lunge {
        /// Time left in the dash
        timer: f32,
        /// Dash direction
        direction: Vec2,
    },
    /// Cooling down before the next strike
    Recover {
        /// Time left
        timer: f32,
    },
}

/// Telegraphed lunge layered on top of the alert chase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeleeStrike {
    /// Distance at which a strike is started
    pub strike_range: f32,
    /// Wind-up length
    pub telegraph_duration: f32,
    /// Dash length
    pub lunge_duration: f32,
    /// Dash speed
    pub lunge_speed: f32,
    /// Pause between strikes
    pub cooldown: f32,
    /// Current stage
    pub phase: StrikePhase,
}

impl Default for MeleeStrike {
    fn default() -> Self {
        Self {
            strike_range: 32.0,
            telegraph_duration: 0.4,
            lunge_duration: 0.25,
            lunge_speed: 220.0,
            cooldown: 1.2,
            phase: StrikePhase::Ready,
        }
    }
}

impl MeleeStrike {
    /// Advances a running strike. `None` means the strike is idle and the
    /// chase decides movement.
    fn advance(&mut self, dt: f32, center: Vec2) -> Option<Motion> {
        match self.phase {
            StrikePhase::Ready => None,
            StrikePhase::Recover { timer } => {
                let timer = timer - dt;
                self.phase = if timer <= 0.0 {
                    StrikePhase::Ready
                } else {
                    StrikePhase::Recover { timer }
                };
                None
            },
            StrikePhase::Telegraph { timer, target } => {
                let timer = timer - dt;
                if timer > 0.0 {
                    self.phase = StrikePhase::Telegraph { timer, target };
                    return Some(Motion::STILL);
                }
                let direction = (target - center).try_normalize().unwrap_or(Vec2::X);
                self.phase = StrikePhase::Lunge {
                    timer: self.lunge_duration,
                    direction,
                };
                Some(Motion::walk(direction * self.lunge_speed))
            },
            StrikePhase::Lunge { timer, direction } => {
                let timer = timer - dt;
                self.phase = if timer <= 0.0 {
                    StrikePhase::Recover {
                        timer: self.cooldown,
                    }
                } else {
                    StrikePhase::Lunge { timer, direction }
                };
                Some(Motion::walk(direction * self.lunge_speed))
            },
        }
    }

    /// Whether the wind-up is showing.
    #[must_use]
    pub const fn is_telegraphing(&self) -> bool {
        matches!(self.phase, StrikePhase::Telegraph { .. })
    }

    /// Whether the dash is running.
    #[must_use]
    pub const fn is_lunging(&self) -> bool {
        matches!(self.phase, StrikePhase::Lunge { .. })
    }
}

// ============================================================================
// Behaviors
// ============================================================================

/// Per-variant behavior state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Behavior {
    /// Alert-driven chaser with optional melee strike and fire trail
    Chaser {
        /// Pursuit state machine
        alert: AlertBehavior,
        /// Telegraphed lunge add-on
        strike: Option<MeleeStrike>,
        /// Fire trail cooldown; `None` leaves no trail
        trail_timer: Option<f32>,
    },
    /// Stationary shooter
    Turret {
        /// Time until the next shot may fire
        shoot_timer: f32,
    },
    /// Slow chaser lobbing projectiles over walls
    Lobber {
        /// Time until the next lob
        shoot_timer: f32,
    },
    /// Chaser that periodically blinks near the player
    Teleporter {
        /// Time until the next teleport attempt
        teleport_timer: f32,
    },
    /// Chaser that periodically passes through walls
    Phaser {
        /// Time until the next phase
        cooldown: f32,
        /// Time left phased; zero when solid
        phasing: f32,
    },
    /// Chaser with a radial ground slam
    Slammer {
        /// Time until the next slam
        cooldown: f32,
        /// Time left in the slam window; zero when not slamming
        active: f32,
    },
}

/// Tuning shared by the non-chaser behaviors.
pub mod tuning {
    /// Vine snapper shot range
    pub const TURRET_RANGE: f32 = 140.0;
    /// Vine snapper shot cooldown
    pub const TURRET_COOLDOWN: f32 = 1.6;
    /// Thorn speed
    pub const THORN_SPEED: f32 = 120.0;
    /// Magma golem lob range
    pub const LOB_RANGE: f32 = 170.0;
    /// Magma golem lob cooldown
    pub const LOB_COOLDOWN: f32 = 2.5;
    /// Magma glob speed
    pub const MAGMA_SPEED: f32 = 90.0;
    /// Shadow stalker teleport cooldown
    pub const TELEPORT_COOLDOWN: f32 = 3.5;
    /// Ice wraith time between phases
    pub const PHASE_COOLDOWN: f32 = 4.0;
    /// Ice wraith phase length
    pub const PHASE_DURATION: f32 = 1.5;
    /// Frost golem slam trigger radius
    pub const SLAM_RADIUS: f32 = 36.0;
    /// Frost golem slam cooldown
    pub const SLAM_COOLDOWN: f32 = 3.0;
    /// Frost golem slam window
    pub const SLAM_DURATION: f32 = 0.6;
    /// Fire imp trail cooldown
    pub const TRAIL_COOLDOWN: f32 = 0.4;
    /// Fire imp trail lifetime
    pub const TRAIL_DURATION: f32 = 2.0;
}

impl Behavior {
    /// Builds the behavior matching an enemy kind.
    #[must_use]
    pub fn for_kind(kind: EnemyKind, stats: &EnemyStats) -> Self {
        let alert = || {
            AlertBehavior::new(AlertConfig {
                detection_range: stats.detection_range,
                lose_range: stats.detection_range * 1.7,
                base_speed: stats.speed,
                chase_speed: stats.chase_speed,
                ..AlertConfig::default()
            })
        };
        match kind {
            EnemyKind::Slime | EnemyKind::Skeleton | EnemyKind::Bat => Self::Chaser {
                alert: alert(),
                strike: Some(MeleeStrike::default()),
                trail_timer: None,
            },
            EnemyKind::Scorpion => Self::Chaser {
                alert: alert(),
                strike: None,
                trail_timer: None,
            },
            EnemyKind::FireImp => Self::Chaser {
                alert: alert(),
                strike: None,
                trail_timer: Some(0.0),
            },
            EnemyKind::VineSnapper => Self::Turret { shoot_timer: 0.0 },
            EnemyKind::MagmaGolem => Self::Lobber {
                shoot_timer: tuning::LOB_COOLDOWN * 0.5,
            },
            EnemyKind::ShadowStalker => Self::Teleporter {
                teleport_timer: tuning::TELEPORT_COOLDOWN,
            },
            EnemyKind::IceWraith => Self::Phaser {
                cooldown: tuning::PHASE_COOLDOWN,
                phasing: 0.0,
            },
            EnemyKind::FrostGolem => Self::Slammer {
                cooldown: 0.0,
                active: 0.0,
            },
        }
    }

    /// Alert component, for chasers.
    #[must_use]
    pub fn alert(&self) -> Option<&AlertBehavior> {
        match self {
            Self::Chaser { alert, .. } => Some(alert),
            _ => None,
        }
    }

    /// Mutable alert component, for chasers.
    pub fn alert_mut(&mut self) -> Option<&mut AlertBehavior> {
        match self {
            Self::Chaser { alert, .. } => Some(alert),
            _ => None,
        }
    }

    /// Melee strike add-on, if any.
    #[must_use]
    pub fn strike(&self) -> Option<&MeleeStrike> {
        match self {
            Self::Chaser { strike, .. } => strike.as_ref(),
            _ => None,
        }
    }

    /// Whether a radial slam is in progress.
    #[must_use]
    pub fn is_slamming(&self) -> bool {
        matches!(self, Self::Slammer { active, .. } if *active > 0.0)
    }

    /// Whether the enemy currently walks through walls.
    #[must_use]
    pub fn is_phasing(&self) -> bool {
        matches!(self, Self::Phaser { phasing, .. } if *phasing > 0.0)
    }

    /// Decides this tick's motion.
    pub fn update(
        &mut self,
        dt: f32,
        entity: &mut Entity,
        stats: &EnemyStats,
        ctx: &mut SimContext<'_>,
        effects: &mut FrameEffects,
    ) -> Motion {
        let center = entity.center();
        let player = ctx.player.center;
        let distance = center.distance(player);

        match self {
            Self::Chaser {
                alert,
                strike,
                trail_timer,
            } => {
                if let Some(strike) = strike.as_mut() {
                    if let Some(motion) = strike.advance(dt, center) {
                        return motion;
                    }
                }

                let intent = alert.update(dt, center, player, ctx.map, ctx.budget);

                if let Some(strike) = strike.as_mut() {
                    if alert.state() == AlertState::Alert
                        && strike.phase == StrikePhase::Ready
                        && distance < strike.strike_range
                        && ctx.player.alive
                    {
                        strike.phase = StrikePhase::Telegraph {
                            timer: strike.telegraph_duration,
                            target: player,
                        };
                        return Motion::STILL;
                    }
                }

                let velocity = intent.map_or(Vec2::ZERO, |i| i.velocity_from(center));

                if let Some(timer) = trail_timer.as_mut() {
                    *timer -= dt;
                    if *timer <= 0.0 && velocity != Vec2::ZERO {
                        effects.hazards.push(HazardSpawn {
                            center,
                            radius: 8.0,
                            duration: tuning::TRAIL_DURATION,
                            damage: 1,
                            kind: HazardKind::Fire,
                        });
                        *timer = tuning::TRAIL_COOLDOWN;
                    }
                }

                Motion::walk(velocity)
            },

            Self::Turret { shoot_timer } => {
                *shoot_timer = (*shoot_timer - dt).max(0.0);
                if *shoot_timer <= 0.0
                    && ctx.player.alive
                    && distance <= tuning::TURRET_RANGE
                    && has_line_of_sight(ctx.map, center, player)
                {
                    effects.projectiles.push(ProjectileSpawn::aimed(
                        center,
                        player,
                        tuning::THORN_SPEED,
                        stats.contact_damage,
                        ProjectileKind::Thorn,
                    ));
                    *shoot_timer = tuning::TURRET_COOLDOWN;
                }
                Motion::STILL
            },

            Self::Lobber { shoot_timer } => {
                *shoot_timer = (*shoot_timer - dt).max(0.0);
                if *shoot_timer <= 0.0 && ctx.player.alive && distance <= tuning::LOB_RANGE {
                    effects.projectiles.push(ProjectileSpawn::aimed(
                        center,
                        player,
                        tuning::MAGMA_SPEED,
                        stats.contact_damage,
                        ProjectileKind::Magma,
                    ));
                    *shoot_timer = tuning::LOB_COOLDOWN;
                }
                Motion::walk(direct_chase(center, player, distance, stats))
            },

            Self::Teleporter { teleport_timer } => {
                *teleport_timer -= dt;
                if *teleport_timer <= 0.0 && distance < stats.detection_range {
                    if let Some(dest) = teleport_destination(entity, player, ctx) {
                        entity.set_center(dest);
                    }
                    *teleport_timer = tuning::TELEPORT_COOLDOWN;
                }
                Motion::walk(direct_chase(entity.center(), player, distance, stats))
            },

            Self::Phaser { cooldown, phasing } => {
                if *phasing > 0.0 {
                    *phasing -= dt;
                    // Never rematerialize inside a wall.
                    if *phasing <= 0.0 && ctx.map.rect_hits_solid(&entity.rect()) {
                        *phasing = dt.max(f32::EPSILON);
                    }
                    if *phasing <= 0.0 {
                        *phasing = 0.0;
                        *cooldown = tuning::PHASE_COOLDOWN;
                    }
                } else {
                    *cooldown -= dt;
                    if *cooldown <= 0.0 {
                        *phasing = tuning::PHASE_DURATION;
                    }
                }
                Motion {
                    velocity: direct_chase(center, player, distance, stats),
                    through_walls: *phasing > 0.0,
                }
            },

            Self::Slammer { cooldown, active } => {
                *cooldown = (*cooldown - dt).max(0.0);
                if *active > 0.0 {
                    *active = (*active - dt).max(0.0);
                    return Motion::STILL;
                }
                if *cooldown <= 0.0 && ctx.player.alive && distance <= tuning::SLAM_RADIUS {
                    *active = tuning::SLAM_DURATION;
                    *cooldown = tuning::SLAM_COOLDOWN;
                    effects.shockwaves.push(Shockwave {
                        center,
                        radius: tuning::SLAM_RADIUS * 1.25,
                        damage: stats.contact_damage,
                        knockback: 180.0,
                    });
                    effects.hazards.push(HazardSpawn {
                        center,
                        radius: tuning::SLAM_RADIUS,
                        duration: 2.5,
                        damage: 0,
                        kind: HazardKind::Ice,
                    });
                    return Motion::STILL;
                }
                Motion::walk(direct_chase(center, player, distance, stats))
            },
        }
    }
}

/// Straight-line pursuit inside detection range, standing still outside it.
fn direct_chase(center: Vec2, player: Vec2, distance: f32, stats: &EnemyStats) -> Vec2 {
    if distance < stats.detection_range {
        seek(center, player, stats.chase_speed)
    } else {
        Vec2::ZERO
    }
}

/// Random free spot three to four tiles from the player.
fn teleport_destination(entity: &Entity, player: Vec2, ctx: &mut SimContext<'_>) -> Option<Vec2> {
    let ts = ctx.map.tile_size();
    (0..TELEPORT_ATTEMPTS).find_map(|_| {
        let angle = ctx.rng.f32() * TAU;
        let radius = ts * (3.0 + ctx.rng.f32());
        let dest = player + Vec2::from_angle(angle) * radius;
        let rect = Aabb::from_center(dest, entity.width * 0.5, entity.height * 0.5);
        (!ctx.map.rect_hits_solid(&rect)).then_some(dest)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::PathfindBudget;
    use crate::physics::{GridMap, TileKind, TileMap};
    use crate::player::PlayerView;
    use hollowmere_common::EntityId;

    const DT: f32 = 1.0 / 60.0;

    struct Rig {
        map: GridMap,
        budget: PathfindBudget,
        rng: fastrand::Rng,
        effects: FrameEffects,
    }

    impl Rig {
        fn new(map: GridMap) -> Self {
            Self {
                map,
                budget: PathfindBudget::new(4),
                rng: fastrand::Rng::with_seed(7),
                effects: FrameEffects::new(),
            }
        }

        fn step(
            &mut self,
            behavior: &mut Behavior,
            entity: &mut Entity,
            kind: EnemyKind,
            player: Vec2,
        ) -> Motion {
            let stats = kind.stats();
            self.effects.clear();
            let mut ctx = SimContext::new(
                &self.map,
                PlayerView {
                    center: player,
                    hp: 10,
                    alive: true,
                },
                &mut self.budget,
                &mut self.rng,
            );
            behavior.update(DT, entity, &stats, &mut ctx, &mut self.effects)
        }
    }

    fn body(kind: EnemyKind, center: Vec2) -> Entity {
        let size = kind.stats().size;
        Entity::centered(EntityId::from_raw(9), center, size, size)
    }

    #[test]
    fn test_melee_strike_telegraphs_then_lunges() {
        let kind = EnemyKind::Skeleton;
        let mut rig = Rig::new(GridMap::walled(20, 20));
        let mut behavior = Behavior::for_kind(kind, &kind.stats());
        if let Some(alert) = behavior.alert_mut() {
            alert.provoke(Vec2::new(120.0, 100.0));
        }
        let mut entity = body(kind, Vec2::new(100.0, 100.0));
        let player = Vec2::new(120.0, 100.0);

        let first = rig.step(&mut behavior, &mut entity, kind, player);
        assert_eq!(first, Motion::STILL);
        assert!(behavior.strike().is_some_and(MeleeStrike::is_telegraphing));

        // The wind-up holds still even as the player moves.
        let mut lunged = false;
        for _ in 0..40 {
            let motion = rig.step(&mut behavior, &mut entity, kind, Vec2::new(120.0, 140.0));
            if behavior.strike().is_some_and(MeleeStrike::is_lunging) {
                // Lunge heads for the frozen point, not the new player position
                assert!(motion.velocity.x > 0.0);
                assert!(motion.velocity.y.abs() < 1e-3);
                lunged = true;
                break;
            }
            assert_eq!(motion, Motion::STILL);
        }
        assert!(lunged);
    }

    #[test]
    fn test_scorpion_has_no_strike() {
        let kind = EnemyKind::Scorpion;
        let behavior = Behavior::for_kind(kind, &kind.stats());
        assert!(behavior.strike().is_none());
        assert!(behavior.alert().is_some());
    }

    #[test]
    fn test_turret_fires_with_sight_only() {
        let kind = EnemyKind::VineSnapper;
        let mut map = GridMap::walled(20, 20);
        let mut rig = Rig::new(map.clone());
        let mut behavior = Behavior::for_kind(kind, &kind.stats());
        let mut entity = body(kind, Vec2::new(40.0, 40.0));

        let motion = rig.step(&mut behavior, &mut entity, kind, Vec2::new(120.0, 40.0));
        assert_eq!(motion, Motion::STILL);
        assert_eq!(rig.effects.projectiles.len(), 1);
        assert_eq!(rig.effects.projectiles[0].kind, ProjectileKind::Thorn);
        assert!(rig.effects.projectiles[0].velocity.x > 0.0);

        // Cooldown
        rig.step(&mut behavior, &mut entity, kind, Vec2::new(120.0, 40.0));
        assert!(rig.effects.projectiles.is_empty());

        // Blocked sight
        for row in 0..20 {
            map.set_tile(4, row, TileKind::Wall);
        }
        let mut rig = Rig::new(map);
        let mut behavior = Behavior::for_kind(kind, &kind.stats());
        rig.step(&mut behavior, &mut entity, kind, Vec2::new(120.0, 40.0));
        assert!(rig.effects.projectiles.is_empty());
    }

    #[test]
    fn test_lobber_ignores_walls_when_firing() {
        let kind = EnemyKind::MagmaGolem;
        let mut map = GridMap::walled(20, 20);
        for row in 0..20 {
            map.set_tile(6, row, TileKind::Wall);
        }
        let mut rig = Rig::new(map);
        let mut behavior = Behavior::Lobber { shoot_timer: 0.0 };
        let mut entity = body(kind, Vec2::new(60.0, 60.0));
        rig.step(&mut behavior, &mut entity, kind, Vec2::new(160.0, 60.0));
        assert_eq!(rig.effects.projectiles.len(), 1);
        assert!(rig.effects.projectiles[0].kind.ignores_walls());
    }

    #[test]
    fn test_teleporter_lands_near_player_on_open_floor() {
        let kind = EnemyKind::ShadowStalker;
        let mut rig = Rig::new(GridMap::walled(30, 30));
        let mut behavior = Behavior::Teleporter { teleport_timer: 0.0 };
        let mut entity = body(kind, Vec2::new(160.0, 160.0));
        let player = Vec2::new(240.0, 240.0);
        rig.step(&mut behavior, &mut entity, kind, player);

        let d = entity.center().distance(player);
        assert!((47.9..=64.1).contains(&d), "distance {d}");
        assert!(!rig.map.rect_hits_solid(&entity.rect()));
    }

    #[test]
    fn test_teleporter_gives_up_silently() {
        let kind = EnemyKind::ShadowStalker;
        // Player sealed in a one-tile pocket; every destination is solid.
        let mut map = GridMap::new(30, 30, TileKind::Wall);
        map.set_tile(15, 15, TileKind::Floor);
        map.set_tile(14, 15, TileKind::Floor);
        let mut rig = Rig::new(map);
        let mut behavior = Behavior::Teleporter { teleport_timer: 0.0 };
        let mut entity = body(kind, Vec2::new(232.0, 248.0));
        let before = entity.pos;
        rig.step(&mut behavior, &mut entity, kind, Vec2::new(248.0, 248.0));
        assert_eq!(entity.pos, before);
        assert!(matches!(behavior, Behavior::Teleporter { teleport_timer } if teleport_timer > 0.0));
    }

    #[test]
    fn test_phaser_toggles() {
        let kind = EnemyKind::IceWraith;
        let mut rig = Rig::new(GridMap::walled(20, 20));
        let mut behavior = Behavior::Phaser {
            cooldown: DT * 0.5,
            phasing: 0.0,
        };
        let mut entity = body(kind, Vec2::new(100.0, 100.0));
        let motion = rig.step(&mut behavior, &mut entity, kind, Vec2::new(150.0, 100.0));
        assert!(motion.through_walls);
        assert!(behavior.is_phasing());

        for _ in 0..120 {
            rig.step(&mut behavior, &mut entity, kind, Vec2::new(150.0, 100.0));
        }
        assert!(!behavior.is_phasing());
    }

    #[test]
    fn test_slammer_freezes_and_blasts() {
        let kind = EnemyKind::FrostGolem;
        let mut rig = Rig::new(GridMap::walled(20, 20));
        let mut behavior = Behavior::for_kind(kind, &kind.stats());
        let mut entity = body(kind, Vec2::new(100.0, 100.0));

        let motion = rig.step(&mut behavior, &mut entity, kind, Vec2::new(120.0, 100.0));
        assert_eq!(motion, Motion::STILL);
        assert!(behavior.is_slamming());
        assert_eq!(rig.effects.shockwaves.len(), 1);

        let motion = rig.step(&mut behavior, &mut entity, kind, Vec2::new(120.0, 100.0));
        assert_eq!(motion, Motion::STILL);
        assert!(rig.effects.shockwaves.is_empty());
    }

    #[test]
    fn test_fire_imp_leaves_trail_while_moving() {
        let kind = EnemyKind::FireImp;
        let mut rig = Rig::new(GridMap::walled(30, 30));
        let mut behavior = Behavior::for_kind(kind, &kind.stats());
        if let Some(alert) = behavior.alert_mut() {
            alert.provoke(Vec2::new(200.0, 100.0));
        }
        let mut entity = body(kind, Vec2::new(100.0, 100.0));
        rig.step(&mut behavior, &mut entity, kind, Vec2::new(200.0, 100.0));
        assert_eq!(rig.effects.hazards.len(), 1);
        assert_eq!(rig.effects.hazards[0].kind, HazardKind::Fire);
        rig.step(&mut behavior, &mut entity, kind, Vec2::new(200.0, 100.0));
        assert!(rig.effects.hazards.is_empty());
    }
}
