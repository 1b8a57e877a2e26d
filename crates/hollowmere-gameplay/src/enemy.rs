//! Standard enemies: stat table, hit points and the death lifecycle.

use glam::Vec2;
use hollowmere_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alert::AlertState;
use crate::context::SimContext;
use crate::drops::{roll_loot, DropEntry, DropTable, GoldDrop, Pickup};
use crate::effects::FrameEffects;
use crate::enemy_behavior::{Behavior, Motion};
use crate::entity::Entity;

/// Seconds the death animation plays before removal.
pub const DEATH_DURATION: f32 = 0.5;

/// Seconds an enemy flashes after being hit.
pub const HIT_FLASH_DURATION: f32 = 0.15;

/// Standard enemy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Sluggish melee chaser
    Slime,
    /// Melee chaser
    Skeleton,
    /// Fast flying melee chaser
    Bat,
    /// Stationary thorn turret
    VineSnapper,
    /// Slow tank lobbing magma
    MagmaGolem,
    /// Teleporting chaser
    ShadowStalker,
    /// Wall-phasing chaser
    IceWraith,
    /// Slow chaser with a frost slam
    FrostGolem,
    /// Fast aggressive chaser
    Scorpion,
    /// Fast chaser leaving a fire trail
    FireImp,
}

/// Numbers that tune one enemy kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    /// Hit points
    pub max_hp: i32,
    /// Walking speed
    pub speed: f32,
    /// Pursuit speed
    pub chase_speed: f32,
    /// Damage dealt on touch (and by its projectiles)
    pub contact_damage: i32,
    /// Hitbox edge length
    pub size: f32,
    /// Radius within which the player is noticed
    pub detection_range: f32,
    /// Xp granted on kill
    pub xp: u32,
    /// Gold roll on death
    pub gold: GoldDrop,
}

impl EnemyKind {
    /// Every kind.
    pub const ALL: [EnemyKind; 10] = [
        Self::Slime,
        Self::Skeleton,
        Self::Bat,
        Self::VineSnapper,
        Self::MagmaGolem,
        Self::ShadowStalker,
        Self::IceWraith,
        Self::FrostGolem,
        Self::Scorpion,
        Self::FireImp,
    ];

    /// Stable identifier used by quests and content files.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Slime => "slime",
            Self::Skeleton => "skeleton",
            Self::Bat => "bat",
            Self::VineSnapper => "vine_snapper",
            Self::MagmaGolem => "magma_golem",
            Self::ShadowStalker => "shadow_stalker",
            Self::IceWraith => "ice_wraith",
            Self::FrostGolem => "frost_golem",
            Self::Scorpion => "scorpion",
            Self::FireImp => "fire_imp",
        }
    }

    /// Looks a kind up by identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Stat table entry.
    #[must_use]
    pub fn stats(self) -> EnemyStats {
        let (max_hp, speed, chase_speed, contact_damage, size, detection_range, xp) = match self {
            Self::Slime => (3, 30.0, 45.0, 1, 12.0, 110.0, 3),
            Self::Skeleton => (5, 40.0, 65.0, 2, 12.0, 150.0, 6),
            Self::Bat => (2, 55.0, 90.0, 1, 10.0, 170.0, 4),
            Self::VineSnapper => (6, 0.0, 0.0, 1, 14.0, 140.0, 8),
            Self::MagmaGolem => (14, 20.0, 28.0, 3, 20.0, 200.0, 20),
            Self::ShadowStalker => (8, 50.0, 70.0, 2, 12.0, 180.0, 15),
            Self::IceWraith => (7, 40.0, 55.0, 2, 12.0, 180.0, 14),
            Self::FrostGolem => (16, 22.0, 32.0, 3, 20.0, 160.0, 22),
            Self::Scorpion => (6, 60.0, 100.0, 2, 12.0, 160.0, 10),
            Self::FireImp => (5, 60.0, 95.0, 1, 10.0, 160.0, 10),
        };
        let gold = match self {
            Self::MagmaGolem | Self::FrostGolem => GoldDrop::new(0.9, 5, 12),
            Self::ShadowStalker | Self::IceWraith => GoldDrop::new(0.7, 3, 8),
            _ => GoldDrop::new(0.5, 1, 4),
        };
        EnemyStats {
            max_hp,
            speed,
            chase_speed,
            contact_damage,
            size,
            detection_range,
            xp,
            gold,
        }
    }

    /// Weighted item drops on death.
    #[must_use]
    pub fn drop_table(self) -> DropTable {
        let table = DropTable::new().with_entry(DropEntry::new("heart", 3));
        match self {
            Self::Slime | Self::Bat => table.with_nothing(6),
            Self::Skeleton => table.with_entry(DropEntry::new("bone", 2)).with_nothing(5),
            Self::VineSnapper => table
                .with_entry(DropEntry::new("vine_seed", 2))
                .with_nothing(5),
            Self::MagmaGolem => table
                .with_entry(DropEntry::new("magma_core", 2))
                .with_entry(DropEntry::new("fire_ring", 1))
                .with_nothing(4),
            Self::FrostGolem => table
                .with_entry(DropEntry::new("frost_shard", 2).with_count(1, 3))
                .with_nothing(4),
            Self::ShadowStalker | Self::IceWraith => table
                .with_entry(DropEntry::new("potion", 2))
                .with_nothing(4),
            Self::Scorpion | Self::FireImp => table
                .with_entry(DropEntry::new("potion", 1))
                .with_nothing(5),
        }
    }

    /// Whether knockback moves this enemy.
    #[must_use]
    pub const fn is_stationary(self) -> bool {
        matches!(self, Self::VineSnapper)
    }
}

/// A standard enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    /// Physical body
    pub entity: Entity,
    kind: EnemyKind,
    stats: EnemyStats,
    hp: i32,
    flash_timer: f32,
    dying: bool,
    death_timer: f32,
    behavior: Behavior,
    effects: FrameEffects,
}

impl Enemy {
    /// Spawns an enemy centered on `center`.
    #[must_use]
    pub fn new(id: EntityId, kind: EnemyKind, center: Vec2) -> Self {
        let stats = kind.stats();
        Self {
            entity: Entity::centered(id, center, stats.size, stats.size),
            kind,
            stats,
            hp: stats.max_hp,
            flash_timer: 0.0,
            dying: false,
            death_timer: 0.0,
            behavior: Behavior::for_kind(kind, &stats),
            effects: FrameEffects::new(),
        }
    }

    /// Variant.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Stat table entry in use.
    #[must_use]
    pub const fn stats(&self) -> &EnemyStats {
        &self.stats
    }

    /// Current hit points.
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Whether the death animation is playing.
    #[must_use]
    pub const fn is_dying(&self) -> bool {
        self.dying
    }

    /// Whether the enemy may hurt or be hurt.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.entity.alive && !self.dying
    }

    /// Whether the hit flash is showing.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        self.flash_timer > 0.0
    }

    /// Alert state, for chasing kinds.
    #[must_use]
    pub fn alert_state(&self) -> Option<AlertState> {
        self.behavior.alert().map(crate::alert::AlertBehavior::state)
    }

    /// Behavior state, for renderers.
    #[must_use]
    pub const fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Effects requested during the last update.
    #[must_use]
    pub const fn effects(&self) -> &FrameEffects {
        &self.effects
    }

    /// Applies the flank offset from the world's alert roster.
    pub fn set_group_offset(&mut self, offset: Vec2) {
        if let Some(alert) = self.behavior.alert_mut() {
            alert.set_group_offset(offset);
        }
    }

    /// Applies damage; always lands unless the enemy is already dying.
    ///
    /// A `source` point knocks the enemy back (stationary kinds excepted) and
    /// provokes chasers into Alert.
    pub fn take_damage(&mut self, amount: i32, source: Option<Vec2>, knockback: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.hp -= amount.max(0);
        self.flash_timer = HIT_FLASH_DURATION;

        if self.hp <= 0 {
            self.hp = 0;
            self.dying = true;
            self.death_timer = DEATH_DURATION;
            self.entity.vel = Vec2::ZERO;
            self.entity.knockback = Vec2::ZERO;
            self.entity.knockback_timer = 0.0;
            debug!("{} {} dying", self.kind.id(), self.entity.id);
            return true;
        }

        if let Some(source) = source {
            if !self.kind.is_stationary() {
                self.entity.apply_knockback(source, knockback);
            }
            if let Some(alert) = self.behavior.alert_mut() {
                alert.provoke(source);
            }
        }
        true
    }

    /// Advances one tick.
    pub fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        self.effects.clear();
        self.flash_timer = (self.flash_timer - dt).max(0.0);

        if !self.entity.alive {
            return;
        }
        if self.dying {
            self.death_timer -= dt;
            if self.death_timer <= 0.0 {
                self.entity.alive = false;
            }
            return;
        }

        if self.entity.is_knocked_back() {
            let knockback = self.entity.knockback;
            self.entity.move_and_collide(knockback, dt, ctx.map);
            self.entity.update_knockback(dt);
            return;
        }

        let motion = self
            .behavior
            .update(dt, &mut self.entity, &self.stats, ctx, &mut self.effects);
        self.apply_motion(motion, dt, ctx);
    }

    fn apply_motion(&mut self, motion: Motion, dt: f32, ctx: &SimContext<'_>) {
        self.entity.vel = motion.velocity;
        self.entity.face_towards(motion.velocity);
        if motion.through_walls {
            self.entity.move_free(motion.velocity, dt);
        } else {
            self.entity.move_and_collide(motion.velocity, dt, ctx.map);
        }
    }

    /// Rolls loot at the enemy's position.
    pub fn roll_loot(&self, rng: &mut fastrand::Rng) -> Vec<Pickup> {
        roll_loot(
            &self.kind.drop_table(),
            &self.stats.gold,
            self.entity.center(),
            rng,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::PathfindBudget;
    use crate::physics::GridMap;
    use crate::player::PlayerView;

    const DT: f32 = 1.0 / 60.0;

    fn tick(enemy: &mut Enemy, map: &GridMap, player: Vec2, rng: &mut fastrand::Rng) {
        let mut budget = PathfindBudget::new(4);
        let mut ctx = SimContext::new(
            map,
            PlayerView {
                center: player,
                hp: 10,
                alive: true,
            },
            &mut budget,
            rng,
        );
        enemy.update(DT, &mut ctx);
    }

    #[test]
    fn test_ids_round_trip() {
        for kind in EnemyKind::ALL {
            assert_eq!(EnemyKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(EnemyKind::from_id("dragon"), None);
    }

    #[test]
    fn test_take_damage_and_death_timer() {
        let map = GridMap::walled(20, 20);
        let mut rng = fastrand::Rng::with_seed(1);
        let mut enemy = Enemy::new(EntityId::from_raw(1), EnemyKind::Slime, Vec2::new(100.0, 100.0));

        assert!(enemy.take_damage(1, Some(Vec2::new(90.0, 100.0)), 100.0));
        assert!(enemy.is_flashing());
        assert_eq!(enemy.alert_state(), Some(AlertState::Alert));
        assert!(enemy.take_damage(5, None, 0.0));
        assert!(enemy.is_dying());
        assert!(!enemy.take_damage(1, None, 0.0));

        let pos = enemy.entity.pos;
        for _ in 0..20 {
            tick(&mut enemy, &map, Vec2::new(110.0, 100.0), &mut rng);
        }
        assert!(enemy.entity.alive);
        assert_eq!(enemy.entity.pos, pos);

        for _ in 0..20 {
            tick(&mut enemy, &map, Vec2::new(110.0, 100.0), &mut rng);
        }
        assert!(!enemy.entity.alive);
    }

    #[test]
    fn test_knockback_overrides_ai() {
        let map = GridMap::walled(20, 20);
        let mut rng = fastrand::Rng::with_seed(1);
        let mut enemy =
            Enemy::new(EntityId::from_raw(1), EnemyKind::Skeleton, Vec2::new(100.0, 100.0));
        enemy.take_damage(1, Some(Vec2::new(80.0, 100.0)), 200.0);

        // Player is to the left, knockback pushes right.
        let before = enemy.entity.center().x;
        tick(&mut enemy, &map, Vec2::new(80.0, 100.0), &mut rng);
        assert!(enemy.entity.center().x > before);
    }

    #[test]
    fn test_stationary_ignores_knockback() {
        let mut enemy = Enemy::new(
            EntityId::from_raw(1),
            EnemyKind::VineSnapper,
            Vec2::new(100.0, 100.0),
        );
        enemy.take_damage(1, Some(Vec2::new(80.0, 100.0)), 200.0);
        assert!(!enemy.entity.is_knocked_back());
    }

    #[test]
    fn test_effects_cleared_each_tick() {
        let map = GridMap::walled(20, 20);
        let mut rng = fastrand::Rng::with_seed(1);
        let mut enemy = Enemy::new(
            EntityId::from_raw(1),
            EnemyKind::VineSnapper,
            Vec2::new(40.0, 40.0),
        );
        tick(&mut enemy, &map, Vec2::new(120.0, 40.0), &mut rng);
        assert_eq!(enemy.effects().projectiles.len(), 1);
        tick(&mut enemy, &map, Vec2::new(120.0, 40.0), &mut rng);
        assert!(enemy.effects().is_empty());
    }

    #[test]
    fn test_chaser_walks_towards_player() {
        let map = GridMap::walled(30, 30);
        let mut rng = fastrand::Rng::with_seed(1);
        let mut enemy = Enemy::new(EntityId::from_raw(1), EnemyKind::Scorpion, Vec2::new(100.0, 100.0));
        let player = Vec2::new(200.0, 100.0);
        for _ in 0..60 {
            tick(&mut enemy, &map, player, &mut rng);
        }
        assert_eq!(enemy.alert_state(), Some(AlertState::Alert));
        assert!(enemy.entity.center().x > 110.0);
    }

    #[test]
    fn test_loot_is_deterministic() {
        let enemy = Enemy::new(
            EntityId::from_raw(1),
            EnemyKind::MagmaGolem,
            Vec2::new(100.0, 100.0),
        );
        let a = enemy.roll_loot(&mut fastrand::Rng::with_seed(3));
        let b = enemy.roll_loot(&mut fastrand::Rng::with_seed(3));
        assert_eq!(a, b);
    }
}
