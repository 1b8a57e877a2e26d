//! Phased boss runtime.
//!
//! All five bosses share one state machine. What differs is a
//! [`BossProfile`]: stats, the HP fraction that flips phase 2, and a
//! priority-ordered attack table. Each tick the runtime
//!
//! 1. ratchets the phase once HP crosses the threshold (it never goes back),
//! 2. fires secondary attacks (summons, meteor rain) whose cooldown elapsed,
//!    even mid-attack or while knocked back,
//! 3. advances the single exclusive attack in progress, if any,
//! 4. otherwise starts the first exclusive attack whose trigger matches,
//! 5. otherwise chases.
//!
//! The Sand Worm's surface/burrowed cycle is its burrow attack: the cooldown
//! is the surface time and the active stage is the burrowed time.

use glam::Vec2;
use hollowmere_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::SimContext;
use crate::drops::{ItemDrop, Pickup, PickupKind};
use crate::effects::{
    DamageZone, FrameEffects, HazardKind, HazardSpawn, ProjectileKind, ProjectileSpawn,
    Shockwave, SummonRequest,
};
use crate::enemy::EnemyKind;
use crate::entity::{seek, Entity};
use crate::physics::{random_open_position, Aabb};
use crate::player::StatusEffect;

/// Seconds the boss death sequence plays before removal.
pub const BOSS_DEATH_DURATION: f32 = 1.5;

/// Knockback duration for bosses.
pub const BOSS_KNOCKBACK_DURATION: f32 = 0.1;

/// Boss identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossKind {
    /// Castle boss
    DarkLord,
    /// Shadow realm boss
    ShadowKing,
    /// Forest temple boss
    ForestGuardian,
    /// Desert boss that burrows
    SandWorm,
    /// Volcano boss
    InfernoDrake,
}

impl BossKind {
    /// Every boss.
    pub const ALL: [BossKind; 5] = [
        Self::DarkLord,
        Self::ShadowKing,
        Self::ForestGuardian,
        Self::SandWorm,
        Self::InfernoDrake,
    ];

    /// Stable identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::DarkLord => "dark_lord",
            Self::ShadowKing => "shadow_king",
            Self::ForestGuardian => "forest_guardian",
            Self::SandWorm => "sand_worm",
            Self::InfernoDrake => "inferno_drake",
        }
    }

    /// Looks a boss up by identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Declarative tuning and attack table.
    #[must_use]
    pub fn profile(self) -> BossProfile {
        match self {
            Self::DarkLord => BossProfile {
                name: "Dark Lord".into(),
                max_hp: 60,
                speed: [40.0, 55.0],
                size: 28.0,
                contact_damage: 2,
                phase_threshold: 0.5,
                knockback_scale: 0.3,
                aggro_range: 220.0,
                xp: 100,
                reward: ItemDrop {
                    item_id: "dark_crystal".into(),
                    count: 1,
                },
                gold: 50,
                attacks: vec![
                    AttackSpec::new(AttackKind::Slam, 2, AttackTrigger::Within(48.0))
                        .with_cooldown(0.0, 3.0)
                        .with_windup(0.5)
                        .with_damage(3)
                        .with_radius(56.0),
                    AttackSpec::new(AttackKind::Charge, 2, AttackTrigger::Between(60.0, 200.0))
                        .with_cooldown(0.0, 4.0)
                        .with_windup(0.6)
                        .with_duration(0.0, 0.6)
                        .with_speed(240.0)
                        .with_damage(3),
                    AttackSpec::new(AttackKind::Barrage, 2, AttackTrigger::Beyond(120.0))
                        .with_cooldown(0.0, 3.5)
                        .with_count(5)
                        .with_speed(110.0)
                        .with_damage(2),
                    AttackSpec::new(AttackKind::Summon, 2, AttackTrigger::Always)
                        .secondary()
                        .with_cooldown(0.0, 8.0)
                        .with_count(2)
                        .with_summon(EnemyKind::Skeleton),
                ],
            },
            Self::ShadowKing => BossProfile {
                name: "Shadow King".into(),
                max_hp: 80,
                speed: [45.0, 60.0],
                size: 28.0,
                contact_damage: 3,
                phase_threshold: 0.5,
                knockback_scale: 0.25,
                aggro_range: 240.0,
                xp: 150,
                reward: ItemDrop {
                    item_id: "shadow_crown".into(),
                    count: 1,
                },
                gold: 80,
                attacks: vec![
                    AttackSpec::new(AttackKind::Slam, 2, AttackTrigger::Within(52.0))
                        .with_cooldown(0.0, 2.5)
                        .with_windup(0.4)
                        .with_damage(3)
                        .with_radius(64.0),
                    AttackSpec::new(AttackKind::Charge, 2, AttackTrigger::Between(60.0, 220.0))
                        .with_cooldown(0.0, 3.5)
                        .with_windup(0.5)
                        .with_duration(0.0, 0.7)
                        .with_speed(260.0)
                        .with_damage(3),
                    AttackSpec::new(AttackKind::Barrage, 2, AttackTrigger::Beyond(110.0))
                        .with_cooldown(0.0, 3.0)
                        .with_count(7)
                        .with_speed(120.0)
                        .with_damage(2),
                    AttackSpec::new(AttackKind::Summon, 2, AttackTrigger::Always)
                        .secondary()
                        .with_cooldown(0.0, 9.0)
                        .with_count(2)
                        .with_summon(EnemyKind::ShadowStalker),
                ],
            },
            Self::ForestGuardian => BossProfile {
                name: "Forest Guardian".into(),
                max_hp: 70,
                speed: [30.0, 40.0],
                size: 32.0,
                contact_damage: 2,
                phase_threshold: 0.6,
                knockback_scale: 0.2,
                aggro_range: 200.0,
                xp: 120,
                reward: ItemDrop {
                    item_id: "forest_heart".into(),
                    count: 1,
                },
                gold: 60,
                attacks: vec![
                    AttackSpec::new(AttackKind::RootSlam, 1, AttackTrigger::Within(140.0))
                        .with_cooldown(4.0, 2.5)
                        .with_windup(0.8)
                        .with_damage(2)
                        .with_radius(72.0),
                    AttackSpec::new(AttackKind::Summon, 2, AttackTrigger::Always)
                        .secondary()
                        .with_cooldown(0.0, 7.0)
                        .with_count(1)
                        .with_summon(EnemyKind::VineSnapper),
                ],
            },
            Self::SandWorm => BossProfile {
                name: "Sand Worm".into(),
                max_hp: 60,
                speed: [50.0, 65.0],
                size: 28.0,
                contact_damage: 2,
                phase_threshold: 0.5,
                knockback_scale: 0.3,
                aggro_range: 220.0,
                xp: 120,
                reward: ItemDrop {
                    item_id: "sand_fang".into(),
                    count: 1,
                },
                gold: 60,
                attacks: vec![AttackSpec::new(AttackKind::Burrow, 1, AttackTrigger::Always)
                    .with_cooldown(4.0, 2.5)
                    .with_duration(2.0, 1.4)
                    .with_damage(3)
                    .with_radius(56.0)],
            },
            Self::InfernoDrake => BossProfile {
                name: "Inferno Drake".into(),
                max_hp: 90,
                speed: [40.0, 50.0],
                size: 32.0,
                contact_damage: 3,
                phase_threshold: 0.55,
                knockback_scale: 0.2,
                aggro_range: 240.0,
                xp: 180,
                reward: ItemDrop {
                    item_id: "drake_scale".into(),
                    count: 1,
                },
                gold: 100,
                attacks: vec![
                    AttackSpec::new(AttackKind::FireBreath, 1, AttackTrigger::Within(110.0))
                        .with_cooldown(3.5, 2.5)
                        .with_windup(0.3)
                        .with_duration(1.0, 1.2)
                        .with_damage(1)
                        .with_radius(72.0),
                    AttackSpec::new(AttackKind::MeteorRain, 2, AttackTrigger::Always)
                        .secondary()
                        .with_cooldown(0.0, 5.0)
                        .with_windup(1.2)
                        .with_count(5)
                        .with_damage(2)
                        .with_radius(14.0),
                ],
            },
        }
    }
}

// ============================================================================
// Attack table
// ============================================================================

/// Attack patterns the runtime knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    /// Wind-up then radial blast around the boss
    Slam,
    /// Telegraphed dash at a frozen target point
    Charge,
    /// Fan of projectiles
    Barrage,
    /// Spawn minions
    Summon,
    /// Long wind-up radial blast
    RootSlam,
    /// Invulnerable underground relocation
    Burrow,
    /// Directional fire cone in front of the boss
    FireBreath,
    /// Delayed meteors on random open tiles
    MeteorRain,
}

/// Distance condition under which an attack may start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackTrigger {
    /// Any distance
    Always,
    /// Player closer than this
    Within(f32),
    /// Player inside [min, max)
    Between(f32, f32),
    /// Player at least this far
    Beyond(f32),
}

impl AttackTrigger {
    /// Whether the player distance satisfies the trigger.
    #[must_use]
    pub fn matches(self, distance: f32) -> bool {
        match self {
            Self::Always => true,
            Self::Within(max) => distance < max,
            Self::Between(min, max) => distance >= min && distance < max,
            Self::Beyond(min) => distance >= min,
        }
    }
}

/// One row of a boss attack table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackSpec {
    /// Pattern
    pub kind: AttackKind,
    /// First phase in which the attack is used
    pub min_phase: u8,
    /// Distance condition
    pub trigger: AttackTrigger,
    /// Exclusive attacks occupy the boss; secondary ones fire alongside movement
    pub exclusive: bool,
    /// Cooldown per phase
    pub cooldown: [f32; 2],
    /// Telegraph or fuse time
    pub windup: f32,
    /// Active time per phase
    pub duration: [f32; 2],
    /// Damage per hit
    pub damage: i32,
    /// Blast radius or breath length
    pub radius: f32,
    /// Projectiles, minions or meteors per use
    pub count: u32,
    /// Dash or projectile speed
    pub speed: f32,
    /// Minion kind for summons
    pub summon: Option<EnemyKind>,
}

impl AttackSpec {
    /// Creates an exclusive attack with neutral numbers.
    #[must_use]
    pub fn new(kind: AttackKind, min_phase: u8, trigger: AttackTrigger) -> Self {
        Self {
            kind,
            min_phase,
            trigger,
            exclusive: true,
            cooldown: [3.0, 3.0],
            windup: 0.0,
            duration: [0.0, 0.0],
            damage: 1,
            radius: 0.0,
            count: 1,
            speed: 0.0,
            summon: None,
        }
    }

    /// Marks the attack as secondary (non-exclusive).
    #[must_use]
    pub fn secondary(mut self) -> Self {
        self.exclusive = false;
        self
    }

    /// Sets phase 1 and phase 2 cooldowns.
    #[must_use]
    pub fn with_cooldown(mut self, phase1: f32, phase2: f32) -> Self {
        self.cooldown = [phase1, phase2];
        self
    }

    /// Sets the telegraph or fuse time.
    #[must_use]
    pub fn with_windup(mut self, windup: f32) -> Self {
        self.windup = windup;
        self
    }

    /// Sets phase 1 and phase 2 active time.
    #[must_use]
    pub fn with_duration(mut self, phase1: f32, phase2: f32) -> Self {
        self.duration = [phase1, phase2];
        self
    }

    /// Sets damage.
    #[must_use]
    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    /// Sets radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Sets speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the summoned enemy kind.
    #[must_use]
    pub fn with_summon(mut self, kind: EnemyKind) -> Self {
        self.summon = Some(kind);
        self
    }

    fn cooldown_for(&self, phase: u8) -> f32 {
        self.cooldown[phase_index(phase)]
    }

    fn duration_for(&self, phase: u8) -> f32 {
        self.duration[phase_index(phase)]
    }
}

fn phase_index(phase: u8) -> usize {
    usize::from(phase.clamp(1, 2) - 1)
}

/// Complete tuning of a boss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossProfile {
    /// Display name
    pub name: String,
    /// Hit points
    pub max_hp: i32,
    /// Chase speed per phase
    pub speed: [f32; 2],
    /// Hitbox edge length
    pub size: f32,
    /// Damage on touch
    pub contact_damage: i32,
    /// HP fraction at or below which phase 2 begins
    pub phase_threshold: f32,
    /// Multiplier applied to incoming knockback
    pub knockback_scale: f32,
    /// Distance at which the fight begins
    pub aggro_range: f32,
    /// Xp granted on kill
    pub xp: u32,
    /// Guaranteed item reward
    pub reward: ItemDrop,
    /// Guaranteed gold reward
    pub gold: u32,
    /// Attacks in priority order
    pub attacks: Vec<AttackSpec>,
}

// ============================================================================
// Runtime
// ============================================================================

/// Stage of the exclusive attack in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackStage {
    /// Telegraph, frozen in place
    WindUp,
    /// Executing
    Active,
}

/// The exclusive attack currently occupying a boss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveAttack {
    /// Pattern
    pub kind: AttackKind,
    /// Row in the attack table
    pub index: usize,
    /// Current stage
    pub stage: AttackStage,
    /// Time left in the stage
    pub timer: f32,
    /// Frozen target point (wind-up) or direction (active)
    pub aim: Vec2,
}

/// A meteor waiting for its fuse to burn down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingMeteor {
    /// Impact point
    pub target: Vec2,
    /// Time to impact
    pub fuse: f32,
    /// Damage on impact
    pub damage: i32,
    /// Impact radius
    pub radius: f32,
}

/// A boss instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    /// Physical body
    pub entity: Entity,
    kind: BossKind,
    profile: BossProfile,
    hp: i32,
    phase: u8,
    cooldowns: Vec<f32>,
    active: Option<ActiveAttack>,
    meteors: Vec<PendingMeteor>,
    engaged: bool,
    just_engaged: bool,
    flash_timer: f32,
    dying: bool,
    death_timer: f32,
    effects: FrameEffects,
}

impl Boss {
    /// Spawns a boss centered on `center` using its built-in profile.
    #[must_use]
    pub fn new(id: EntityId, kind: BossKind, center: Vec2) -> Self {
        Self::with_profile(id, kind, center, kind.profile())
    }

    /// Spawns a boss with a custom profile.
    #[must_use]
    pub fn with_profile(id: EntityId, kind: BossKind, center: Vec2, profile: BossProfile) -> Self {
        let cooldowns = profile
            .attacks
            .iter()
            .map(|a| a.cooldown_for(1) * 0.5)
            .collect();
        Self {
            entity: Entity::centered(id, center, profile.size, profile.size)
                .with_knockback_duration(BOSS_KNOCKBACK_DURATION),
            kind,
            hp: profile.max_hp,
            profile,
            phase: 1,
            cooldowns,
            active: None,
            meteors: Vec::new(),
            engaged: false,
            just_engaged: false,
            flash_timer: 0.0,
            dying: false,
            death_timer: 0.0,
            effects: FrameEffects::new(),
        }
    }

    /// Identity.
    #[must_use]
    pub const fn kind(&self) -> BossKind {
        self.kind
    }

    /// Tuning in use.
    #[must_use]
    pub const fn profile(&self) -> &BossProfile {
        &self.profile
    }

    /// Current hit points.
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max_hp(&self) -> i32 {
        self.profile.max_hp
    }

    /// 1 or 2.
    #[must_use]
    pub const fn phase(&self) -> u8 {
        self.phase
    }

    /// Exclusive attack in progress.
    #[must_use]
    pub const fn active_attack(&self) -> Option<&ActiveAttack> {
        self.active.as_ref()
    }

    /// Meteors in flight.
    #[must_use]
    pub fn pending_meteors(&self) -> &[PendingMeteor] {
        &self.meteors
    }

    /// Effects requested during the last update.
    #[must_use]
    pub const fn effects(&self) -> &FrameEffects {
        &self.effects
    }

    /// Whether the fight has begun.
    #[must_use]
    pub const fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Whether the fight began during the last update.
    #[must_use]
    pub const fn just_engaged(&self) -> bool {
        self.just_engaged
    }

    /// Whether the death sequence is playing.
    #[must_use]
    pub const fn is_dying(&self) -> bool {
        self.dying
    }

    /// Whether the boss can deal or take contact damage.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.entity.alive && !self.dying && !self.is_invulnerable()
    }

    /// Whether the hit flash is showing.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        self.flash_timer > 0.0
    }

    /// Whether incoming damage is currently rejected.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        matches!(
            self.active,
            Some(ActiveAttack {
                kind: AttackKind::Burrow,
                stage: AttackStage::Active,
                ..
            })
        )
    }

    /// Short state label for renderers and sound hooks.
    ///
    /// The Sand Worm reports `"surface"` or `"burrowed"`.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        if self.dying {
            return "dying";
        }
        if self.kind == BossKind::SandWorm {
            return if self.is_invulnerable() {
                "burrowed"
            } else {
                "surface"
            };
        }
        match self.active {
            None => {
                if self.engaged {
                    "chase"
                } else {
                    "idle"
                }
            },
            Some(attack) => match (attack.kind, attack.stage) {
                (AttackKind::Charge, AttackStage::WindUp) => "telegraphing",
                (AttackKind::Charge, AttackStage::Active) => "charging",
                (AttackKind::Slam | AttackKind::RootSlam, _) => "slamming",
                (AttackKind::FireBreath, _) => "breathing_fire",
                (AttackKind::Burrow, _) => "burrowed",
                (AttackKind::Barrage | AttackKind::Summon | AttackKind::MeteorRain, _) => "chase",
            },
        }
    }

    /// Applies damage.
    ///
    /// Returns `false` when the hit is rejected: burrowed, dying or dead.
    /// Knockback is scaled down by the profile.
    pub fn take_damage(&mut self, amount: i32, source: Option<Vec2>, knockback: f32) -> bool {
        if !self.entity.alive || self.dying || self.is_invulnerable() {
            return false;
        }
        self.hp = (self.hp - amount.max(0)).max(0);
        self.flash_timer = 0.15;
        self.engaged = true;

        if self.hp == 0 {
            self.dying = true;
            self.death_timer = BOSS_DEATH_DURATION;
            self.active = None;
            self.meteors.clear();
            self.entity.vel = Vec2::ZERO;
            self.entity.knockback = Vec2::ZERO;
            self.entity.knockback_timer = 0.0;
            info!("{} defeated", self.profile.name);
            return true;
        }

        self.update_phase();
        if let Some(source) = source {
            self.entity
                .apply_knockback(source, knockback * self.profile.knockback_scale);
        }
        true
    }

    /// Restores hit points. The phase does not revert.
    pub fn heal(&mut self, amount: i32) {
        if !self.dying {
            self.hp = (self.hp + amount.max(0)).min(self.profile.max_hp);
        }
    }

    fn update_phase(&mut self) {
        if self.phase == 1
            && self.hp as f32 <= self.profile.max_hp as f32 * self.profile.phase_threshold
        {
            self.phase = 2;
            info!("{} enters phase 2", self.profile.name);
        }
    }

    /// Guaranteed reward dropped on death.
    #[must_use]
    pub fn reward_loot(&self) -> Vec<Pickup> {
        let center = self.entity.center();
        let mut loot = vec![Pickup::new(
            center,
            PickupKind::Item(self.profile.reward.clone()),
        )];
        if self.profile.gold > 0 {
            loot.push(Pickup::new(
                center + Vec2::new(10.0, 0.0),
                PickupKind::Gold(self.profile.gold),
            ));
        }
        loot
    }

    /// Advances one tick.
    pub fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>) {
        self.effects.clear();
        self.just_engaged = false;
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

        self.update_meteors(dt);

        let center = self.entity.center();
        let player = ctx.player.center;
        let distance = center.distance(player);

        if !self.engaged {
            if ctx.player.alive && distance <= self.profile.aggro_range {
                self.engaged = true;
                self.just_engaged = true;
                info!("{} fight started", self.profile.name);
            } else {
                return;
            }
        }

        self.update_phase();

        for cooldown in &mut self.cooldowns {
            *cooldown = (*cooldown - dt).max(0.0);
        }
        if ctx.player.alive {
            self.fire_secondary(ctx, distance);
        }

        if self.entity.is_knocked_back() && self.active.is_none() {
            let knockback = self.entity.knockback;
            self.entity.move_and_collide(knockback, dt, ctx.map);
            self.entity.update_knockback(dt);
            return;
        }
        self.entity.update_knockback(dt);

        if self.active.is_some() {
            let velocity = self.advance_attack(dt);
            self.move_by(velocity, dt, ctx);
            return;
        }

        if ctx.player.alive && self.start_primary(ctx, distance) {
            return;
        }

        let velocity = if ctx.player.alive {
            seek(center, player, self.profile.speed[phase_index(self.phase)])
        } else {
            Vec2::ZERO
        };
        self.move_by(velocity, dt, ctx);
    }

    fn move_by(&mut self, velocity: Vec2, dt: f32, ctx: &SimContext<'_>) {
        self.entity.vel = velocity;
        self.entity.face_towards(velocity);
        self.entity.move_and_collide(velocity, dt, ctx.map);
    }

    fn is_available(&self, index: usize, spec: &AttackSpec, distance: f32) -> bool {
        self.phase >= spec.min_phase
            && self.cooldowns.get(index).is_some_and(|c| *c <= 0.0)
            && spec.trigger.matches(distance)
    }

    fn fire_secondary(&mut self, ctx: &mut SimContext<'_>, distance: f32) {
        for index in 0..self.profile.attacks.len() {
            let spec = self.profile.attacks[index];
            if spec.exclusive || !self.is_available(index, &spec, distance) {
                continue;
            }
            self.execute_instant(&spec, ctx);
            self.cooldowns[index] = spec.cooldown_for(self.phase);
        }
    }

    /// Starts the first matching exclusive attack. Returns whether one ran.
    fn start_primary(&mut self, ctx: &mut SimContext<'_>, distance: f32) -> bool {
        let Some(index) = self
            .profile
            .attacks
            .iter()
            .enumerate()
            .position(|(i, spec)| spec.exclusive && self.is_available(i, spec, distance))
        else {
            return false;
        };
        let spec = self.profile.attacks[index];
        let center = self.entity.center();
        let player = ctx.player.center;
        debug!("{} starts {:?}", self.profile.name, spec.kind);

        match spec.kind {
            AttackKind::Barrage | AttackKind::Summon | AttackKind::MeteorRain => {
                self.execute_instant(&spec, ctx);
                self.cooldowns[index] = spec.cooldown_for(self.phase);
                self.entity.vel = Vec2::ZERO;
            },
            AttackKind::Slam | AttackKind::RootSlam | AttackKind::Charge => {
                self.active = Some(ActiveAttack {
                    kind: spec.kind,
                    index,
                    stage: AttackStage::WindUp,
                    timer: spec.windup,
                    aim: player,
                });
                self.entity.vel = Vec2::ZERO;
            },
            AttackKind::FireBreath => {
                let direction = (player - center).try_normalize().unwrap_or(Vec2::X);
                self.entity.face_towards(direction);
                self.active = Some(ActiveAttack {
                    kind: spec.kind,
                    index,
                    stage: AttackStage::WindUp,
                    timer: spec.windup,
                    aim: self.entity.facing.to_vec2(),
                });
                self.entity.vel = Vec2::ZERO;
            },
            AttackKind::Burrow => {
                self.burrow(&spec, ctx);
                self.active = Some(ActiveAttack {
                    kind: spec.kind,
                    index,
                    stage: AttackStage::Active,
                    timer: spec.duration_for(self.phase),
                    aim: Vec2::ZERO,
                });
            },
        }
        true
    }

    /// Advances the exclusive attack and returns the velocity for this tick.
    fn advance_attack(&mut self, dt: f32) -> Vec2 {
        let Some(mut attack) = self.active else {
            return Vec2::ZERO;
        };
        let Some(spec) = self.profile.attacks.get(attack.index).copied() else {
            self.active = None;
            return Vec2::ZERO;
        };
        let center = self.entity.center();
        attack.timer -= dt;
        let expired = attack.timer <= 0.0;

        let mut velocity = Vec2::ZERO;
        let mut finished = false;
        match (attack.kind, attack.stage) {
            (AttackKind::Slam | AttackKind::RootSlam, _) => {
                if expired {
                    self.effects.shockwaves.push(Shockwave {
                        center,
                        radius: spec.radius,
                        damage: spec.damage,
                        knockback: 200.0,
                    });
                    finished = true;
                }
            },
            (AttackKind::Charge, AttackStage::WindUp) => {
                if expired {
                    attack.stage = AttackStage::Active;
                    attack.timer = spec.duration_for(self.phase);
                    attack.aim = (attack.aim - center).try_normalize().unwrap_or(Vec2::X);
                    velocity = attack.aim * spec.speed;
                }
            },
            (AttackKind::Charge, AttackStage::Active) => {
                velocity = attack.aim * spec.speed;
                finished = expired;
            },
            (AttackKind::FireBreath, AttackStage::WindUp) => {
                if expired {
                    attack.stage = AttackStage::Active;
                    attack.timer = spec.duration_for(self.phase);
                }
            },
            (AttackKind::FireBreath, AttackStage::Active) => {
                self.effects.damage_zones.push(DamageZone {
                    rect: breath_zone(center, attack.aim, spec.radius, self.profile.size),
                    damage: spec.damage,
                    status: Some(StatusEffect::Burning),
                });
                finished = expired;
            },
            (AttackKind::Burrow, _) => {
                if expired {
                    self.emerge(&spec);
                    finished = true;
                }
            },
            (AttackKind::Barrage | AttackKind::Summon | AttackKind::MeteorRain, _) => {
                finished = true;
            },
        }

        if finished {
            self.active = None;
            if let Some(cooldown) = self.cooldowns.get_mut(attack.index) {
                *cooldown = spec.cooldown_for(self.phase);
            }
        } else {
            self.active = Some(attack);
        }
        velocity
    }

    fn execute_instant(&mut self, spec: &AttackSpec, ctx: &mut SimContext<'_>) {
        let center = self.entity.center();
        let player = ctx.player.center;
        match spec.kind {
            AttackKind::Barrage => {
                let kind = if self.kind == BossKind::ShadowKing {
                    ProjectileKind::ShadowBolt
                } else {
                    ProjectileKind::Fireball
                };
                self.effects.projectiles.extend(ProjectileSpawn::fan(
                    center,
                    player,
                    spec.count,
                    1.0,
                    spec.speed,
                    spec.damage,
                    kind,
                ));
            },
            AttackKind::Summon => {
                let Some(minion) = spec.summon else {
                    return;
                };
                let offset = self.profile.size;
                for i in 0..spec.count {
                    let angle = ctx.rng.f32() * std::f32::consts::TAU
                        + i as f32 * std::f32::consts::PI;
                    self.effects.summons.push(SummonRequest {
                        kind: minion,
                        position: center + Vec2::from_angle(angle) * offset,
                    });
                }
            },
            AttackKind::MeteorRain => {
                let size = Vec2::splat(spec.radius);
                for _ in 0..spec.count {
                    if let Some(min) = random_open_position(ctx.map, ctx.rng, size, 20) {
                        self.meteors.push(PendingMeteor {
                            target: min + size * 0.5,
                            fuse: spec.windup,
                            damage: spec.damage,
                            radius: spec.radius,
                        });
                    }
                }
            },
            AttackKind::Slam
            | AttackKind::RootSlam
            | AttackKind::Charge
            | AttackKind::Burrow
            | AttackKind::FireBreath => {},
        }
    }

    fn burrow(&mut self, spec: &AttackSpec, ctx: &mut SimContext<'_>) {
        let size = Vec2::new(self.entity.width, self.entity.height);
        if let Some(min) = random_open_position(ctx.map, ctx.rng, size, 20) {
            self.entity.pos = min;
        }
        self.entity.vel = Vec2::ZERO;
        self.entity.knockback = Vec2::ZERO;
        self.entity.knockback_timer = 0.0;
        debug!(
            "{} burrows for {:.1}s",
            self.profile.name,
            spec.duration_for(self.phase)
        );
    }

    fn emerge(&mut self, spec: &AttackSpec) {
        if self.phase >= 2 {
            self.effects.shockwaves.push(Shockwave {
                center: self.entity.center(),
                radius: spec.radius,
                damage: spec.damage,
                knockback: 220.0,
            });
        }
        debug!("{} emerges", self.profile.name);
    }

    fn update_meteors(&mut self, dt: f32) {
        let effects = &mut self.effects;
        self.meteors.retain_mut(|meteor| {
            meteor.fuse -= dt;
            if meteor.fuse > 0.0 {
                return true;
            }
            effects.shockwaves.push(Shockwave {
                center: meteor.target,
                radius: meteor.radius,
                damage: meteor.damage,
                knockback: 120.0,
            });
            effects.hazards.push(HazardSpawn {
                center: meteor.target,
                radius: meteor.radius,
                duration: 3.0,
                damage: 1,
                kind: HazardKind::Meteor,
            });
            false
        });
    }
}

/// Rectangle covered by fire breath along a cardinal facing.
fn breath_zone(center: Vec2, facing: Vec2, length: f32, boss_size: f32) -> Aabb {
    let half = boss_size * 0.5;
    let width = boss_size;
    if facing.x.abs() > facing.y.abs() {
        let x = if facing.x > 0.0 {
            center.x + half
        } else {
            center.x - half - length
        };
        Aabb::new(x, center.y - width * 0.5, length, width)
    } else {
        let y = if facing.y > 0.0 {
            center.y + half
        } else {
            center.y - half - length
        };
        Aabb::new(center.x - width * 0.5, y, width, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::PathfindBudget;
    use crate::physics::{GridMap, TileMap};
    use crate::player::PlayerView;

    const DT: f32 = 1.0 / 60.0;

    struct Arena {
        map: GridMap,
        budget: PathfindBudget,
        rng: fastrand::Rng,
    }

    impl Arena {
        fn new() -> Self {
            Self {
                map: GridMap::walled(30, 30),
                budget: PathfindBudget::new(4),
                rng: fastrand::Rng::with_seed(11),
            }
        }

        fn tick(&mut self, boss: &mut Boss, player: Vec2) {
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
            boss.update(DT, &mut ctx);
        }
    }

    fn boss(kind: BossKind) -> Boss {
        Boss::new(EntityId::from_raw(100), kind, Vec2::new(240.0, 240.0))
    }

    #[test]
    fn test_ids_round_trip() {
        for kind in BossKind::ALL {
            assert_eq!(BossKind::from_id(kind.id()), Some(kind));
            let profile = kind.profile();
            assert!((0.5..=0.6).contains(&profile.phase_threshold));
            assert!(profile.knockback_scale < 1.0);
        }
    }

    #[test]
    fn test_phase_ratchet() {
        let mut b = boss(BossKind::DarkLord);
        assert_eq!(b.phase(), 1);
        assert!(b.take_damage(29, None, 0.0));
        assert_eq!(b.phase(), 1);
        assert!(b.take_damage(1, None, 0.0));
        assert_eq!(b.phase(), 2);
        b.heal(50);
        assert_eq!(b.hp(), 60);
        assert_eq!(b.phase(), 2);
    }

    #[test]
    fn test_knockback_is_scaled() {
        let mut b = boss(BossKind::DarkLord);
        b.take_damage(1, Some(Vec2::new(200.0, 240.0)), 200.0);
        assert!((b.entity.knockback.length() - 60.0).abs() < 1e-3);
        assert!((b.entity.knockback_timer - BOSS_KNOCKBACK_DURATION).abs() < f32::EPSILON);
    }

    #[test]
    fn test_idle_until_player_in_range() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::DarkLord);
        arena.tick(&mut b, Vec2::new(240.0, -960.0));
        assert!(!b.is_engaged());
        arena.tick(&mut b, Vec2::new(240.0, 100.0));
        assert!(b.is_engaged());
        assert!(b.just_engaged());
        arena.tick(&mut b, Vec2::new(240.0, 100.0));
        assert!(!b.just_engaged());
    }

    #[test]
    fn test_dark_lord_phase_one_only_chases() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::DarkLord);
        for _ in 0..120 {
            arena.tick(&mut b, Vec2::new(240.0, 340.0));
            assert!(b.active_attack().is_none());
            assert!(b.effects().is_empty());
        }
        assert!(b.entity.center().y > 240.0);
    }

    #[test]
    fn test_dark_lord_phase_two_priority() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::DarkLord);
        b.take_damage(30, None, 0.0);
        assert_eq!(b.phase(), 2);

        // Close: slam wins and summon fires alongside.
        let player = b.entity.center() + Vec2::new(20.0, 0.0);
        arena.tick(&mut b, player);
        assert_eq!(b.active_attack().map(|a| a.kind), Some(AttackKind::Slam));
        assert_eq!(b.effects().summons.len(), 2);
        assert_eq!(b.state_name(), "slamming");
    }

    #[test]
    fn test_guardian_summons_during_root_slam() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::ForestGuardian);
        b.take_damage(30, None, 0.0);
        assert_eq!(b.phase(), 2);
        let player = b.entity.center() + Vec2::new(60.0, 0.0);

        b.cooldowns = vec![0.0, 5.0];
        arena.tick(&mut b, player);
        assert_eq!(b.active_attack().map(|a| a.kind), Some(AttackKind::RootSlam));
        assert!(b.effects().summons.is_empty());

        b.cooldowns[1] = 0.0;
        arena.tick(&mut b, player);
        assert_eq!(b.active_attack().map(|a| a.kind), Some(AttackKind::RootSlam));
        assert_eq!(b.effects().summons.len(), 1);
        assert_eq!(b.effects().summons[0].kind, EnemyKind::VineSnapper);
    }

    #[test]
    fn test_guardian_summons_while_knocked_back() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::ForestGuardian);
        b.take_damage(30, Some(b.entity.center() - Vec2::new(10.0, 0.0)), 400.0);
        assert!(b.entity.is_knocked_back());

        b.cooldowns = vec![5.0, 0.0];
        let target = b.entity.center() + Vec2::new(60.0, 0.0);
        arena.tick(&mut b, target);
        assert!(b.active_attack().is_none());
        assert_eq!(b.effects().summons.len(), 1);
    }

    #[test]
    fn test_at_most_one_exclusive_attack() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::DarkLord);
        b.take_damage(30, None, 0.0);
        let player = b.entity.center() + Vec2::new(100.0, 0.0);
        arena.tick(&mut b, player);
        assert_eq!(b.active_attack().map(|a| a.kind), Some(AttackKind::Charge));
        assert_eq!(b.state_name(), "telegraphing");
        assert_eq!(b.entity.vel, Vec2::ZERO);

        // Charge runs its course without another attack interleaving.
        let mut saw_dash = false;
        for _ in 0..100 {
            arena.tick(&mut b, player);
            match b.active_attack() {
                Some(a) => {
                    assert_eq!(a.kind, AttackKind::Charge);
                    if a.stage == AttackStage::Active {
                        saw_dash = true;
                    }
                    assert!(b.effects().projectiles.is_empty());
                },
                None => break,
            }
        }
        assert!(saw_dash);
    }

    #[test]
    fn test_barrage_when_far() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::ShadowKing);
        b.take_damage(40, None, 0.0);
        let player = b.entity.center() + Vec2::new(0.0, 230.0);
        arena.tick(&mut b, player);
        // Beyond charge range: barrage fires at once, no exclusive state left.
        assert_eq!(b.effects().projectiles.len(), 7);
        assert!(b.active_attack().is_none());
    }

    #[test]
    fn test_sand_worm_burrowed_rejects_damage() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::SandWorm);
        assert_eq!(b.state_name(), "surface");

        let player = b.entity.center() + Vec2::new(60.0, 0.0);
        let mut ticks = 0;
        while b.state_name() != "burrowed" && ticks < 400 {
            arena.tick(&mut b, player);
            ticks += 1;
        }
        assert_eq!(b.state_name(), "burrowed");
        assert!(b.is_invulnerable());

        let hp = b.hp();
        assert!(!b.take_damage(10, Some(player), 300.0));
        assert_eq!(b.hp(), hp);
        assert!(!b.entity.is_knocked_back());
    }

    #[test]
    fn test_sand_worm_surface_damage_and_death() {
        let mut b = boss(BossKind::SandWorm);
        assert!(b.take_damage(10, None, 0.0));
        assert_eq!(b.hp(), 50);
        assert!(b.take_damage(50, None, 0.0));
        assert!(b.is_dying());
        assert!(!b.take_damage(1, None, 0.0));
    }

    #[test]
    fn test_sand_worm_emerges_with_shockwave_in_phase_two() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::SandWorm);
        b.take_damage(30, None, 0.0);
        assert_eq!(b.phase(), 2);

        let player = b.entity.center() + Vec2::new(60.0, 0.0);
        let mut emerged_with_blast = false;
        let mut was_burrowed = false;
        for _ in 0..600 {
            arena.tick(&mut b, player);
            if b.is_invulnerable() {
                was_burrowed = true;
            } else if was_burrowed {
                emerged_with_blast = !b.effects().shockwaves.is_empty();
                break;
            }
        }
        assert!(emerged_with_blast);
    }

    #[test]
    fn test_fire_breath_zone_in_front() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::InfernoDrake);
        let center = b.entity.center();
        let player = center + Vec2::new(100.0, 0.0);

        let mut zone = None;
        for _ in 0..300 {
            arena.tick(&mut b, player);
            if let Some(z) = b.effects().damage_zones.first() {
                zone = Some(*z);
                break;
            }
        }
        let zone = zone.map(|z| z.rect);
        assert!(zone.is_some_and(|r| r.min.x >= b.entity.center().x));
        assert_eq!(b.state_name(), "breathing_fire");
        assert_eq!(b.entity.vel, Vec2::ZERO);
    }

    #[test]
    fn test_meteor_rain_fuse() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::InfernoDrake);
        b.take_damage(45, None, 0.0);
        assert_eq!(b.phase(), 2);
        // Far enough that breath does not trigger.
        let player = b.entity.center() + Vec2::new(0.0, 150.0);
        arena.tick(&mut b, player);
        assert_eq!(b.pending_meteors().len(), 5);
        for meteor in b.pending_meteors() {
            assert!(!arena.map.is_solid_at(meteor.target));
        }

        let mut impacts = 0;
        for _ in 0..90 {
            arena.tick(&mut b, player);
            impacts += b
                .effects()
                .hazards
                .iter()
                .filter(|h| h.kind == HazardKind::Meteor)
                .count();
        }
        assert_eq!(impacts, 5);
        assert!(b.pending_meteors().is_empty());
    }

    #[test]
    fn test_reward_is_guaranteed() {
        let b = boss(BossKind::ForestGuardian);
        let loot = b.reward_loot();
        assert!(loot.iter().any(|p| matches!(
            &p.kind,
            PickupKind::Item(drop) if drop.item_id == "forest_heart"
        )));
    }

    #[test]
    fn test_death_sequence_removes_boss() {
        let mut arena = Arena::new();
        let mut b = boss(BossKind::ForestGuardian);
        b.take_damage(1000, None, 0.0);
        for _ in 0..120 {
            arena.tick(&mut b, Vec2::new(100.0, 100.0));
        }
        assert!(!b.entity.alive);
    }
}
