//! Player character as seen by the simulation core.
//!
//! Input mapping and animation live outside the core. What remains is the
//! part enemies interact with: position, hit points with invulnerability
//! frames, knockback, status effects and xp/level/gold progression.

use glam::Vec2;
use hollowmere_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::{Entity, Facing};
use crate::physics::{Aabb, TileMap};

/// Lingering condition applied by hazards and projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffect {
    /// Damage over time
    Burning,
    /// Movement slowed
    Chilled,
    /// Slow damage over time
    Poisoned,
}

impl StatusEffect {
    /// Duration applied (or refreshed) on contact.
    #[must_use]
    pub const fn duration(self) -> f32 {
        match self {
            Self::Burning => 2.0,
            Self::Chilled => 1.5,
            Self::Poisoned => 3.0,
        }
    }

    /// Seconds between damage ticks; `None` for non-damaging effects.
    #[must_use]
    pub const fn tick_interval(self) -> Option<f32> {
        match self {
            Self::Burning => Some(0.5),
            Self::Poisoned => Some(1.0),
            Self::Chilled => None,
        }
    }

    /// Movement speed factor while active.
    #[must_use]
    pub const fn speed_multiplier(self) -> f32 {
        match self {
            Self::Chilled => 0.5,
            Self::Burning | Self::Poisoned => 1.0,
        }
    }
}

/// A status effect with its remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatus {
    /// Which effect
    pub effect: StatusEffect,
    /// Seconds left
    pub remaining: f32,
    /// Seconds until the next damage tick
    pub tick_timer: f32,
}

/// Player tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Starting maximum hit points
    pub max_hp: i32,
    /// Walk speed in pixels per second
    pub speed: f32,
    /// Invulnerability after a hit, in seconds
    pub invulnerability: f32,
    /// Hitbox edge length
    pub size: f32,
    /// Base melee damage
    pub attack_damage: i32,
    /// Reach of the sword swing in pixels
    pub attack_reach: f32,
    /// Knockback applied to enemies struck
    pub attack_knockback: f32,
    /// Knockback the player receives from hits
    pub hit_knockback: f32,
    /// Max hp gained per level
    pub hp_per_level: i32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_hp: 12,
            speed: 90.0,
            invulnerability: 0.8,
            size: 12.0,
            attack_damage: 2,
            attack_reach: 14.0,
            attack_knockback: 160.0,
            hit_knockback: 140.0,
            hp_per_level: 2,
        }
    }
}

/// Read-only snapshot of the player handed to enemies each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    /// Player center
    pub center: Vec2,
    /// Current hit points
    pub hp: i32,
    /// Whether the player is alive
    pub alive: bool,
}

/// Serializable player progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProgress {
    /// Hit points
    pub hp: i32,
    /// Maximum hit points
    pub max_hp: i32,
    /// Experience towards the next level
    pub xp: u32,
    /// Level, starting at 1
    pub level: u32,
    /// Gold
    pub gold: u32,
    /// Center position
    pub position: [f32; 2],
}

impl Default for PlayerProgress {
    fn default() -> Self {
        let config = PlayerConfig::default();
        Self {
            hp: config.max_hp,
            max_hp: config.max_hp,
            xp: 0,
            level: 1,
            gold: 0,
            position: [0.0, 0.0],
        }
    }
}

/// Xp needed to go from `level` to `level + 1`.
#[must_use]
pub const fn xp_to_next(level: u32) -> u32 {
    20 * level
}

/// The player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Physical body
    pub entity: Entity,
    config: PlayerConfig,
    hp: i32,
    max_hp: i32,
    invulnerable_timer: f32,
    statuses: Vec<ActiveStatus>,
    xp: u32,
    level: u32,
    gold: u32,
}

impl Player {
    /// Creates a player centered on `center` with default tuning.
    #[must_use]
    pub fn new(id: EntityId, center: Vec2) -> Self {
        Self::with_config(id, center, PlayerConfig::default())
    }

    /// Creates a player with custom tuning.
    #[must_use]
    pub fn with_config(id: EntityId, center: Vec2, config: PlayerConfig) -> Self {
        Self {
            entity: Entity::centered(id, center, config.size, config.size),
            config,
            hp: config.max_hp,
            max_hp: config.max_hp,
            invulnerable_timer: 0.0,
            statuses: Vec::new(),
            xp: 0,
            level: 1,
            gold: 0,
        }
    }

    /// Player tuning.
    #[must_use]
    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Center position.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.entity.center()
    }

    /// Hitbox.
    #[must_use]
    pub fn rect(&self) -> Aabb {
        self.entity.rect()
    }

    /// Current hit points.
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Whether the player still stands.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether invulnerability frames are running.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_timer > 0.0
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Xp towards the next level.
    #[must_use]
    pub const fn xp(&self) -> u32 {
        self.xp
    }

    /// Gold carried.
    #[must_use]
    pub const fn gold(&self) -> u32 {
        self.gold
    }

    /// Active status effects.
    #[must_use]
    pub fn statuses(&self) -> &[ActiveStatus] {
        &self.statuses
    }

    /// Whether a status effect is active.
    #[must_use]
    pub fn has_status(&self, effect: StatusEffect) -> bool {
        self.statuses.iter().any(|s| s.effect == effect)
    }

    /// Snapshot for enemy AI.
    #[must_use]
    pub fn view(&self) -> PlayerView {
        PlayerView {
            center: self.center(),
            hp: self.hp,
            alive: self.is_alive(),
        }
    }

    /// Applies a hit.
    ///
    /// Returns `false` when the hit was absorbed by invulnerability frames or
    /// the player is already down. A `source` point adds knockback.
    pub fn take_damage(&mut self, amount: i32, source: Option<Vec2>) -> bool {
        if !self.is_alive() || self.is_invulnerable() || amount <= 0 {
            return false;
        }
        self.hp = (self.hp - amount).max(0);
        self.invulnerable_timer = self.config.invulnerability;
        if let Some(source) = source {
            self.entity.apply_knockback(source, self.config.hit_knockback);
        }
        debug!("Player took {} damage, hp {}/{}", amount, self.hp, self.max_hp);
        if self.hp == 0 {
            self.entity.alive = false;
            info!("Player was defeated");
        }
        true
    }

    /// Restores hit points up to the maximum.
    pub fn heal(&mut self, amount: i32) {
        if self.is_alive() {
            self.hp = (self.hp + amount.max(0)).min(self.max_hp);
        }
    }

    /// Applies or refreshes a status effect.
    pub fn apply_status(&mut self, effect: StatusEffect) {
        if !self.is_alive() {
            return;
        }
        if let Some(existing) = self.statuses.iter_mut().find(|s| s.effect == effect) {
            existing.remaining = existing.remaining.max(effect.duration());
        } else {
            self.statuses.push(ActiveStatus {
                effect,
                remaining: effect.duration(),
                tick_timer: effect.tick_interval().unwrap_or(0.0),
            });
        }
    }

    /// Current movement speed after status modifiers.
    #[must_use]
    pub fn move_speed(&self) -> f32 {
        self.statuses
            .iter()
            .fold(self.config.speed, |speed, s| speed * s.effect.speed_multiplier())
    }

    /// Advances timers and moves along `direction` (not necessarily normalized).
    ///
    /// Knockback overrides voluntary movement while it lasts. Returns damage
    /// dealt by status effects this tick.
    pub fn update(&mut self, dt: f32, direction: Vec2, map: &dyn TileMap) -> i32 {
        self.invulnerable_timer = (self.invulnerable_timer - dt).max(0.0);
        let status_damage = self.update_statuses(dt);

        if !self.is_alive() {
            self.entity.vel = Vec2::ZERO;
            return status_damage;
        }

        if self.entity.is_knocked_back() {
            let knockback = self.entity.knockback;
            self.entity.move_and_collide(knockback, dt, map);
            self.entity.update_knockback(dt);
            return status_damage;
        }

        let velocity = direction.normalize_or_zero() * self.move_speed();
        self.entity.vel = velocity;
        self.entity.face_towards(velocity);
        self.entity.move_and_collide(velocity, dt, map);
        status_damage
    }

    fn update_statuses(&mut self, dt: f32) -> i32 {
        let mut damage = 0;
        for status in &mut self.statuses {
            status.remaining -= dt;
            if let Some(interval) = status.effect.tick_interval() {
                status.tick_timer -= dt;
                while status.tick_timer <= 0.0 {
                    status.tick_timer += interval;
                    damage += 1;
                }
            }
        }
        self.statuses.retain(|s| s.remaining > 0.0);

        // Status damage ignores invulnerability frames.
        if damage > 0 && self.is_alive() {
            self.hp = (self.hp - damage).max(0);
            if self.hp == 0 {
                self.entity.alive = false;
                info!("Player succumbed to status effects");
            }
        }
        damage
    }

    /// Area struck by a sword swing in the facing direction.
    #[must_use]
    pub fn attack_rect(&self) -> Aabb {
        let reach = self.config.attack_reach;
        let half = self.config.size * 0.5;
        let center = self.center();
        match self.entity.facing {
            Facing::Up => Aabb::new(center.x - half, center.y - half - reach, self.config.size, reach),
            Facing::Down => Aabb::new(center.x - half, center.y + half, self.config.size, reach),
            Facing::Left => Aabb::new(center.x - half - reach, center.y - half, reach, self.config.size),
            Facing::Right => Aabb::new(center.x + half, center.y - half, reach, self.config.size),
        }
    }

    /// Grants xp and returns every level reached.
    pub fn gain_xp(&mut self, amount: u32) -> Vec<u32> {
        let mut gained = Vec::new();
        self.xp = self.xp.saturating_add(amount);
        while self.xp >= xp_to_next(self.level) {
            self.xp -= xp_to_next(self.level);
            self.level += 1;
            self.max_hp += self.config.hp_per_level;
            self.hp = self.max_hp;
            info!("Player reached level {}", self.level);
            gained.push(self.level);
        }
        gained
    }

    /// Adds gold.
    pub fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Spends gold if enough is carried.
    pub fn spend_gold(&mut self, amount: u32) -> bool {
        if self.gold >= amount {
            self.gold -= amount;
            true
        } else {
            false
        }
    }

    /// Serializable progress snapshot.
    #[must_use]
    pub fn progress(&self) -> PlayerProgress {
        let center = self.center();
        PlayerProgress {
            hp: self.hp,
            max_hp: self.max_hp,
            xp: self.xp,
            level: self.level,
            gold: self.gold,
            position: [center.x, center.y],
        }
    }

    /// Rebuilds a player from saved progress.
    #[must_use]
    pub fn from_progress(id: EntityId, progress: &PlayerProgress, config: PlayerConfig) -> Self {
        let mut player = Self::with_config(id, Vec2::from(progress.position), config);
        player.max_hp = progress.max_hp.max(1);
        player.hp = progress.hp.clamp(1, player.max_hp);
        player.xp = progress.xp;
        player.level = progress.level.max(1);
        player.gold = progress.gold;
        player
    }
}
