//! The game world: owns every combatant and progress tracker for a session
//! and advances them one tick at a time.
//!
//! Each tick runs, in order: delta capping, pathfinding budget reset, player
//! movement and attack, flank offsets, enemy and boss updates, resolution of
//! the effects they requested, contact damage, pickups, room locking, and
//! finally the event bus fan-out to quests and achievements.

use std::collections::BTreeSet;
use std::sync::Arc;

use glam::Vec2;
use hollowmere_common::{EntityId, IdAllocator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::achievement::AchievementManager;
use crate::alert::{flank_offsets, AlertState};
use crate::boss::{Boss, BossKind};
use crate::content::{GameContent, STAT_ATTACK, STAT_DEFENSE, STAT_HEAL, STAT_INSTANT};
use crate::context::SimContext;
use crate::drops::{Pickup, PickupKind};
use crate::effects::FrameEffects;
use crate::enemy::{Enemy, EnemyKind};
use crate::events::{EventBus, GameEvent};
use crate::inventory::{Inventory, InventoryError, InventoryResult, ItemKind, ItemRegistry};
use crate::perception::PathfindBudget;
use crate::physics::TileMap;
use crate::player::{Player, PlayerConfig, StatusEffect};
use crate::projectile::{HazardZone, Projectile};
use crate::quest::{ObjectiveKind, QuestManager, QuestRewards, ANY_ENEMY};
use crate::room::{RoomEvent, RoomManager};
use crate::save::{SaveGame, DEFAULT_GAME_HOUR};

/// In-game hours that pass per real second.
pub const GAME_HOURS_PER_SECOND: f32 = 1.0 / 60.0;

/// How close the player must stand to open a chest, in pixels.
pub const CHEST_REACH: f32 = 20.0;

/// Generic target used for chest objectives.
pub const ANY_CHEST: &str = "chest";

const MAX_EVENT_ROUNDS: usize = 8;
const SUMMON_SIZE: f32 = 12.0;

/// World-level tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    /// Longest step simulated in one tick, in seconds
    pub max_delta: f32,
    /// Path searches allowed per tick
    pub pathfind_budget: u32,
    /// Distance of flank offsets from the player
    pub flank_spread: f32,
    /// Seconds between player sword swings
    pub attack_cooldown: f32,
    /// Enemies allowed alive at once; summons beyond this are dropped
    pub max_enemies: usize,
    /// Event bus capacity
    pub event_capacity: usize,
    /// Distinct inventory stacks
    pub inventory_capacity: usize,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            max_delta: 0.05,
            pathfind_budget: 4,
            flank_spread: 24.0,
            attack_cooldown: 0.35,
            max_enemies: 64,
            event_capacity: 256,
            inventory_capacity: crate::inventory::DEFAULT_CAPACITY,
        }
    }
}

/// Player intent for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Movement direction; need not be normalized
    pub movement: Vec2,
    /// Swing the sword
    pub attack: bool,
}

impl PlayerInput {
    /// Walk in a direction.
    #[must_use]
    pub const fn walk(movement: Vec2) -> Self {
        Self {
            movement,
            attack: false,
        }
    }

    /// Stand still and swing.
    #[must_use]
    pub const fn attack() -> Self {
        Self {
            movement: Vec2::ZERO,
            attack: true,
        }
    }
}

/// A treasure chest placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Chest {
    /// Unique key
    pub id: String,
    /// Center position
    pub position: Vec2,
    /// What spills out when opened
    pub contents: Vec<PickupKind>,
    /// Already looted
    pub opened: bool,
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    amount: i32,
    source: Option<Vec2>,
    status: Option<StatusEffect>,
}

/// One play session.
pub struct GameWorld {
    map: Box<dyn TileMap>,
    tuning: WorldTuning,
    registry: Arc<ItemRegistry>,
    ids: IdAllocator,
    rng: fastrand::Rng,
    seed: u64,
    budget: PathfindBudget,
    player: Player,
    enemies: Vec<Enemy>,
    bosses: Vec<Boss>,
    projectiles: Vec<Projectile>,
    hazards: Vec<HazardZone>,
    pickups: Vec<Pickup>,
    chests: Vec<Chest>,
    rooms: Option<RoomManager>,
    quests: QuestManager,
    achievements: AchievementManager,
    inventory: Inventory,
    events: EventBus,
    frame: FrameEffects,
    attack_timer: f32,
    boss_fight: Option<EntityId>,
    opened_chests: BTreeSet<String>,
    current_area: String,
    game_hour: f32,
    playtime: f64,
}

impl GameWorld {
    /// Starts a fresh session with the player centered on `player_start`.
    #[must_use]
    pub fn new(
        map: Box<dyn TileMap>,
        content: &GameContent,
        tuning: WorldTuning,
        seed: u64,
        player_start: Vec2,
    ) -> Self {
        let registry = Arc::new(content.item_registry());
        let mut ids = IdAllocator::new();
        let player = Player::new(ids.allocate(), player_start);
        Self {
            map,
            tuning,
            inventory: Inventory::new(Arc::clone(&registry), tuning.inventory_capacity),
            registry,
            ids,
            rng: fastrand::Rng::with_seed(seed),
            seed,
            budget: PathfindBudget::new(tuning.pathfind_budget),
            player,
            enemies: Vec::new(),
            bosses: Vec::new(),
            projectiles: Vec::new(),
            hazards: Vec::new(),
            pickups: Vec::new(),
            chests: Vec::new(),
            rooms: None,
            quests: content.quest_manager(),
            achievements: content.achievement_manager(),
            events: EventBus::new(tuning.event_capacity),
            frame: FrameEffects::new(),
            attack_timer: 0.0,
            boss_fight: None,
            opened_chests: BTreeSet::new(),
            current_area: "village".to_string(),
            game_hour: DEFAULT_GAME_HOUR,
            playtime: 0.0,
        }
    }

    /// Rebuilds a session from static content plus a save.
    ///
    /// Nothing from a previous session is reused; enemies are not saved and
    /// must be respawned by the caller.
    #[must_use]
    pub fn from_save(
        map: Box<dyn TileMap>,
        content: &GameContent,
        tuning: WorldTuning,
        save: &SaveGame,
    ) -> Self {
        let start = Vec2::from(save.player.position);
        let mut world = Self::new(map, content, tuning, save.seed, start);
        let id = world.player.entity.id;
        world.player = Player::from_progress(id, &save.player, PlayerConfig::default());
        world.quests.load_save_data(Some(&save.quests));
        world.achievements.load_save_data(Some(&save.achievements));
        world.inventory.load_save_data(Some(&save.inventory));
        world.opened_chests = save.opened_chests.clone();
        world.current_area = save.current_area.clone();
        world.game_hour = save.game_hour.rem_euclid(24.0);
        world.playtime = save.playtime.max(0.0);
        info!(
            "Restored session: level {}, {} quests completed",
            world.player.level(),
            world.quests.completed_count()
        );
        world
    }

    /// Snapshot for a save slot.
    #[must_use]
    pub fn to_save(&self, name: &str) -> SaveGame {
        SaveGame {
            name: name.to_string(),
            seed: self.seed,
            playtime: self.playtime,
            game_hour: self.game_hour,
            current_area: self.current_area.clone(),
            player: self.player.progress(),
            quests: self.quests.save_data(),
            achievements: self.achievements.save_data(),
            inventory: self.inventory.save_data(),
            opened_chests: self.opened_chests.clone(),
            ..SaveGame::default()
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Tile map.
    #[must_use]
    pub fn map(&self) -> &dyn TileMap {
        self.map.as_ref()
    }

    /// World tuning.
    #[must_use]
    pub fn tuning(&self) -> &WorldTuning {
        &self.tuning
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Live and dying enemies.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Live and dying bosses.
    #[must_use]
    pub fn bosses(&self) -> &[Boss] {
        &self.bosses
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Active hazard zones.
    #[must_use]
    pub fn hazards(&self) -> &[HazardZone] {
        &self.hazards
    }

    /// Loot lying on the ground.
    #[must_use]
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Placed chests.
    #[must_use]
    pub fn chests(&self) -> &[Chest] {
        &self.chests
    }

    /// Room manager, if the map uses rooms.
    #[must_use]
    pub fn rooms(&self) -> Option<&RoomManager> {
        self.rooms.as_ref()
    }

    /// Quest manager.
    #[must_use]
    pub fn quests(&self) -> &QuestManager {
        &self.quests
    }

    /// Achievement manager.
    #[must_use]
    pub fn achievements(&self) -> &AchievementManager {
        &self.achievements
    }

    /// Achievement manager, for draining popups.
    pub fn achievements_mut(&mut self) -> &mut AchievementManager {
        &mut self.achievements
    }

    /// Inventory.
    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Event bus; other systems may publish through it.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Area the player is in.
    #[must_use]
    pub fn current_area(&self) -> &str {
        &self.current_area
    }

    /// Hour of the in-game day, `[0, 24)`.
    #[must_use]
    pub fn game_hour(&self) -> f32 {
        self.game_hour
    }

    /// Seconds simulated this session, including restored time.
    #[must_use]
    pub fn playtime(&self) -> f64 {
        self.playtime
    }

    /// Whether a boss fight is running.
    #[must_use]
    pub fn in_boss_fight(&self) -> bool {
        self.boss_fight.is_some()
    }

    /// Whether the player has fallen.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        !self.player.is_alive()
    }

    // ========================================================================
    // Setup and interaction
    // ========================================================================

    /// Enables camera-locked rooms.
    pub fn set_rooms(&mut self, mut rooms: RoomManager) {
        rooms.snap_to(self.player.center());
        self.rooms = Some(rooms);
    }

    /// Spawns an enemy centered on `center`.
    pub fn spawn_enemy(&mut self, kind: EnemyKind, center: Vec2) -> EntityId {
        let id = self.ids.allocate();
        self.enemies.push(Enemy::new(id, kind, center));
        trace!("Spawned {} {}", kind.id(), id);
        id
    }

    /// Spawns a boss centered on `center`.
    pub fn spawn_boss(&mut self, kind: BossKind, center: Vec2) -> EntityId {
        let id = self.ids.allocate();
        self.bosses.push(Boss::new(id, kind, center));
        debug!("Spawned boss {} {}", kind.id(), id);
        id
    }

    /// Places a chest; chests opened in a restored save stay open.
    pub fn add_chest(&mut self, id: impl Into<String>, position: Vec2, contents: Vec<PickupKind>) {
        let id = id.into();
        let opened = self.opened_chests.contains(&id);
        self.chests.push(Chest {
            id,
            position,
            contents,
            opened,
        });
    }

    /// Opens the nearest unopened chest within reach.
    pub fn open_nearby_chest(&mut self) -> Option<String> {
        let center = self.player.center();
        let chest = self
            .chests
            .iter_mut()
            .filter(|c| !c.opened && c.position.distance(center) <= CHEST_REACH)
            .min_by(|a, b| {
                a.position
                    .distance_squared(center)
                    .total_cmp(&b.position.distance_squared(center))
            })?;
        chest.opened = true;
        let id = chest.id.clone();
        let count = chest.contents.len().max(1) as f32;
        for (i, kind) in chest.contents.iter().enumerate() {
            let offset = Vec2::from_angle(std::f32::consts::TAU * i as f32 / count) * 10.0;
            self.pickups.push(Pickup::new(chest.position + offset, kind.clone()));
        }
        self.opened_chests.insert(id.clone());
        self.events.publish(GameEvent::ChestOpened {
            chest_id: id.clone(),
        });
        Some(id)
    }

    /// Moves the player into another area.
    pub fn enter_area(&mut self, area_id: &str) {
        if self.current_area != area_id {
            info!("Entering {}", area_id);
        }
        self.current_area = area_id.to_string();
        self.events.publish(GameEvent::AreaEntered {
            area_id: area_id.to_string(),
        });
    }

    /// Records a conversation.
    pub fn talk_to(&mut self, npc_id: &str) {
        self.events.publish(GameEvent::NpcTalked {
            npc_id: npc_id.to_string(),
        });
    }

    /// Starts a quest; it completes at once if its objectives are already met.
    pub fn start_quest(&mut self, quest_id: &str) -> bool {
        if !self.quests.start_quest(quest_id) {
            return false;
        }
        if self.quests.check_quest_complete(quest_id) {
            self.complete_quests(vec![quest_id.to_string()]);
        }
        true
    }

    /// Equips an item from the inventory.
    pub fn equip(&mut self, item_id: &str) -> InventoryResult<Option<String>> {
        self.inventory.equip(item_id)
    }

    /// Drinks or eats a consumable.
    pub fn use_item(&mut self, item_id: &str) -> InventoryResult<()> {
        let def = self.inventory.consume(item_id)?;
        self.player.heal(def.stat(STAT_HEAL));
        Ok(())
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advances the world by `dt` seconds (capped at `max_delta`).
    pub fn update(&mut self, dt: f32, input: PlayerInput) {
        let dt = dt.clamp(0.0, self.tuning.max_delta);
        self.playtime += f64::from(dt);
        self.achievements.add_play_time(f64::from(dt));
        self.game_hour = (self.game_hour + dt * GAME_HOURS_PER_SECOND).rem_euclid(24.0);

        if self.player.is_alive() {
            self.budget.begin_frame();
            self.frame.clear();
            let mut hits = Vec::new();

            self.update_player(dt, input, &mut hits);
            self.assign_flank_offsets();
            self.update_combatants(dt);
            self.spawn_requested_effects();
            self.update_projectiles(dt, &mut hits);
            self.update_hazards(dt, &mut hits);
            self.collect_contact_hits(&mut hits);
            for hit in hits {
                self.hurt_player(hit);
            }
            self.remove_dead();
            self.collect_pickups();
            self.update_rooms(dt);
        }

        self.process_events();
    }

    fn update_player(&mut self, dt: f32, input: PlayerInput, hits: &mut Vec<Hit>) {
        let status_damage = self.player.update(dt, input.movement, self.map.as_ref());
        if status_damage > 0 && self.boss_fight.is_some() {
            self.events.publish(GameEvent::PlayerDamagedInBossFight);
        }

        if let Some(rooms) = &self.rooms {
            let size = Vec2::new(self.player.entity.width, self.player.entity.height);
            self.player.entity.pos = rooms.clamp_position(self.player.entity.pos, size);
        }

        let center = self.player.center();
        if self
            .map
            .get_tile_at(center.x, center.y)
            .is_some_and(|t| t.is_hazard())
        {
            hits.push(Hit {
                amount: 1,
                source: None,
                status: Some(StatusEffect::Burning),
            });
        }

        self.attack_timer = (self.attack_timer - dt).max(0.0);
        if input.attack && self.attack_timer <= 0.0 {
            self.attack_timer = self.tuning.attack_cooldown;
            self.swing_sword();
        }
    }

    fn swing_sword(&mut self) {
        let reach = self.player.attack_rect();
        let origin = self.player.center();
        let config = *self.player.config();
        let damage = config.attack_damage + self.inventory.get_stat_bonus(STAT_ATTACK);

        let mut xp = 0;
        for enemy in &mut self.enemies {
            if !enemy.is_active() || !enemy.entity.overlaps_rect(&reach) {
                continue;
            }
            if enemy.take_damage(damage, Some(origin), config.attack_knockback) && enemy.is_dying() {
                xp += enemy.stats().xp;
                self.pickups.extend(enemy.roll_loot(&mut self.rng));
                self.events.publish(GameEvent::EnemyKilled {
                    enemy_type: enemy.kind().id().to_string(),
                });
            }
        }

        for boss in &mut self.bosses {
            if boss.is_dying() || !boss.entity.alive || !boss.entity.overlaps_rect(&reach) {
                continue;
            }
            let was_engaged = boss.is_engaged();
            if !boss.take_damage(damage, Some(origin), config.attack_knockback) {
                continue;
            }
            if !was_engaged {
                self.boss_fight = Some(boss.entity.id);
                self.events.publish(GameEvent::BossFightStarted {
                    boss_id: boss.kind().id().to_string(),
                });
            }
            if boss.is_dying() {
                xp += boss.profile().xp;
                self.pickups.extend(boss.reward_loot());
                self.events.publish(GameEvent::BossKilled {
                    boss_id: boss.kind().id().to_string(),
                });
                if self.boss_fight == Some(boss.entity.id) {
                    self.boss_fight = None;
                }
                if boss.kind() == BossKind::DarkLord {
                    self.events.publish(GameEvent::GameCompleted);
                }
            }
        }

        if xp > 0 {
            self.grant_xp(xp);
        }
    }

    fn assign_flank_offsets(&mut self) {
        let alerted: Vec<usize> = self
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_active() && e.alert_state() == Some(AlertState::Alert))
            .map(|(i, _)| i)
            .collect();
        let offsets = flank_offsets(alerted.len(), self.tuning.flank_spread);
        for enemy in &mut self.enemies {
            enemy.set_group_offset(Vec2::ZERO);
        }
        for (&i, offset) in alerted.iter().zip(offsets) {
            self.enemies[i].set_group_offset(offset);
        }
    }

    fn update_combatants(&mut self, dt: f32) {
        let view = self.player.view();
        let map = self.map.as_ref();

        for enemy in &mut self.enemies {
            let mut ctx = SimContext::new(map, view, &mut self.budget, &mut self.rng);
            enemy.update(dt, &mut ctx);
            self.frame.extend_from(enemy.effects());
        }

        for boss in &mut self.bosses {
            let mut ctx = SimContext::new(map, view, &mut self.budget, &mut self.rng);
            boss.update(dt, &mut ctx);
            self.frame.extend_from(boss.effects());
            if boss.just_engaged() {
                self.boss_fight = Some(boss.entity.id);
                self.events.publish(GameEvent::BossFightStarted {
                    boss_id: boss.kind().id().to_string(),
                });
            }
        }
    }

    fn spawn_requested_effects(&mut self) {
        for spawn in self.frame.projectiles.drain(..) {
            self.projectiles.push(Projectile::from_spawn(&spawn));
        }
        for spawn in self.frame.hazards.drain(..) {
            self.hazards.push(HazardZone::from_spawn(&spawn));
        }

        let summons: Vec<_> = self.frame.summons.drain(..).collect();
        for summon in summons {
            let alive = self.enemies.iter().filter(|e| e.entity.alive).count();
            if alive >= self.tuning.max_enemies {
                debug!("Enemy cap reached, dropping summon");
                break;
            }
            let half = SUMMON_SIZE * 0.5;
            let rect = crate::physics::Aabb::from_center(summon.position, half, half);
            if self.map.rect_hits_solid(&rect) {
                continue;
            }
            self.spawn_enemy(summon.kind, summon.position);
        }
    }

    fn update_projectiles(&mut self, dt: f32, hits: &mut Vec<Hit>) {
        let player_rect = self.player.rect();
        let map = self.map.as_ref();
        for projectile in &mut self.projectiles {
            projectile.tick(dt, map);
            if projectile.hits(&player_rect) {
                projectile.on_hit();
                hits.push(Hit {
                    amount: projectile.damage,
                    source: Some(projectile.position),
                    status: projectile.kind.status(),
                });
            }
        }
        self.projectiles.retain(|p| p.active);
    }

    fn update_hazards(&mut self, dt: f32, hits: &mut Vec<Hit>) {
        let player_rect = self.player.rect();
        for hazard in &mut self.hazards {
            if hazard.tick(dt) && hazard.covers(&player_rect) {
                // Status-only zones such as frost patches never deal damage.
                hits.push(Hit {
                    amount: hazard.damage.max(0),
                    source: None,
                    status: Some(hazard.kind.status()),
                });
            }
        }
        self.hazards.retain(|h| !h.is_expired());
    }

    fn collect_contact_hits(&mut self, hits: &mut Vec<Hit>) {
        let player_rect = self.player.rect();

        for wave in self.frame.shockwaves.drain(..) {
            if player_rect.intersects_circle(wave.center, wave.radius) {
                hits.push(Hit {
                    amount: wave.damage,
                    source: Some(wave.center),
                    status: None,
                });
            }
        }
        for zone in self.frame.damage_zones.drain(..) {
            if zone.rect.overlaps(&player_rect) {
                hits.push(Hit {
                    amount: zone.damage,
                    source: Some(zone.rect.center()),
                    status: zone.status,
                });
            }
        }
        for enemy in &self.enemies {
            if enemy.is_active() && enemy.entity.overlaps_rect(&player_rect) {
                hits.push(Hit {
                    amount: enemy.stats().contact_damage,
                    source: Some(enemy.entity.center()),
                    status: None,
                });
            }
        }
        for boss in &self.bosses {
            if boss.is_active() && boss.entity.overlaps_rect(&player_rect) {
                hits.push(Hit {
                    amount: boss.profile().contact_damage,
                    source: Some(boss.entity.center()),
                    status: None,
                });
            }
        }
    }

    fn hurt_player(&mut self, hit: Hit) {
        if hit.amount <= 0 {
            if let Some(status) = hit.status {
                self.player.apply_status(status);
            }
            return;
        }
        let defense = self.inventory.get_stat_bonus(STAT_DEFENSE);
        let amount = (hit.amount - defense).max(1);
        if !self.player.take_damage(amount, hit.source) {
            return;
        }
        if let Some(status) = hit.status {
            self.player.apply_status(status);
        }
        if self.boss_fight.is_some() {
            self.events.publish(GameEvent::PlayerDamagedInBossFight);
        }
    }

    fn remove_dead(&mut self) {
        self.enemies.retain(|e| e.entity.alive);
        self.bosses.retain(|b| b.entity.alive);
        if let Some(id) = self.boss_fight {
            if !self.bosses.iter().any(|b| b.entity.id == id && !b.is_dying()) {
                self.boss_fight = None;
            }
        }
    }

    fn collect_pickups(&mut self) {
        let player_rect = self.player.rect();
        let mut remaining = Vec::with_capacity(self.pickups.len());
        for pickup in std::mem::take(&mut self.pickups) {
            if !pickup.rect().overlaps(&player_rect) {
                remaining.push(pickup);
                continue;
            }
            let (item_id, count) = match &pickup.kind {
                PickupKind::Gold(amount) => {
                    self.player.add_gold(*amount);
                    continue;
                },
                PickupKind::Item(drop) => (drop.item_id.clone(), drop.count),
            };
            let instant_heal = self
                .registry
                .get(&item_id)
                .filter(|def| def.kind == ItemKind::Consumable && def.stat(STAT_INSTANT) > 0)
                .map(|def| def.stat(STAT_HEAL));
            if let Some(heal) = instant_heal {
                self.player.heal(heal * count as i32);
            } else {
                match self.inventory.add(&item_id, count) {
                    Ok(()) => {},
                    Err(InventoryError::Full { .. }) => {
                        remaining.push(pickup);
                        continue;
                    },
                    Err(err) => {
                        warn!("Discarding pickup {}: {}", item_id, err);
                        continue;
                    },
                }
            }
            self.events.publish(GameEvent::ItemCollected { item_id, count });
        }
        self.pickups = remaining;
    }

    fn update_rooms(&mut self, dt: f32) {
        let Some(rooms) = &mut self.rooms else {
            return;
        };
        for event in rooms.update(dt, self.player.center()) {
            trace!("Room event {:?}", event);
        }
        if !rooms.is_locked() {
            return;
        }
        let bounds = rooms.room(rooms.current()).map(|r| r.bounds);
        let remaining = bounds.map_or(0, |b| {
            self.enemies
                .iter()
                .filter(|e| e.is_active() && b.contains(e.entity.center()))
                .count()
                + self
                    .bosses
                    .iter()
                    .filter(|boss| !boss.is_dying() && b.contains(boss.entity.center()))
                    .count()
        });
        if let Some(RoomEvent::Unlocked(coord)) = rooms.notify_enemies_remaining(remaining) {
            debug!("Room ({}, {}) unlocked", coord.x, coord.y);
        }
    }

    // ========================================================================
    // Progress
    // ========================================================================

    fn grant_xp(&mut self, xp: u32) {
        for level in self.player.gain_xp(xp) {
            self.events.publish(GameEvent::LevelUp { level });
        }
    }

    fn complete_quests(&mut self, ready: Vec<String>) {
        for quest_id in ready {
            let Some(rewards) = self.quests.complete_quest(&quest_id) else {
                continue;
            };
            self.grant_rewards(&rewards);
            self.events.publish(GameEvent::QuestCompleted { quest_id });
        }
    }

    fn grant_rewards(&mut self, rewards: &QuestRewards) {
        if let Some(&gold) = rewards.get("gold") {
            self.player.add_gold(gold);
        }
        if let Some(&xp) = rewards.get("xp") {
            self.grant_xp(xp);
        }
    }

    /// Forwards pending events to the quest and achievement managers.
    ///
    /// Handlers may publish follow-up events (quest completions, level-ups),
    /// so the bus is drained until it stays empty.
    pub fn process_events(&mut self) {
        for _ in 0..MAX_EVENT_ROUNDS {
            let events = self.events.drain();
            if events.is_empty() {
                return;
            }
            for event in events {
                let ready = self.dispatch(event);
                self.complete_quests(ready);
            }
        }
        warn!("Event fan-out did not settle after {} rounds", MAX_EVENT_ROUNDS);
    }

    fn dispatch(&mut self, event: GameEvent) -> Vec<String> {
        trace!("Dispatching {:?}", event);
        match event {
            GameEvent::EnemyKilled { enemy_type } => {
                self.achievements.on_enemy_kill();
                let mut ready = self.quests.update_objective(ObjectiveKind::Kill, ANY_ENEMY, 1);
                ready.extend(self.quests.update_objective(ObjectiveKind::Kill, &enemy_type, 1));
                ready
            },
            GameEvent::BossFightStarted { .. } => {
                self.achievements.on_boss_fight_start();
                Vec::new()
            },
            GameEvent::BossKilled { boss_id } => {
                self.achievements.on_boss_kill(&boss_id);
                self.quests.update_objective(ObjectiveKind::Defeat, &boss_id, 1)
            },
            GameEvent::PlayerDamagedInBossFight => {
                self.achievements.on_player_damaged_in_boss_fight();
                Vec::new()
            },
            GameEvent::ChestOpened { chest_id } => {
                self.achievements.on_chest_open();
                let mut ready = self.quests.update_objective(ObjectiveKind::Open, ANY_CHEST, 1);
                ready.extend(self.quests.update_objective(ObjectiveKind::Open, &chest_id, 1));
                ready
            },
            GameEvent::AreaEntered { area_id } => {
                self.achievements.on_area_enter(&area_id);
                self.quests.update_objective(ObjectiveKind::Explore, &area_id, 1)
            },
            GameEvent::QuestCompleted { quest_id } => {
                self.achievements.on_quest_complete(&quest_id);
                Vec::new()
            },
            GameEvent::LevelUp { level } => {
                self.achievements.on_level_up(level);
                Vec::new()
            },
            GameEvent::ItemCollected { item_id, count } => {
                self.quests.update_objective(ObjectiveKind::Collect, &item_id, count)
            },
            GameEvent::NpcTalked { npc_id } => {
                self.quests.update_objective(ObjectiveKind::Talk, &npc_id, 1)
            },
            GameEvent::GameCompleted => {
                self.achievements.on_game_complete();
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::ids;
    use crate::drops::ItemDrop;
    use crate::effects::{HazardKind, HazardSpawn};
    use crate::physics::GridMap;
    use crate::quest::QuestStatus;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> GameWorld {
        GameWorld::new(
            Box::new(GridMap::walled(30, 30)),
            &GameContent::builtin(),
            WorldTuning::default(),
            7,
            Vec2::new(100.0, 100.0),
        )
    }

    fn swing_until<F: Fn(&GameWorld) -> bool>(w: &mut GameWorld, done: F) {
        for _ in 0..240 {
            if done(w) {
                return;
            }
            w.update(DT, PlayerInput::attack());
        }
    }

    #[test]
    fn test_delta_is_capped() {
        let mut w = world();
        w.update(1.0, PlayerInput::default());
        assert!((w.playtime() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_kill_feeds_quests_and_achievements() {
        let mut w = world();
        w.quests.register(
            crate::quest::Quest::new("cull", "Cull")
                .with_objective(crate::quest::Objective::new(ObjectiveKind::Kill, ANY_ENEMY, 1))
                .with_reward("xp", 5)
                .with_reward("gold", 3),
        );
        assert!(w.start_quest("cull"));

        w.inventory.add("iron_sword", 1).ok();
        assert!(w.equip("iron_sword").is_ok());
        w.spawn_enemy(EnemyKind::Slime, Vec2::new(100.0, 114.0));
        swing_until(&mut w, |w| w.enemies().is_empty());

        assert!(w.enemies().is_empty());
        assert_eq!(w.achievements().total_kills(), 1);
        assert!(w.achievements().is_unlocked(ids::FIRST_BLOOD));
        assert_eq!(w.quests().status("cull"), Some(QuestStatus::Completed));
        assert!(w.achievements().quests_completed().contains("cull"));
        assert!(w.player().gold() >= 3);
    }

    #[test]
    fn test_gold_pickup() {
        let mut w = world();
        w.pickups.push(Pickup::new(Vec2::new(100.0, 100.0), PickupKind::Gold(7)));
        w.update(DT, PlayerInput::default());
        assert_eq!(w.player().gold(), 7);
        assert!(w.pickups().is_empty());
    }

    #[test]
    fn test_item_pickup_goes_to_inventory() {
        let mut w = world();
        w.quests.register(
            crate::quest::Quest::new("bones", "Bones")
                .with_objective(crate::quest::Objective::new(ObjectiveKind::Collect, "bone", 2)),
        );
        w.start_quest("bones");
        w.pickups.push(Pickup::new(
            Vec2::new(100.0, 100.0),
            PickupKind::Item(ItemDrop {
                item_id: "bone".into(),
                count: 2,
            }),
        ));
        w.update(DT, PlayerInput::default());
        assert_eq!(w.inventory().count("bone"), 2);
        assert_eq!(w.quests().status("bones"), Some(QuestStatus::Completed));
    }

    #[test]
    fn test_heart_heals_instead_of_stacking() {
        let mut w = world();
        w.player.take_damage(4, None);
        w.pickups.push(Pickup::new(
            Vec2::new(100.0, 100.0),
            PickupKind::Item(ItemDrop {
                item_id: "heart".into(),
                count: 1,
            }),
        ));
        w.update(DT, PlayerInput::default());
        assert_eq!(w.player().hp(), w.player().max_hp() - 2);
        assert_eq!(w.inventory().count("heart"), 0);
    }

    #[test]
    fn test_chest_opens_once() {
        let mut w = world();
        w.add_chest("chest_a", Vec2::new(94.0, 100.0), vec![PickupKind::Gold(5)]);
        assert_eq!(w.open_nearby_chest(), Some("chest_a".into()));
        assert_eq!(w.open_nearby_chest(), None);
        w.update(DT, PlayerInput::default());
        assert_eq!(w.achievements().total_chests_opened(), 1);
        assert_eq!(w.player().gold(), 5);
    }

    #[test]
    fn test_area_and_talk_events() {
        let mut w = world();
        assert!(w.start_quest("elders_request"));
        w.talk_to("elder");
        w.enter_area("whisperwood");
        w.update(DT, PlayerInput::default());
        assert_eq!(w.quests().status("elders_request"), Some(QuestStatus::Completed));
        assert!(w.achievements().areas_visited().contains("whisperwood"));
        assert_eq!(w.current_area(), "whisperwood");
    }

    #[test]
    fn test_projectile_hurts_player() {
        let mut w = world();
        w.projectiles.push(Projectile::from_spawn(&crate::effects::ProjectileSpawn {
            origin: Vec2::new(100.0, 100.0),
            velocity: Vec2::ZERO,
            damage: 3,
            kind: crate::effects::ProjectileKind::Fireball,
        }));
        w.update(DT, PlayerInput::default());
        assert_eq!(w.player().hp(), w.player().max_hp() - 3);
        assert!(w.player().has_status(StatusEffect::Burning));
        assert!(w.projectiles().is_empty());
    }

    fn hazard_under_player(w: &mut GameWorld, kind: HazardKind, damage: i32) {
        w.hazards.push(HazardZone::from_spawn(&HazardSpawn {
            center: w.player().center(),
            radius: 24.0,
            duration: 2.0,
            damage,
            kind,
        }));
    }

    #[test]
    fn test_frost_patch_only_chills() {
        let mut w = world();
        hazard_under_player(&mut w, HazardKind::Ice, 0);
        let hp = w.player().hp();
        for _ in 0..60 {
            w.update(DT, PlayerInput::default());
        }
        assert_eq!(w.player().hp(), hp);
        assert!(w.player().has_status(StatusEffect::Chilled));
    }

    #[test]
    fn test_defense_reduces_hazard_damage() {
        let mut w = world();
        w.inventory.add("iron_shield", 1).ok();
        assert!(w.equip("iron_shield").is_ok());
        hazard_under_player(&mut w, HazardKind::Fire, 3);
        w.update(DT, PlayerInput::default());
        assert_eq!(w.player().hp(), w.player().max_hp() - 1);
        assert!(w.player().has_status(StatusEffect::Burning));
    }

    #[test]
    fn test_status_only_hit_keeps_boss_fight_flawless() {
        let mut w = world();
        w.spawn_boss(BossKind::ForestGuardian, Vec2::new(100.0, 200.0));
        for _ in 0..5 {
            w.update(DT, PlayerInput::default());
        }
        assert!(w.in_boss_fight());

        hazard_under_player(&mut w, HazardKind::Ice, 0);
        w.update(DT, PlayerInput::default());
        assert!(w.player().has_status(StatusEffect::Chilled));
        assert!(w.achievements().no_damage_taken());
    }

    #[test]
    fn test_boss_fight_events() {
        let mut w = world();
        w.spawn_boss(BossKind::ForestGuardian, Vec2::new(100.0, 200.0));
        for _ in 0..5 {
            w.update(DT, PlayerInput::default());
        }
        assert!(w.in_boss_fight());
        assert!(w.achievements().no_damage_taken());

        w.hurt_player(Hit {
            amount: 1,
            source: None,
            status: None,
        });
        w.process_events();
        assert!(!w.achievements().no_damage_taken());
    }

    #[test]
    fn test_save_and_rebuild() {
        let mut w = world();
        w.player.add_gold(40);
        w.inventory.add("potion", 2).ok();
        w.start_quest("elders_request");
        w.enter_area("frozen_peaks");
        w.add_chest("chest_a", Vec2::new(110.0, 100.0), Vec::new());
        w.open_nearby_chest();
        w.update(DT, PlayerInput::default());

        let save = w.to_save("test");
        let json = save.to_json().expect("serialize");
        let save = SaveGame::from_json(&json).expect("parse");

        let mut restored = GameWorld::from_save(
            Box::new(GridMap::walled(30, 30)),
            &GameContent::builtin(),
            WorldTuning::default(),
            &save,
        );
        assert_eq!(restored.player().gold(), 40);
        assert_eq!(restored.inventory().count("potion"), 2);
        assert_eq!(
            restored.quests().status("elders_request"),
            Some(QuestStatus::Active)
        );
        assert!(restored.achievements().areas_visited().contains("frozen_peaks"));
        assert_eq!(restored.current_area(), "frozen_peaks");

        restored.add_chest("chest_a", Vec2::new(110.0, 100.0), Vec::new());
        assert_eq!(restored.open_nearby_chest(), None);
    }

    #[test]
    fn test_use_item_heals() {
        let mut w = world();
        w.inventory.add("potion", 1).ok();
        w.player.take_damage(8, None);
        assert!(w.use_item("potion").is_ok());
        assert_eq!(w.player().hp(), w.player().max_hp() - 2);
        assert!(w.use_item("potion").is_err());
    }
}
