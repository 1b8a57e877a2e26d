//! Headless session runner.
//!
//! Drives the demo dungeon with a scripted pilot standing in for a human
//! player, then logs a summary and autosaves.

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::{debug, info, warn};

use hollowmere_gameplay::perception::{find_path, has_line_of_sight};
use hollowmere_gameplay::{GameContent, GameWorld, PlayerInput, SaveManager, CHEST_REACH};

use crate::config::SimConfig;
use crate::demo;
use crate::timing::FixedStep;

/// How far the pilot will detour for loot, in pixels.
const LOOT_RADIUS: f32 = 96.0;
/// Distance at which the pilot starts swinging.
const SWING_RANGE: f32 = 22.0;
/// Seconds between route searches.
const REPLAN_INTERVAL: f32 = 0.5;
/// Longest route the pilot will search for, in tiles.
const MAX_ROUTE: u32 = 96;
/// The pilot drinks a potion below this fraction of max hp.
const POTION_THRESHOLD: f32 = 0.4;

/// Scripted stand-in for a human player.
///
/// Priorities, highest first: heal when low, grab nearby loot, open chests,
/// fight the nearest enemy, then the boss.
#[derive(Debug, Default)]
pub struct Pilot {
    route: Vec<Vec2>,
    route_index: usize,
    route_goal: Option<Vec2>,
    replan_timer: f32,
}

impl Pilot {
    /// Creates an idle pilot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides this tick's input. May act on the world directly for chests
    /// and potions.
    pub fn decide(&mut self, world: &mut GameWorld, dt: f32) -> PlayerInput {
        let player = world.player();
        let center = player.center();
        let low = (player.hp() as f32) < player.max_hp() as f32 * POTION_THRESHOLD;
        if low && world.inventory().has("potion", 1) && world.use_item("potion").is_ok() {
            debug!("Pilot drank a potion");
        }

        if world.open_nearby_chest().is_some() {
            return PlayerInput::default();
        }

        let (goal, fight) = Self::pick_goal(world, center);
        let Some(goal) = goal else {
            self.route.clear();
            return PlayerInput::default();
        };

        let step = self.steer(world, center, goal, dt);
        PlayerInput {
            movement: step,
            attack: fight && center.distance(goal) <= SWING_RANGE,
        }
    }

    fn pick_goal(world: &GameWorld, center: Vec2) -> (Option<Vec2>, bool) {
        let loot = nearest(
            center,
            world
                .pickups()
                .iter()
                .map(|p| p.position)
                .filter(|p| p.distance(center) <= LOOT_RADIUS),
        );
        if loot.is_some() {
            return (loot, false);
        }

        let chest = nearest(
            center,
            world
                .chests()
                .iter()
                .filter(|c| !c.opened)
                .map(|c| c.position)
                .filter(|p| p.distance(center) <= LOOT_RADIUS * 2.0),
        );
        if let Some(chest) = chest {
            if chest.distance(center) > CHEST_REACH * 0.5 {
                return (Some(chest), false);
            }
        }

        let enemy = nearest(
            center,
            world
                .enemies()
                .iter()
                .filter(|e| e.is_active())
                .map(|e| e.entity.center()),
        );
        if enemy.is_some() {
            return (enemy, true);
        }

        let boss = nearest(
            center,
            world
                .bosses()
                .iter()
                .filter(|b| !b.is_dying())
                .map(|b| b.entity.center()),
        );
        (boss, boss.is_some())
    }

    /// Direction towards `goal`, following a route when walls are in the way.
    fn steer(&mut self, world: &GameWorld, from: Vec2, goal: Vec2, dt: f32) -> Vec2 {
        let map = world.map();
        if has_line_of_sight(map, from, goal) {
            self.route.clear();
            return goal - from;
        }

        self.replan_timer -= dt;
        let goal_moved = self
            .route_goal
            .map_or(true, |g| g.distance(goal) > map.tile_size());
        if self.replan_timer <= 0.0 || goal_moved || self.route_index >= self.route.len() {
            self.route = find_path(map, from, goal, MAX_ROUTE, true);
            self.route_index = 0;
            self.route_goal = Some(goal);
            self.replan_timer = REPLAN_INTERVAL;
        }

        while let Some(&waypoint) = self.route.get(self.route_index) {
            if waypoint.distance(from) > 2.0 {
                return waypoint - from;
            }
            self.route_index += 1;
        }
        goal - from
    }
}

fn nearest(center: Vec2, points: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    points.min_by(|a, b| a.distance_squared(center).total_cmp(&b.distance_squared(center)))
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Ticks simulated
    pub ticks: u64,
    /// Simulated seconds this run
    pub seconds: f64,
    /// Enemies slain across the save
    pub kills: u32,
    /// Bosses defeated across the save
    pub bosses_defeated: usize,
    /// Player level at the end
    pub level: u32,
    /// Gold carried at the end
    pub gold: u32,
    /// Quests completed
    pub quests_completed: usize,
    /// Achievements unlocked
    pub achievements: usize,
    /// Whether the player survived
    pub survived: bool,
    /// Slot written at the end, if any
    pub saved_slot: Option<u32>,
}

fn open_world(config: &SimConfig, content: &GameContent, saves: &SaveManager) -> Result<GameWorld> {
    if config.resume {
        if let Some(save) = saves.load_slot(config.autosave_slot) {
            info!(
                "Resuming '{}' from slot {}",
                save.name, config.autosave_slot
            );
            return demo::restore_world(config, content, &save);
        }
        warn!("No save in slot {}, starting fresh", config.autosave_slot);
    }
    demo::build_world(config, content)
}

fn announce_achievements(world: &mut GameWorld) {
    while let Some(achievement) = world.achievements_mut().pop_popup() {
        info!("Achievement unlocked: {} ({})", achievement.name, achievement.description);
    }
}

/// Runs one session as configured.
pub fn run(config: &SimConfig) -> Result<RunSummary> {
    let content = GameContent::builtin();
    let saves = SaveManager::new(&config.save_dir);
    let mut world = open_world(config, &content, &saves)?;
    let mut pilot = Pilot::new();
    let mut step = FixedStep::new(config.fixed_dt());
    let dt = step.fixed_dt();
    let total = config.total_ticks();

    info!(
        "Running {} ticks at {} Hz (seed {})",
        total, config.tick_rate, config.seed
    );

    let start_playtime = world.playtime();
    let mut ticks = 0u64;
    step.reset();
    'session: while ticks < total {
        let due = if config.realtime {
            step.wait_for_tick();
            let frame = step.frame_time();
            step.accumulate(frame)
        } else {
            1
        };

        for _ in 0..due {
            let input = pilot.decide(&mut world, dt);
            world.update(dt, input);
            announce_achievements(&mut world);
            ticks += 1;

            if world.is_game_over() {
                warn!("Player fell after {:.1}s", world.playtime() - start_playtime);
                break 'session;
            }
            if ticks >= total {
                break;
            }
        }
    }

    let mut summary = RunSummary {
        ticks,
        seconds: world.playtime() - start_playtime,
        kills: world.achievements().total_kills(),
        bosses_defeated: world.achievements().bosses_defeated().len(),
        level: world.player().level(),
        gold: world.player().gold(),
        quests_completed: world.quests().completed_count(),
        achievements: world.achievements().unlocked_count(),
        survived: !world.is_game_over(),
        saved_slot: None,
    };

    if config.autosave {
        let save = world.to_save("Autosave");
        saves
            .save_slot(config.autosave_slot, &save)
            .with_context(|| format!("autosave to slot {} failed", config.autosave_slot))?;
        summary.saved_slot = Some(config.autosave_slot);
    }

    info!(
        "Run finished: {} ticks, {} kills, {} bosses, level {}, {} gold, {} quests, {} achievements, {}",
        summary.ticks,
        summary.kills,
        summary.bosses_defeated,
        summary.level,
        summary.gold,
        summary.quests_completed,
        summary.achievements,
        if summary.survived { "survived" } else { "defeated" }
    );
    Ok(summary)
}
