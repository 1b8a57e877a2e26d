//! Achievement tracking driven by gameplay events.
//!
//! Gameplay code reports discrete moments (`on_enemy_kill`, `on_boss_kill`,
//! ...) and the manager folds them into counters and unlocks achievements
//! whose conditions are met. Unlocks are one-way and idempotent.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Well-known achievement ids.
pub mod ids {
    /// First enemy killed.
    pub const FIRST_BLOOD: &str = "first_blood";
    /// 50 enemies killed.
    pub const MONSTER_HUNTER: &str = "monster_hunter";
    /// 200 enemies killed.
    pub const EXTERMINATOR: &str = "exterminator";
    /// First boss defeated.
    pub const BOSS_SLAYER: &str = "boss_slayer";
    /// Boss defeated without taking damage during the fight.
    pub const FLAWLESS: &str = "flawless";
    /// Every boss defeated.
    pub const BOSS_MASTER: &str = "boss_master";
    /// First chest opened.
    pub const TREASURE_SEEKER: &str = "treasure_seeker";
    /// Every chest opened.
    pub const TREASURE_HUNTER: &str = "treasure_hunter";
    /// Every area visited.
    pub const EXPLORER: &str = "explorer";
    /// First quest completed.
    pub const QUEST_STARTER: &str = "quest_starter";
    /// Five quests completed.
    pub const ADVENTURER: &str = "adventurer";
    /// Level 5 reached.
    pub const SEASONED: &str = "seasoned";
    /// Level 10 reached.
    pub const VETERAN: &str = "veteran";
    /// Story finished.
    pub const THE_END: &str = "the_end";
    /// Story finished within the speedrun limit.
    pub const SPEEDRUNNER: &str = "speedrunner";
    /// Every boss, area, chest, and the story.
    pub const COMPLETIONIST: &str = "completionist";
}

const MONSTER_HUNTER_KILLS: u32 = 50;
const EXTERMINATOR_KILLS: u32 = 200;
const ADVENTURER_QUESTS: usize = 5;
const SEASONED_LEVEL: u32 = 5;
const VETERAN_LEVEL: u32 = 10;
/// Play time limit for the speedrun achievement, in seconds.
pub const SPEEDRUN_LIMIT: f64 = 3600.0;

/// Achievement tier/rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    /// Common achievement.
    #[default]
    Bronze,
    /// Uncommon achievement.
    Silver,
    /// Rare achievement.
    Gold,
    /// Very rare achievement.
    Platinum,
}

impl AchievementTier {
    /// Get point value.
    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            Self::Bronze => 10,
            Self::Silver => 25,
            Self::Gold => 50,
            Self::Platinum => 100,
        }
    }
}

/// An achievement definition plus its unlock state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Tier.
    #[serde(default)]
    pub tier: AchievementTier,
    /// Hidden until unlocked.
    #[serde(default)]
    pub hidden: bool,
    /// Whether unlocked.
    #[serde(default)]
    pub unlocked: bool,
    /// Play time at unlock.
    #[serde(default)]
    pub unlocked_at: Option<f64>,
}

impl Achievement {
    /// Creates a locked achievement.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tier: AchievementTier::Bronze,
            hidden: false,
            unlocked: false,
            unlocked_at: None,
        }
    }

    /// Set tier.
    #[must_use]
    pub fn with_tier(mut self, tier: AchievementTier) -> Self {
        self.tier = tier;
        self
    }

    /// Set hidden.
    #[must_use]
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// What "everything" means for the aggregate achievements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTargets {
    /// Every boss id.
    pub bosses: Vec<String>,
    /// Every area id.
    pub areas: Vec<String>,
    /// Number of chests in the game.
    pub total_chests: u32,
}

/// Persisted achievement state: unlocked ids plus raw counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementSaveData {
    /// Unlocked achievement ids.
    pub unlocked: Vec<String>,
    /// Enemies killed.
    pub total_kills: u32,
    /// Chests opened.
    pub total_chests_opened: u32,
    /// Areas visited.
    pub areas_visited: BTreeSet<String>,
    /// Bosses defeated.
    pub bosses_defeated: BTreeSet<String>,
    /// Quests completed.
    pub quests_completed: BTreeSet<String>,
    /// Seconds played.
    pub play_time: f64,
    /// Story finished.
    pub game_completed: bool,
}

/// Event-driven achievement tracker.
#[derive(Debug, Clone, Default)]
pub struct AchievementManager {
    achievements: Vec<Achievement>,
    index: HashMap<String, usize>,
    targets: CompletionTargets,
    total_kills: u32,
    total_chests_opened: u32,
    areas_visited: BTreeSet<String>,
    bosses_defeated: BTreeSet<String>,
    quests_completed: BTreeSet<String>,
    play_time: f64,
    game_completed: bool,
    no_damage_taken: bool,
    popups: VecDeque<String>,
}

impl AchievementManager {
    /// Creates a manager over the given definitions, all locked.
    #[must_use]
    pub fn new(definitions: Vec<Achievement>, targets: CompletionTargets) -> Self {
        let mut manager = Self {
            targets,
            ..Self::default()
        };
        for mut def in definitions {
            def.unlocked = false;
            def.unlocked_at = None;
            if let Some(&i) = manager.index.get(&def.id) {
                manager.achievements[i] = def;
            } else {
                manager.index.insert(def.id.clone(), manager.achievements.len());
                manager.achievements.push(def);
            }
        }
        manager
    }

    /// All achievements in definition order.
    #[must_use]
    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    /// Gets an achievement.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.index.get(id).map(|&i| &self.achievements[i])
    }

    /// Whether an achievement is unlocked.
    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.get(id).is_some_and(|a| a.unlocked)
    }

    /// Count unlocked achievements.
    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.unlocked).count()
    }

    /// Points earned from unlocked achievements.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.achievements
            .iter()
            .filter(|a| a.unlocked)
            .map(|a| a.tier.points())
            .sum()
    }

    /// Completion targets.
    #[must_use]
    pub fn targets(&self) -> &CompletionTargets {
        &self.targets
    }

    /// Enemies killed.
    #[must_use]
    pub fn total_kills(&self) -> u32 {
        self.total_kills
    }

    /// Chests opened.
    #[must_use]
    pub fn total_chests_opened(&self) -> u32 {
        self.total_chests_opened
    }

    /// Areas visited.
    #[must_use]
    pub fn areas_visited(&self) -> &BTreeSet<String> {
        &self.areas_visited
    }

    /// Bosses defeated.
    #[must_use]
    pub fn bosses_defeated(&self) -> &BTreeSet<String> {
        &self.bosses_defeated
    }

    /// Quests completed.
    #[must_use]
    pub fn quests_completed(&self) -> &BTreeSet<String> {
        &self.quests_completed
    }

    /// Seconds played.
    #[must_use]
    pub fn play_time(&self) -> f64 {
        self.play_time
    }

    /// Whether the story has been finished.
    #[must_use]
    pub fn is_game_completed(&self) -> bool {
        self.game_completed
    }

    /// Whether the current boss fight is still damage-free.
    #[must_use]
    pub fn no_damage_taken(&self) -> bool {
        self.no_damage_taken
    }

    /// Unlocks an achievement. Returns `true` only on the first unlock.
    pub fn unlock(&mut self, id: &str) -> bool {
        let Some(&i) = self.index.get(id) else {
            debug!("Unknown achievement: {}", id);
            return false;
        };
        let achievement = &mut self.achievements[i];
        if achievement.unlocked {
            return false;
        }
        achievement.unlocked = true;
        achievement.unlocked_at = Some(self.play_time);
        info!("Achievement unlocked: {}", achievement.name);
        self.popups.push_back(achievement.id.clone());
        true
    }

    /// Next achievement waiting to be shown.
    pub fn pop_popup(&mut self) -> Option<&Achievement> {
        let id = self.popups.pop_front()?;
        self.get(&id)
    }

    /// Number of popups waiting.
    #[must_use]
    pub fn pending_popups(&self) -> usize {
        self.popups.len()
    }

    /// Accumulates play time.
    pub fn add_play_time(&mut self, dt: f64) {
        if dt > 0.0 {
            self.play_time += dt;
        }
    }

    // ========================================================================
    // Event ingestion
    // ========================================================================

    /// An enemy died.
    pub fn on_enemy_kill(&mut self) {
        self.total_kills += 1;
        self.unlock(ids::FIRST_BLOOD);
        if self.total_kills >= MONSTER_HUNTER_KILLS {
            self.unlock(ids::MONSTER_HUNTER);
        }
        if self.total_kills >= EXTERMINATOR_KILLS {
            self.unlock(ids::EXTERMINATOR);
        }
    }

    /// A boss fight began.
    pub fn on_boss_fight_start(&mut self) {
        self.no_damage_taken = true;
    }

    /// The player was hurt during a boss fight.
    pub fn on_player_damaged_in_boss_fight(&mut self) {
        self.no_damage_taken = false;
    }

    /// A boss died.
    pub fn on_boss_kill(&mut self, boss_id: &str) {
        self.bosses_defeated.insert(boss_id.to_string());
        self.unlock(ids::BOSS_SLAYER);
        if self.no_damage_taken {
            self.unlock(ids::FLAWLESS);
        }
        self.no_damage_taken = false;
        if self.all_bosses_defeated() {
            self.unlock(ids::BOSS_MASTER);
        }
        self.check_completionist();
    }

    /// A chest was opened.
    pub fn on_chest_open(&mut self) {
        self.total_chests_opened += 1;
        self.unlock(ids::TREASURE_SEEKER);
        if self.all_chests_opened() {
            self.unlock(ids::TREASURE_HUNTER);
        }
        self.check_completionist();
    }

    /// The player entered an area.
    pub fn on_area_enter(&mut self, area_id: &str) {
        if !self.areas_visited.insert(area_id.to_string()) {
            return;
        }
        if self.all_areas_visited() {
            self.unlock(ids::EXPLORER);
        }
        self.check_completionist();
    }

    /// A quest was completed.
    pub fn on_quest_complete(&mut self, quest_id: &str) {
        self.quests_completed.insert(quest_id.to_string());
        self.unlock(ids::QUEST_STARTER);
        if self.quests_completed.len() >= ADVENTURER_QUESTS {
            self.unlock(ids::ADVENTURER);
        }
    }

    /// The player reached a new level.
    pub fn on_level_up(&mut self, level: u32) {
        if level >= SEASONED_LEVEL {
            self.unlock(ids::SEASONED);
        }
        if level >= VETERAN_LEVEL {
            self.unlock(ids::VETERAN);
        }
    }

    /// The story was finished.
    pub fn on_game_complete(&mut self) {
        self.game_completed = true;
        self.unlock(ids::THE_END);
        if self.play_time < SPEEDRUN_LIMIT {
            self.unlock(ids::SPEEDRUNNER);
        }
        self.check_completionist();
    }

    fn all_bosses_defeated(&self) -> bool {
        !self.targets.bosses.is_empty()
            && self
                .targets
                .bosses
                .iter()
                .all(|b| self.bosses_defeated.contains(b))
    }

    fn all_areas_visited(&self) -> bool {
        !self.targets.areas.is_empty()
            && self
                .targets
                .areas
                .iter()
                .all(|a| self.areas_visited.contains(a))
    }

    fn all_chests_opened(&self) -> bool {
        self.targets.total_chests > 0 && self.total_chests_opened >= self.targets.total_chests
    }

    fn check_completionist(&mut self) {
        if self.all_bosses_defeated()
            && self.all_areas_visited()
            && self.all_chests_opened()
            && self.game_completed
        {
            self.unlock(ids::COMPLETIONIST);
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Snapshot of unlocked ids and counters.
    #[must_use]
    pub fn save_data(&self) -> AchievementSaveData {
        AchievementSaveData {
            unlocked: self
                .achievements
                .iter()
                .filter(|a| a.unlocked)
                .map(|a| a.id.clone())
                .collect(),
            total_kills: self.total_kills,
            total_chests_opened: self.total_chests_opened,
            areas_visited: self.areas_visited.clone(),
            bosses_defeated: self.bosses_defeated.clone(),
            quests_completed: self.quests_completed.clone(),
            play_time: self.play_time,
            game_completed: self.game_completed,
        }
    }

    /// Restores counters and unlocks onto the current definitions.
    ///
    /// Ids with no definition are dropped. Restored unlocks do not queue
    /// popups. `None` leaves the manager untouched.
    pub fn load_save_data(&mut self, data: Option<&AchievementSaveData>) {
        let Some(data) = data else {
            return;
        };
        self.total_kills = data.total_kills;
        self.total_chests_opened = data.total_chests_opened;
        self.areas_visited = data.areas_visited.clone();
        self.bosses_defeated = data.bosses_defeated.clone();
        self.quests_completed = data.quests_completed.clone();
        self.play_time = data.play_time.max(0.0);
        self.game_completed = data.game_completed;
        self.no_damage_taken = false;
        for id in &data.unlocked {
            if let Some(&i) = self.index.get(id) {
                self.achievements[i].unlocked = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Vec<Achievement> {
        [
            ids::FIRST_BLOOD,
            ids::BOSS_SLAYER,
            ids::FLAWLESS,
            ids::BOSS_MASTER,
            ids::TREASURE_SEEKER,
            ids::TREASURE_HUNTER,
            ids::EXPLORER,
            ids::QUEST_STARTER,
            ids::SEASONED,
            ids::THE_END,
            ids::SPEEDRUNNER,
            ids::COMPLETIONIST,
        ]
        .into_iter()
        .map(|id| Achievement::new(id, id, ""))
        .collect()
    }

    fn targets() -> CompletionTargets {
        CompletionTargets {
            bosses: vec!["dark_lord".into()],
            areas: vec!["village".into(), "forest".into()],
            total_chests: 2,
        }
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut m = AchievementManager::new(defs(), targets());
        assert!(m.unlock(ids::FIRST_BLOOD));
        assert!(!m.unlock(ids::FIRST_BLOOD));
        assert_eq!(m.unlocked_count(), 1);
        assert!(!m.unlock("nonexistent"));
    }

    #[test]
    fn test_every_unlock_returns_true_once() {
        let mut m = AchievementManager::new(defs(), targets());
        let all: Vec<String> = m.achievements().iter().map(|a| a.id.clone()).collect();
        let mut last = 0;
        for id in &all {
            assert!(m.unlock(id));
            assert!(!m.unlock(id));
            assert!(m.unlocked_count() > last);
            last = m.unlocked_count();
        }
        assert_eq!(last, all.len());
    }

    #[test]
    fn test_popups_queue_in_order() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_enemy_kill();
        m.on_chest_open();
        assert_eq!(m.pending_popups(), 2);
        assert_eq!(m.pop_popup().map(|a| a.id.clone()), Some(ids::FIRST_BLOOD.into()));
        assert_eq!(
            m.pop_popup().map(|a| a.id.clone()),
            Some(ids::TREASURE_SEEKER.into())
        );
        assert!(m.pop_popup().is_none());
    }

    #[test]
    fn test_flawless_boss_kill() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_boss_fight_start();
        m.on_boss_kill("dark_lord");
        assert!(m.is_unlocked(ids::FLAWLESS));
        assert!(m.is_unlocked(ids::BOSS_MASTER));
        assert!(!m.no_damage_taken());
    }

    #[test]
    fn test_damage_in_boss_fight_blocks_flawless() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_boss_fight_start();
        m.on_player_damaged_in_boss_fight();
        m.on_boss_kill("dark_lord");
        assert!(m.is_unlocked(ids::BOSS_SLAYER));
        assert!(!m.is_unlocked(ids::FLAWLESS));
    }

    #[test]
    fn test_boss_kill_without_fight_start_is_not_flawless() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_boss_kill("dark_lord");
        assert!(!m.is_unlocked(ids::FLAWLESS));
    }

    #[test]
    fn test_completionist_needs_all_four() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_area_enter("village");
        m.on_area_enter("forest");
        m.on_boss_kill("dark_lord");
        m.on_chest_open();
        m.on_game_complete();
        assert!(m.is_unlocked(ids::EXPLORER));
        assert!(!m.is_unlocked(ids::COMPLETIONIST));

        m.on_chest_open();
        assert!(m.is_unlocked(ids::TREASURE_HUNTER));
        assert!(m.is_unlocked(ids::COMPLETIONIST));
    }

    #[test]
    fn test_no_chests_means_never_all_opened() {
        let mut m = AchievementManager::new(
            defs(),
            CompletionTargets {
                total_chests: 0,
                ..targets()
            },
        );
        m.on_area_enter("village");
        m.on_area_enter("forest");
        m.on_boss_kill("dark_lord");
        m.on_game_complete();
        assert!(!m.is_unlocked(ids::TREASURE_HUNTER));
        assert!(!m.is_unlocked(ids::COMPLETIONIST));
    }

    #[test]
    fn test_speedrun() {
        let mut m = AchievementManager::new(defs(), targets());
        m.add_play_time(SPEEDRUN_LIMIT + 1.0);
        m.on_game_complete();
        assert!(m.is_unlocked(ids::THE_END));
        assert!(!m.is_unlocked(ids::SPEEDRUNNER));
    }

    #[test]
    fn test_level_up() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_level_up(4);
        assert!(!m.is_unlocked(ids::SEASONED));
        m.on_level_up(5);
        assert!(m.is_unlocked(ids::SEASONED));
    }

    #[test]
    fn test_save_round_trip() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_enemy_kill();
        m.on_area_enter("village");
        m.on_boss_kill("dark_lord");
        m.on_chest_open();
        m.add_play_time(100.0);

        let json = serde_json::to_string(&m.save_data()).unwrap_or_default();
        let data: Option<AchievementSaveData> = serde_json::from_str(&json).ok();

        let mut restored = AchievementManager::new(defs(), targets());
        restored.load_save_data(data.as_ref());

        assert_eq!(restored.total_kills(), 1);
        assert_eq!(restored.total_chests_opened(), 1);
        assert!(restored.areas_visited().contains("village"));
        assert!(restored.bosses_defeated().contains("dark_lord"));
        assert!((restored.play_time() - 100.0).abs() < 1e-9);
        assert_eq!(restored.unlocked_count(), m.unlocked_count());
        assert_eq!(restored.save_data(), m.save_data());
        assert_eq!(restored.pending_popups(), 0);
    }

    #[test]
    fn test_load_none_is_noop() {
        let mut m = AchievementManager::new(defs(), targets());
        m.on_enemy_kill();
        m.load_save_data(None);
        assert_eq!(m.total_kills(), 1);
    }
}
