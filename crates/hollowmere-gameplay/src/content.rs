//! Built-in static content: items, quests, achievements and completion
//! targets.
//!
//! Content is plain serde data. The built-in set can be replaced by a JSON
//! document with the same shape.

use std::collections::{HashMap, HashSet};

use hollowmere_common::{HollowError, HollowResult, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::achievement::{ids, Achievement, AchievementManager, AchievementTier, CompletionTargets};
use crate::boss::BossKind;
use crate::inventory::{EquipSlot, ItemDef, ItemKind, ItemRegistry};
use crate::quest::{Objective, ObjectiveKind, Quest, QuestManager, ANY_ENEMY};

/// Item stat healed on use.
pub const STAT_HEAL: &str = "heal";
/// Item stat marking pickups that are used on touch instead of stored.
pub const STAT_INSTANT: &str = "instant";
/// Item stat added to the player's melee damage.
pub const STAT_ATTACK: &str = "attack";
/// Item stat subtracted from incoming damage.
pub const STAT_DEFENSE: &str = "defense";

/// Every area of the world.
pub const AREAS: [&str; 6] = [
    "village",
    "whisperwood",
    "sunscar_desert",
    "frozen_peaks",
    "ember_caverns",
    "shadow_keep",
];

/// Number of treasure chests placed in the world.
pub const TOTAL_CHESTS: u32 = 12;

/// Id of the quest whose completion finishes the story.
pub const FINAL_QUEST: &str = "the_dark_lord";

/// A complete set of static game data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameContent {
    /// Content schema version
    pub version: SchemaVersion,
    /// Item templates
    pub items: Vec<ItemDef>,
    /// Quest definitions, all inactive
    pub quests: Vec<Quest>,
    /// Achievement definitions, all locked
    pub achievements: Vec<Achievement>,
    /// Aggregate achievement targets
    pub targets: CompletionTargets,
}

impl GameContent {
    /// The content shipped with the game.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            version: SchemaVersion::CONTENT,
            items: builtin_items(),
            quests: builtin_quests(),
            achievements: builtin_achievements(),
            targets: CompletionTargets {
                bosses: BossKind::ALL.iter().map(|b| b.id().to_string()).collect(),
                areas: AREAS.iter().map(|a| (*a).to_string()).collect(),
                total_chests: TOTAL_CHESTS,
            },
        }
    }

    /// Parses and validates content from JSON.
    pub fn from_json(json: &str) -> HollowResult<Self> {
        let content: Self =
            serde_json::from_str(json).map_err(|e| HollowError::Serialization(e.to_string()))?;
        if !SchemaVersion::CONTENT.can_read(&content.version) {
            return Err(HollowError::VersionMismatch {
                expected: SchemaVersion::CONTENT.to_string(),
                actual: content.version.to_string(),
            });
        }
        content.validate()?;
        info!(
            "Loaded content: {} items, {} quests, {} achievements",
            content.items.len(),
            content.quests.len(),
            content.achievements.len()
        );
        Ok(content)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> HollowResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| HollowError::Serialization(e.to_string()))
    }

    /// Checks ids are unique and the quest prerequisite graph is acyclic
    /// and closed.
    pub fn validate(&self) -> HollowResult<()> {
        check_unique("item", self.items.iter().map(|i| i.id.as_str()))?;
        check_unique("quest", self.quests.iter().map(|q| q.id.as_str()))?;
        check_unique(
            "achievement",
            self.achievements.iter().map(|a| a.id.as_str()),
        )?;

        let graph: HashMap<&str, Vec<&str>> = self
            .quests
            .iter()
            .map(|q| {
                (
                    q.id.as_str(),
                    q.prerequisites.iter().map(String::as_str).collect(),
                )
            })
            .collect();
        for (id, prereqs) in &graph {
            if let Some(missing) = prereqs.iter().find(|p| !graph.contains_key(*p)) {
                return Err(HollowError::InvalidData(format!(
                    "quest {id} requires unknown quest {missing}"
                )));
            }
        }

        // Kahn's algorithm: anything left over sits on a cycle.
        let mut remaining: HashMap<&str, usize> =
            graph.iter().map(|(id, p)| (*id, p.len())).collect();
        let mut ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| *id)
            .collect();
        while let Some(done) = ready.pop() {
            remaining.remove(done);
            for (id, prereqs) in &graph {
                if prereqs.contains(&done) {
                    if let Some(n) = remaining.get_mut(id) {
                        *n -= 1;
                        if *n == 0 {
                            ready.push(*id);
                        }
                    }
                }
            }
        }
        if let Some(id) = remaining.keys().next() {
            return Err(HollowError::InvalidData(format!(
                "quest {id} has cyclic prerequisites"
            )));
        }
        Ok(())
    }

    /// Builds the shared item registry.
    #[must_use]
    pub fn item_registry(&self) -> ItemRegistry {
        ItemRegistry::from_defs(self.items.iter().cloned())
    }

    /// Builds a fresh quest manager.
    #[must_use]
    pub fn quest_manager(&self) -> QuestManager {
        let mut manager = QuestManager::new();
        for quest in &self.quests {
            manager.register(quest.clone());
        }
        manager
    }

    /// Builds a fresh achievement manager.
    #[must_use]
    pub fn achievement_manager(&self) -> AchievementManager {
        AchievementManager::new(self.achievements.clone(), self.targets.clone())
    }
}

impl Default for GameContent {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_unique<'a>(what: &str, ids: impl Iterator<Item = &'a str>) -> HollowResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(HollowError::InvalidData(format!("duplicate {what} id {id}")));
        }
    }
    Ok(())
}

fn equipment(id: &str, name: &str, slot: EquipSlot, stat: &str, amount: i32, value: u32) -> ItemDef {
    ItemDef::new(id, name, ItemKind::Equipment(slot))
        .with_stat(stat, amount)
        .with_value(value)
}

fn builtin_items() -> Vec<ItemDef> {
    vec![
        equipment("wood_sword", "Wooden Sword", EquipSlot::Weapon, STAT_ATTACK, 1, 10),
        equipment("iron_sword", "Iron Sword", EquipSlot::Weapon, STAT_ATTACK, 2, 60),
        equipment("flame_blade", "Flame Blade", EquipSlot::Weapon, STAT_ATTACK, 4, 200),
        equipment("wooden_shield", "Wooden Shield", EquipSlot::Shield, STAT_DEFENSE, 1, 15),
        equipment("iron_shield", "Iron Shield", EquipSlot::Shield, STAT_DEFENSE, 2, 80),
        equipment("fire_ring", "Fire Ring", EquipSlot::Ring, STAT_ATTACK, 1, 50),
        equipment("guard_ring", "Guard Ring", EquipSlot::Ring, STAT_DEFENSE, 1, 50),
        equipment("swift_boots", "Swift Boots", EquipSlot::Boots, "speed", 15, 40),
        ItemDef::new("heart", "Heart", ItemKind::Consumable)
            .with_stat(STAT_HEAL, 2)
            .with_stat(STAT_INSTANT, 1),
        ItemDef::new("potion", "Potion", ItemKind::Consumable)
            .with_stat(STAT_HEAL, 6)
            .with_value(25),
        ItemDef::new("dungeon_key", "Dungeon Key", ItemKind::Key),
        ItemDef::new("bone", "Bone", ItemKind::Material).with_value(2),
        ItemDef::new("vine_seed", "Vine Seed", ItemKind::Material).with_value(3),
        ItemDef::new("magma_core", "Magma Core", ItemKind::Material).with_value(8),
        ItemDef::new("frost_shard", "Frost Shard", ItemKind::Material).with_value(5),
        ItemDef::new("dark_crystal", "Dark Crystal", ItemKind::Key),
        ItemDef::new("shadow_crown", "Shadow Crown", ItemKind::Key),
        ItemDef::new("forest_heart", "Forest Heart", ItemKind::Key),
        ItemDef::new("sand_fang", "Sand Fang", ItemKind::Key),
        ItemDef::new("drake_scale", "Drake Scale", ItemKind::Key),
    ]
}

fn story(id: &str, name: &str, objective: Objective, prerequisite: Option<&str>, xp: u32) -> Quest {
    let quest = Quest::new(id, name)
        .with_objective(objective)
        .with_reward("xp", xp)
        .story();
    match prerequisite {
        Some(p) => quest.with_prerequisite(p),
        None => quest,
    }
}

fn builtin_quests() -> Vec<Quest> {
    vec![
        story(
            "elders_request",
            "The Elder's Request",
            Objective::new(ObjectiveKind::Talk, "elder", 1).with_description("Speak with the elder"),
            None,
            20,
        )
        .with_reward("gold", 10),
        story(
            "clear_the_woods",
            "Clear the Woods",
            Objective::new(ObjectiveKind::Kill, ANY_ENEMY, 5)
                .with_description("Defeat 5 monsters in Whisperwood"),
            Some("elders_request"),
            50,
        ),
        story(
            "heart_of_the_forest",
            "Heart of the Forest",
            Objective::new(ObjectiveKind::Defeat, BossKind::ForestGuardian.id(), 1),
            Some("clear_the_woods"),
            150,
        ),
        story(
            "beneath_the_sands",
            "Beneath the Sands",
            Objective::new(ObjectiveKind::Defeat, BossKind::SandWorm.id(), 1),
            Some("heart_of_the_forest"),
            200,
        ),
        story(
            "ember_depths",
            "Ember Depths",
            Objective::new(ObjectiveKind::Defeat, BossKind::InfernoDrake.id(), 1),
            Some("beneath_the_sands"),
            250,
        ),
        story(
            "crown_of_shadow",
            "Crown of Shadow",
            Objective::new(ObjectiveKind::Defeat, BossKind::ShadowKing.id(), 1),
            Some("ember_depths"),
            300,
        ),
        story(
            FINAL_QUEST,
            "The Dark Lord",
            Objective::new(ObjectiveKind::Defeat, BossKind::DarkLord.id(), 1),
            Some("crown_of_shadow"),
            500,
        ),
        Quest::new("slime_trouble", "Slime Trouble")
            .with_objective(Objective::new(ObjectiveKind::Kill, "slime", 8))
            .with_reward("xp", 30)
            .with_reward("gold", 20),
        Quest::new("bone_collector", "Bone Collector")
            .with_objective(Objective::new(ObjectiveKind::Collect, "bone", 5))
            .with_reward("xp", 25)
            .with_reward("gold", 30)
            .with_prerequisite("elders_request"),
        Quest::new("peak_scout", "Peak Scout")
            .with_objective(Objective::new(ObjectiveKind::Explore, "frozen_peaks", 1))
            .with_reward("xp", 40),
        Quest::new("treasure_trail", "Treasure Trail")
            .with_objective(Objective::new(ObjectiveKind::Open, "chest", 3))
            .with_reward("xp", 30)
            .with_reward("gold", 50),
    ]
}

fn builtin_achievements() -> Vec<Achievement> {
    use AchievementTier::{Bronze, Gold, Platinum, Silver};
    [
        (ids::FIRST_BLOOD, "First Blood", "Defeat an enemy", Bronze, false),
        (ids::MONSTER_HUNTER, "Monster Hunter", "Defeat 50 enemies", Silver, false),
        (ids::EXTERMINATOR, "Exterminator", "Defeat 200 enemies", Gold, false),
        (ids::BOSS_SLAYER, "Boss Slayer", "Defeat a boss", Silver, false),
        (ids::FLAWLESS, "Flawless", "Defeat a boss without taking damage", Gold, true),
        (ids::BOSS_MASTER, "Boss Master", "Defeat every boss", Gold, false),
        (ids::TREASURE_SEEKER, "Treasure Seeker", "Open a chest", Bronze, false),
        (ids::TREASURE_HUNTER, "Treasure Hunter", "Open every chest", Gold, false),
        (ids::EXPLORER, "Explorer", "Visit every area", Silver, false),
        (ids::QUEST_STARTER, "Helping Hand", "Complete a quest", Bronze, false),
        (ids::ADVENTURER, "Adventurer", "Complete 5 quests", Silver, false),
        (ids::SEASONED, "Seasoned", "Reach level 5", Bronze, false),
        (ids::VETERAN, "Veteran", "Reach level 10", Silver, false),
        (ids::THE_END, "The End", "Defeat the Dark Lord", Gold, false),
        (ids::SPEEDRUNNER, "Speedrunner", "Finish the story within an hour", Platinum, true),
        (ids::COMPLETIONIST, "Completionist", "Do everything", Platinum, true),
    ]
    .into_iter()
    .map(|(id, name, desc, tier, hidden)| {
        Achievement::new(id, name, desc)
            .with_tier(tier)
            .with_hidden(hidden)
    })
    .collect()
}
