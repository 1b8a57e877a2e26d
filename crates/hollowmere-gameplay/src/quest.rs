//! Quest system for tracking missions and objectives.
//!
//! Quests move `Inactive -> Active -> Completed` and never back. Objective
//! counters are fed by gameplay events and clamp at their requirement.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error types for quest operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestError {
    /// Quest not found
    #[error("Quest not found: {0}")]
    NotFound(String),
    /// Quest already active
    #[error("Quest already active: {0}")]
    AlreadyActive(String),
    /// Quest already completed
    #[error("Quest already completed: {0}")]
    AlreadyCompleted(String),
    /// Quest not active
    #[error("Quest not active: {0}")]
    NotActive(String),
    /// Prerequisites not met
    #[error("Prerequisites not met for quest: {0}")]
    PrerequisitesNotMet(String),
    /// Quest objectives not complete
    #[error("Quest objectives not complete: {0}")]
    ObjectivesIncomplete(String),
}

/// Result type for quest operations.
pub type QuestResult<T> = Result<T, QuestError>;

/// Numeric rewards keyed by kind (e.g. `"xp"`, `"gold"`).
pub type QuestRewards = BTreeMap<String, u32>;

/// Lifecycle of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Not started
    #[default]
    Inactive,
    /// In progress
    Active,
    /// Finished and rewarded
    Completed,
}

/// What an objective counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Enemy kills; target is an enemy id or `"enemy"` for any
    Kill,
    /// Items picked up
    Collect,
    /// NPC conversations
    Talk,
    /// Areas entered
    Explore,
    /// Bosses defeated
    Defeat,
    /// Chests opened
    Open,
}

/// Generic kill target matching every enemy kind.
pub const ANY_ENEMY: &str = "enemy";

/// One countable sub-goal of a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// What is counted
    pub kind: ObjectiveKind,
    /// What must be matched
    pub target: String,
    /// Progress so far, never above `required`
    #[serde(default)]
    pub current: u32,
    /// Progress needed
    pub required: u32,
    /// Player-facing text
    #[serde(default)]
    pub description: String,
}

impl Objective {
    /// Creates an objective with zero progress.
    #[must_use]
    pub fn new(kind: ObjectiveKind, target: impl Into<String>, required: u32) -> Self {
        Self {
            kind,
            target: target.into(),
            current: 0,
            required,
            description: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether the requirement is met.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.current >= self.required
    }

    /// Adds progress, clamped to the requirement.
    pub fn advance(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.required);
    }
}

/// A quest definition together with its live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Unique key
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Ordered objectives
    #[serde(default)]
    pub objectives: Vec<Objective>,
    /// Rewards handed out on completion
    #[serde(default)]
    pub rewards: QuestRewards,
    /// Quests that must be completed first
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Lifecycle state
    #[serde(default)]
    pub status: QuestStatus,
    /// Main storyline quest
    #[serde(default)]
    pub is_story: bool,
}

impl Quest {
    /// Creates an inactive quest.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            objectives: Vec::new(),
            rewards: QuestRewards::new(),
            prerequisites: Vec::new(),
            status: QuestStatus::Inactive,
            is_story: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds an objective.
    #[must_use]
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    /// Adds a reward.
    #[must_use]
    pub fn with_reward(mut self, kind: impl Into<String>, amount: u32) -> Self {
        self.rewards.insert(kind.into(), amount);
        self
    }

    /// Adds a prerequisite.
    #[must_use]
    pub fn with_prerequisite(mut self, quest_id: impl Into<String>) -> Self {
        self.prerequisites.push(quest_id.into());
        self
    }

    /// Marks the quest as part of the main story.
    #[must_use]
    pub fn story(mut self) -> Self {
        self.is_story = true;
        self
    }

    /// Whether every objective is met.
    #[must_use]
    pub fn all_objectives_complete(&self) -> bool {
        self.objectives.iter().all(Objective::is_complete)
    }
}

/// Persisted state of one quest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSaveEntry {
    /// Lifecycle state
    #[serde(default)]
    pub status: QuestStatus,
    /// Objective progress by position
    #[serde(default)]
    pub progress: Vec<u32>,
}

/// Persisted state of the quest manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSaveData {
    /// Entries keyed by quest id
    #[serde(default)]
    pub quests: BTreeMap<String, QuestSaveEntry>,
}

/// Quest manager handling all quest operations.
#[derive(Debug, Clone, Default)]
pub struct QuestManager {
    /// Quests keyed by id
    quests: HashMap<String, Quest>,
    /// Registration order
    order: Vec<String>,
}

impl QuestManager {
    /// Creates a new quest manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a quest, replacing any previous definition with that id.
    pub fn register(&mut self, quest: Quest) {
        if !self.quests.contains_key(&quest.id) {
            self.order.push(quest.id.clone());
        }
        self.quests.insert(quest.id.clone(), quest);
    }

    /// Returns the number of registered quests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quests.len()
    }

    /// Whether no quests are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    /// Gets a quest.
    #[must_use]
    pub fn get(&self, quest_id: &str) -> Option<&Quest> {
        self.quests.get(quest_id)
    }

    /// Status of a quest, if registered.
    #[must_use]
    pub fn status(&self, quest_id: &str) -> Option<QuestStatus> {
        self.quests.get(quest_id).map(|q| q.status)
    }

    /// Quests in registration order.
    pub fn quests(&self) -> impl Iterator<Item = &Quest> {
        self.order.iter().filter_map(|id| self.quests.get(id))
    }

    /// Currently active quests.
    pub fn active_quests(&self) -> impl Iterator<Item = &Quest> {
        self.quests().filter(|q| q.status == QuestStatus::Active)
    }

    /// Returns the number of completed quests.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.quests
            .values()
            .filter(|q| q.status == QuestStatus::Completed)
            .count()
    }

    /// Checks if a quest can be started right now.
    #[must_use]
    pub fn is_available(&self, quest_id: &str) -> bool {
        self.check_startable(quest_id).is_ok()
    }

    fn check_startable(&self, quest_id: &str) -> QuestResult<()> {
        let quest = self
            .quests
            .get(quest_id)
            .ok_or_else(|| QuestError::NotFound(quest_id.to_string()))?;
        match quest.status {
            QuestStatus::Active => return Err(QuestError::AlreadyActive(quest_id.to_string())),
            QuestStatus::Completed => {
                return Err(QuestError::AlreadyCompleted(quest_id.to_string()))
            },
            QuestStatus::Inactive => {},
        }
        let prerequisites_met = quest
            .prerequisites
            .iter()
            .all(|p| self.status(p) == Some(QuestStatus::Completed));
        if prerequisites_met {
            Ok(())
        } else {
            Err(QuestError::PrerequisitesNotMet(quest_id.to_string()))
        }
    }

    /// Starts a quest.
    pub fn try_start_quest(&mut self, quest_id: &str) -> QuestResult<()> {
        self.check_startable(quest_id)?;
        if let Some(quest) = self.quests.get_mut(quest_id) {
            quest.status = QuestStatus::Active;
            info!("Quest started: {}", quest.name);
        }
        Ok(())
    }

    /// Starts a quest; `false` if unknown, not inactive, or blocked by prerequisites.
    pub fn start_quest(&mut self, quest_id: &str) -> bool {
        match self.try_start_quest(quest_id) {
            Ok(()) => true,
            Err(err) => {
                debug!("{}", err);
                false
            },
        }
    }

    /// Adds progress to every matching objective of every active quest.
    ///
    /// Returns the ids of active quests whose objectives are now all met.
    pub fn update_objective(&mut self, kind: ObjectiveKind, target: &str, amount: u32) -> Vec<String> {
        let mut ready = Vec::new();
        for id in &self.order {
            let Some(quest) = self.quests.get_mut(id) else {
                continue;
            };
            if quest.status != QuestStatus::Active {
                continue;
            }
            let mut touched = false;
            for objective in &mut quest.objectives {
                if objective.kind == kind && objective.target == target && !objective.is_complete() {
                    objective.advance(amount);
                    touched = true;
                }
            }
            if touched && quest.all_objectives_complete() {
                ready.push(id.clone());
            }
        }
        ready
    }

    /// Whether every objective of a quest is met.
    #[must_use]
    pub fn check_quest_complete(&self, quest_id: &str) -> bool {
        self.quests
            .get(quest_id)
            .is_some_and(Quest::all_objectives_complete)
    }

    /// Completes an active quest whose objectives are met.
    pub fn try_complete_quest(&mut self, quest_id: &str) -> QuestResult<QuestRewards> {
        let quest = self
            .quests
            .get_mut(quest_id)
            .ok_or_else(|| QuestError::NotFound(quest_id.to_string()))?;
        match quest.status {
            QuestStatus::Completed => {
                return Err(QuestError::AlreadyCompleted(quest_id.to_string()))
            },
            QuestStatus::Inactive => return Err(QuestError::NotActive(quest_id.to_string())),
            QuestStatus::Active => {},
        }
        if !quest.all_objectives_complete() {
            return Err(QuestError::ObjectivesIncomplete(quest_id.to_string()));
        }
        quest.status = QuestStatus::Completed;
        info!("Quest completed: {}", quest.name);
        Ok(quest.rewards.clone())
    }

    /// Completes a quest; `None` if it is not ready.
    pub fn complete_quest(&mut self, quest_id: &str) -> Option<QuestRewards> {
        match self.try_complete_quest(quest_id) {
            Ok(rewards) => Some(rewards),
            Err(err) => {
                debug!("{}", err);
                None
            },
        }
    }

    /// Snapshot of statuses and objective progress.
    #[must_use]
    pub fn save_data(&self) -> QuestSaveData {
        let quests = self
            .quests
            .values()
            .map(|q| {
                (
                    q.id.clone(),
                    QuestSaveEntry {
                        status: q.status,
                        progress: q.objectives.iter().map(|o| o.current).collect(),
                    },
                )
            })
            .collect();
        QuestSaveData { quests }
    }

    /// Restores statuses and progress onto the registered definitions.
    ///
    /// Progress is matched to objectives by position and clamped to each
    /// objective's requirement. Unknown quest ids are skipped; `None` leaves
    /// the manager untouched.
    pub fn load_save_data(&mut self, data: Option<&QuestSaveData>) {
        let Some(data) = data else {
            return;
        };
        for (id, entry) in &data.quests {
            let Some(quest) = self.quests.get_mut(id) else {
                warn!("Saved quest {} no longer exists", id);
                continue;
            };
            quest.status = entry.status;
            for (objective, &saved) in quest.objectives.iter_mut().zip(&entry.progress) {
                objective.current = saved.min(objective.required);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hunt() -> Quest {
        Quest::new("hunt", "Hunter")
            .with_objective(Objective::new(ObjectiveKind::Kill, ANY_ENEMY, 3))
            .with_reward("xp", 50)
    }

    fn manager() -> QuestManager {
        let mut m = QuestManager::new();
        m.register(Quest::new("intro", "Intro").story());
        m.register(hunt().with_prerequisite("intro"));
        m
    }

    #[test]
    fn test_prerequisites_gate_start() {
        let mut m = manager();
        assert!(!m.start_quest("hunt"));
        assert_eq!(
            m.try_start_quest("hunt"),
            Err(QuestError::PrerequisitesNotMet("hunt".into()))
        );
        assert!(m.start_quest("intro"));
        assert!(m.complete_quest("intro").is_some());
        assert!(m.start_quest("hunt"));
        assert_eq!(m.status("hunt"), Some(QuestStatus::Active));
    }

    #[test]
    fn test_kill_objective_flow() {
        let mut m = QuestManager::new();
        m.register(hunt());
        assert!(m.start_quest("hunt"));

        assert!(m.update_objective(ObjectiveKind::Kill, ANY_ENEMY, 2).is_empty());
        assert_eq!(m.status("hunt"), Some(QuestStatus::Active));
        assert!(!m.check_quest_complete("hunt"));
        assert!(m.complete_quest("hunt").is_none());

        let ready = m.update_objective(ObjectiveKind::Kill, ANY_ENEMY, 100);
        assert_eq!(ready, vec!["hunt".to_string()]);
        assert_eq!(m.get("hunt").map(|q| q.objectives[0].current), Some(3));
        assert!(m.check_quest_complete("hunt"));

        let rewards = m.complete_quest("hunt");
        assert_eq!(rewards.and_then(|r| r.get("xp").copied()), Some(50));
        assert_eq!(m.status("hunt"), Some(QuestStatus::Completed));
        assert!(m.complete_quest("hunt").is_none());
    }

    #[test]
    fn test_status_never_regresses() {
        let mut m = QuestManager::new();
        m.register(hunt());
        assert!(m.start_quest("hunt"));
        assert!(!m.start_quest("hunt"));
        m.update_objective(ObjectiveKind::Kill, ANY_ENEMY, 3);
        assert!(m.complete_quest("hunt").is_some());
        assert_eq!(
            m.try_start_quest("hunt"),
            Err(QuestError::AlreadyCompleted("hunt".into()))
        );
    }

    #[test]
    fn test_unknown_quest() {
        let mut m = QuestManager::new();
        assert!(!m.start_quest("nope"));
        assert!(m.complete_quest("nope").is_none());
        assert!(!m.check_quest_complete("nope"));
        assert_eq!(
            m.try_complete_quest("nope"),
            Err(QuestError::NotFound("nope".into()))
        );
    }

    #[test]
    fn test_inactive_quests_do_not_progress() {
        let mut m = QuestManager::new();
        m.register(hunt());
        m.update_objective(ObjectiveKind::Kill, ANY_ENEMY, 3);
        assert_eq!(m.get("hunt").map(|q| q.objectives[0].current), Some(0));
        assert_eq!(
            m.try_complete_quest("hunt"),
            Err(QuestError::NotActive("hunt".into()))
        );
    }

    #[test]
    fn test_cyclic_prerequisites_never_start() {
        let mut m = QuestManager::new();
        m.register(Quest::new("a", "A").with_prerequisite("b"));
        m.register(Quest::new("b", "B").with_prerequisite("a"));
        assert!(!m.start_quest("a"));
        assert!(!m.start_quest("b"));
    }

    #[test]
    fn test_save_round_trip() {
        let mut m = manager();
        m.start_quest("intro");
        m.complete_quest("intro");
        m.start_quest("hunt");
        m.update_objective(ObjectiveKind::Kill, ANY_ENEMY, 2);

        let json = serde_json::to_string(&m.save_data()).unwrap_or_default();
        let data: Option<QuestSaveData> = serde_json::from_str(&json).ok();

        let mut restored = QuestManager::new();
        restored.register(Quest::new("intro", "Intro").story());
        restored.register(hunt().with_prerequisite("intro"));
        restored.load_save_data(data.as_ref());

        assert_eq!(restored.status("intro"), Some(QuestStatus::Completed));
        assert_eq!(restored.status("hunt"), Some(QuestStatus::Active));
        assert_eq!(restored.get("hunt").map(|q| q.objectives[0].current), Some(2));
    }

    #[test]
    fn test_load_none_is_noop() {
        let mut m = manager();
        m.load_save_data(None);
        assert_eq!(m.status("intro"), Some(QuestStatus::Inactive));
    }

    #[test]
    fn test_load_clamps_progress() {
        let mut m = QuestManager::new();
        m.register(hunt());
        let mut data = QuestSaveData::default();
        data.quests.insert(
            "hunt".into(),
            QuestSaveEntry {
                status: QuestStatus::Active,
                progress: vec![99, 7],
            },
        );
        m.load_save_data(Some(&data));
        assert_eq!(m.get("hunt").map(|q| q.objectives[0].current), Some(3));
    }

    proptest! {
        #[test]
        fn prop_progress_never_exceeds_required(
            required in 1u32..20,
            updates in proptest::collection::vec(0u32..10, 0..20),
        ) {
            let mut m = QuestManager::new();
            m.register(
                Quest::new("q", "Q")
                    .with_objective(Objective::new(ObjectiveKind::Collect, "herb", required)),
            );
            m.start_quest("q");
            let mut last = 0;
            for amount in updates {
                m.update_objective(ObjectiveKind::Collect, "herb", amount);
                let current = m.get("q").map_or(0, |q| q.objectives[0].current);
                prop_assert!(current <= required);
                prop_assert!(current >= last);
                last = current;
            }
        }
    }
}
