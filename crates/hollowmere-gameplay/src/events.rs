//! Event bus for gameplay milestones.
//!
//! Gameplay code publishes discrete [`GameEvent`]s (kills, chests, areas,
//! level-ups). The world drains the bus once per tick and forwards each event
//! to the quest and achievement managers, which cannot observe play directly.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Milestone events consumed by progress trackers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A regular enemy died
    EnemyKilled {
        /// Enemy type id (e.g. "slime")
        enemy_type: String,
    },
    /// A boss fight began
    BossFightStarted {
        /// Boss id
        boss_id: String,
    },
    /// A boss died
    BossKilled {
        /// Boss id
        boss_id: String,
    },
    /// The player took damage while a boss fight was running
    PlayerDamagedInBossFight,
    /// A treasure chest was opened
    ChestOpened {
        /// Chest id
        chest_id: String,
    },
    /// The player entered an area
    AreaEntered {
        /// Area id
        area_id: String,
    },
    /// A quest was completed
    QuestCompleted {
        /// Quest id
        quest_id: String,
    },
    /// The player reached a new level
    LevelUp {
        /// New level
        level: u32,
    },
    /// Items were picked up
    ItemCollected {
        /// Item id
        item_id: String,
        /// Quantity
        count: u32,
    },
    /// The player spoke to an NPC
    NpcTalked {
        /// NPC id
        npc_id: String,
    },
    /// The final boss fell and the credits rolled
    GameCompleted,
}

/// Event bus for broadcasting events to the progress trackers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event to the bus.
    ///
    /// Returns `false` if the bus was full and the event was dropped.
    pub fn publish(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Event bus full, dropping {:?}", err.into_inner());
                false
            },
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}
