//! Loot: weighted item drop tables, gold rolls and the pickups they leave.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::physics::Aabb;

/// Pickup size in pixels.
pub const PICKUP_SIZE: f32 = 8.0;

fn default_weight() -> u32 {
    1
}

fn default_one() -> u32 {
    1
}

/// One possible item outcome of a [`DropTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEntry {
    /// Item id
    pub item_id: String,
    /// Relative weight
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Minimum stack size
    #[serde(default = "default_one")]
    pub min_count: u32,
    /// Maximum stack size (inclusive)
    #[serde(default = "default_one")]
    pub max_count: u32,
}

impl DropEntry {
    /// Creates a single-item entry.
    #[must_use]
    pub fn new(item_id: impl Into<String>, weight: u32) -> Self {
        Self {
            item_id: item_id.into(),
            weight,
            min_count: 1,
            max_count: 1,
        }
    }

    /// Sets the stack size range.
    #[must_use]
    pub fn with_count(mut self, min: u32, max: u32) -> Self {
        self.min_count = min.max(1);
        self.max_count = max.max(self.min_count);
        self
    }
}

/// A rolled item stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    /// Item id
    pub item_id: String,
    /// Stack size
    pub count: u32,
}

/// Weighted item drop distribution.
///
/// `nothing_weight` competes with the entries; rolling it yields no item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTable {
    /// Possible items
    #[serde(default)]
    pub entries: Vec<DropEntry>,
    /// Weight of dropping nothing
    #[serde(default)]
    pub nothing_weight: u32,
}

impl DropTable {
    /// Creates an empty table that never drops anything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with_entry(mut self, entry: DropEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sets the weight of rolling nothing.
    #[must_use]
    pub fn with_nothing(mut self, weight: u32) -> Self {
        self.nothing_weight = weight;
        self
    }

    /// Sum of all weights including nothing.
    #[must_use]
    pub fn total_weight(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| e.weight)
            .fold(self.nothing_weight, u32::saturating_add)
    }

    /// Rolls the table once.
    pub fn roll(&self, rng: &mut fastrand::Rng) -> Option<ItemDrop> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let mut pick = rng.u32(0..total);
        for entry in &self.entries {
            if pick < entry.weight {
                let count = if entry.max_count > entry.min_count {
                    rng.u32(entry.min_count..=entry.max_count)
                } else {
                    entry.min_count
                };
                return Some(ItemDrop {
                    item_id: entry.item_id.clone(),
                    count,
                });
            }
            pick -= entry.weight;
        }
        None
    }
}

/// Independent chance of dropping a random amount of gold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoldDrop {
    /// Probability in [0, 1]
    pub chance: f32,
    /// Minimum amount
    pub min: u32,
    /// Maximum amount (inclusive)
    pub max: u32,
}

impl Default for GoldDrop {
    fn default() -> Self {
        Self {
            chance: 0.5,
            min: 1,
            max: 5,
        }
    }
}

impl GoldDrop {
    /// Creates a gold roll.
    #[must_use]
    pub fn new(chance: f32, min: u32, max: u32) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            min,
            max: max.max(min),
        }
    }

    /// Never drops gold.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            chance: 0.0,
            min: 0,
            max: 0,
        }
    }

    /// Rolls the gold amount; zero means no drop.
    pub fn roll(&self, rng: &mut fastrand::Rng) -> u32 {
        if self.chance <= 0.0 || rng.f32() >= self.chance {
            return 0;
        }
        rng.u32(self.min..=self.max)
    }
}

/// Contents of a pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    /// An item stack
    Item(ItemDrop),
    /// Gold coins
    Gold(u32),
}

/// Loot lying on the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    /// Center position
    pub position: Vec2,
    /// What the player receives
    pub kind: PickupKind,
}

impl Pickup {
    /// Creates a pickup.
    #[must_use]
    pub fn new(position: Vec2, kind: PickupKind) -> Self {
        Self { position, kind }
    }

    /// Bounding box used for collection.
    #[must_use]
    pub fn rect(&self) -> Aabb {
        Aabb::from_center(self.position, PICKUP_SIZE * 0.5, PICKUP_SIZE * 0.5)
    }
}

/// Rolls both tables and scatters the results around `position`.
pub fn roll_loot(
    table: &DropTable,
    gold: &GoldDrop,
    position: Vec2,
    rng: &mut fastrand::Rng,
) -> Vec<Pickup> {
    let mut pickups = Vec::new();
    if let Some(item) = table.roll(rng) {
        pickups.push(Pickup::new(position, PickupKind::Item(item)));
    }
    let amount = gold.roll(rng);
    if amount > 0 {
        let jitter = Vec2::new(rng.f32() * 8.0 - 4.0, rng.f32() * 8.0 - 4.0);
        pickups.push(Pickup::new(position + jitter, PickupKind::Gold(amount)));
    }
    pickups
}
