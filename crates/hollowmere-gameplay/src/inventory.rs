//! Inventory system.
//!
//! Item stacks keyed by item id plus four equipment slots. An equipped item
//! is taken out of its stack, so it is never counted twice.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Inventory error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Not enough items
    #[error("Not enough items: need {needed}, have {have}")]
    NotEnough {
        /// Amount needed
        needed: u32,
        /// Amount available
        have: u32,
    },
    /// Inventory full
    #[error("Inventory full: capacity {capacity}")]
    Full {
        /// Inventory capacity
        capacity: usize,
    },
    /// Item id has no definition
    #[error("Unknown item: {0}")]
    UnknownItem(String),
    /// Item cannot go in an equipment slot
    #[error("Item is not equippable: {0}")]
    NotEquippable(String),
    /// Item cannot be used up
    #[error("Item is not consumable: {0}")]
    NotConsumable(String),
    /// Item not found
    #[error("Item not found")]
    NotFound,
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Default number of distinct stacks.
pub const DEFAULT_CAPACITY: usize = 24;

/// Equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// Main hand
    Weapon,
    /// Off hand
    Shield,
    /// Finger
    Ring,
    /// Feet
    Boots,
}

impl EquipSlot {
    /// All slots.
    pub const ALL: [Self; 4] = [Self::Weapon, Self::Shield, Self::Ring, Self::Boots];
}

/// Item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Goes in an equipment slot
    Equipment(EquipSlot),
    /// Used up for an effect
    Consumable,
    /// Opens locked doors
    Key,
    /// Quest or crafting material
    Material,
}

/// Immutable item template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    /// Unique key
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Category
    pub kind: ItemKind,
    /// Stat bonuses while equipped, or effects when consumed
    #[serde(default)]
    pub stats: BTreeMap<String, i32>,
    /// Shop value in gold
    #[serde(default)]
    pub value: u32,
}

impl ItemDef {
    /// Creates an item with no stats.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            stats: BTreeMap::new(),
            value: 0,
        }
    }

    /// Adds a stat.
    #[must_use]
    pub fn with_stat(mut self, stat: impl Into<String>, amount: i32) -> Self {
        self.stats.insert(stat.into(), amount);
        self
    }

    /// Sets the shop value.
    #[must_use]
    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Slot this item equips into, if any.
    #[must_use]
    pub fn slot(&self) -> Option<EquipSlot> {
        match self.kind {
            ItemKind::Equipment(slot) => Some(slot),
            _ => None,
        }
    }

    /// A stat value, zero when absent.
    #[must_use]
    pub fn stat(&self, stat: &str) -> i32 {
        self.stats.get(stat).copied().unwrap_or(0)
    }
}

/// Shared lookup of item templates.
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    items: HashMap<String, Arc<ItemDef>>,
}

impl ItemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from definitions; later duplicates win.
    #[must_use]
    pub fn from_defs(defs: impl IntoIterator<Item = ItemDef>) -> Self {
        let mut registry = Self::new();
        for def in defs {
            registry.register(def);
        }
        registry
    }

    /// Adds a definition.
    pub fn register(&mut self, def: ItemDef) {
        self.items.insert(def.id.clone(), Arc::new(def));
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<ItemDef>> {
        self.items.get(id)
    }

    /// Whether an id is known.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Persisted inventory state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySaveData {
    /// Stack counts by item id
    pub items: BTreeMap<String, u32>,
    /// Equipped item ids by slot
    pub equipment: BTreeMap<EquipSlot, String>,
}

/// An inventory container.
#[derive(Debug, Clone)]
pub struct Inventory {
    registry: Arc<ItemRegistry>,
    /// Items and their quantities
    items: BTreeMap<String, u32>,
    /// Equipped item ids
    equipment: BTreeMap<EquipSlot, String>,
    /// Maximum unique item types
    capacity: usize,
}

impl Inventory {
    /// Creates a new inventory with the given capacity.
    #[must_use]
    pub fn new(registry: Arc<ItemRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            items: BTreeMap::new(),
            equipment: BTreeMap::new(),
            capacity,
        }
    }

    /// Item templates this inventory resolves against.
    #[must_use]
    pub fn registry(&self) -> &Arc<ItemRegistry> {
        &self.registry
    }

    /// Returns the number of unique item types.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the count of a specific item.
    #[must_use]
    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    /// Checks if the inventory contains at least the given amount.
    #[must_use]
    pub fn has(&self, item: &str, amount: u32) -> bool {
        self.count(item) >= amount
    }

    fn has_room_for(&self, item: &str) -> bool {
        self.items.contains_key(item) || self.items.len() < self.capacity
    }

    /// Adds items to the inventory.
    pub fn add(&mut self, item: &str, amount: u32) -> InventoryResult<()> {
        if !self.registry.contains(item) {
            return Err(InventoryError::UnknownItem(item.to_string()));
        }
        if amount == 0 {
            return Ok(());
        }
        if !self.has_room_for(item) {
            return Err(InventoryError::Full {
                capacity: self.capacity,
            });
        }
        let entry = self.items.entry(item.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    /// Removes items from the inventory.
    pub fn remove(&mut self, item: &str, amount: u32) -> InventoryResult<()> {
        let current = self.count(item);
        if current < amount {
            return Err(InventoryError::NotEnough {
                needed: amount,
                have: current,
            });
        }
        if current == amount {
            self.items.remove(item);
        } else {
            self.items.insert(item.to_string(), current - amount);
        }
        Ok(())
    }

    /// Returns an iterator over all stacks.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.items.iter().map(|(id, &count)| (id.as_str(), count))
    }

    /// Item equipped in a slot.
    #[must_use]
    pub fn equipped(&self, slot: EquipSlot) -> Option<&str> {
        self.equipment.get(&slot).map(String::as_str)
    }

    /// Moves one item from its stack into its slot.
    ///
    /// Whatever was in the slot goes back to its stack and is returned.
    pub fn equip(&mut self, item: &str) -> InventoryResult<Option<String>> {
        let def = self
            .registry
            .get(item)
            .ok_or_else(|| InventoryError::UnknownItem(item.to_string()))?;
        let slot = def
            .slot()
            .ok_or_else(|| InventoryError::NotEquippable(item.to_string()))?;
        if !self.has(item, 1) {
            return Err(InventoryError::NotFound);
        }
        let frees_stack = self.count(item) == 1;
        if let Some(previous) = self.equipment.get(&slot) {
            let fits = self.items.contains_key(previous)
                || frees_stack
                || self.items.len() < self.capacity;
            if !fits {
                return Err(InventoryError::Full {
                    capacity: self.capacity,
                });
            }
        }

        self.remove(item, 1)?;
        let previous = self.equipment.insert(slot, item.to_string());
        if let Some(prev) = &previous {
            let entry = self.items.entry(prev.clone()).or_insert(0);
            *entry += 1;
        }
        debug!("Equipped {} in {:?}", item, slot);
        Ok(previous)
    }

    /// Moves the item in a slot back to its stack.
    pub fn unequip(&mut self, slot: EquipSlot) -> InventoryResult<String> {
        let item = self
            .equipment
            .get(&slot)
            .cloned()
            .ok_or(InventoryError::NotFound)?;
        if !self.has_room_for(&item) {
            return Err(InventoryError::Full {
                capacity: self.capacity,
            });
        }
        self.equipment.remove(&slot);
        let entry = self.items.entry(item.clone()).or_insert(0);
        *entry += 1;
        Ok(item)
    }

    /// Sum of a stat across every equipped item.
    #[must_use]
    pub fn get_stat_bonus(&self, stat: &str) -> i32 {
        self.equipment
            .values()
            .filter_map(|id| self.registry.get(id))
            .map(|def| def.stat(stat))
            .sum()
    }

    /// Uses up one consumable and returns its definition.
    pub fn consume(&mut self, item: &str) -> InventoryResult<Arc<ItemDef>> {
        let def = self
            .registry
            .get(item)
            .cloned()
            .ok_or_else(|| InventoryError::UnknownItem(item.to_string()))?;
        if def.kind != ItemKind::Consumable {
            return Err(InventoryError::NotConsumable(item.to_string()));
        }
        self.remove(item, 1)?;
        Ok(def)
    }

    /// Snapshot of stacks and equipment.
    #[must_use]
    pub fn save_data(&self) -> InventorySaveData {
        InventorySaveData {
            items: self.items.clone(),
            equipment: self.equipment.clone(),
        }
    }

    /// Replaces contents from saved data.
    ///
    /// Ids without a definition are dropped. `None` leaves the inventory
    /// untouched.
    pub fn load_save_data(&mut self, data: Option<&InventorySaveData>) {
        let Some(data) = data else {
            return;
        };
        self.items.clear();
        self.equipment.clear();
        for (id, &count) in &data.items {
            if count == 0 {
                continue;
            }
            if let Err(err) = self.add(id, count) {
                warn!("Dropping saved stack {}: {}", id, err);
            }
        }
        for (&slot, id) in &data.equipment {
            match self.registry.get(id).and_then(|def| def.slot()) {
                Some(item_slot) if item_slot == slot => {
                    self.equipment.insert(slot, id.clone());
                },
                _ => warn!("Dropping saved equipment {} in {:?}", id, slot),
            }
        }
    }
}
