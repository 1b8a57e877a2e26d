//! Alert state machine driving every chasing enemy.
//!
//! ```text
//!   Idle ──sight in range──▶ Suspicious ──timer──▶ Alert ──lost──▶ Lost
//!    ▲                          │                    ▲              │
//!    └────────evaded────────────┘                    └──re-sight────┤
//!    ▲                                                              │
//!    └────────────────────────────timer─────────────────────────────┘
//! ```
//!
//! [`AlertBehavior`] is a component owned by an enemy. Each tick the owner
//! hands it its own center, the player's center and the map; it answers with
//! an optional [`MovementIntent`]. Attack add-ons (telegraphs, lunges) sit on
//! top and may discard that intent.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::seek;
use crate::perception::{find_path, has_line_of_sight, PathfindBudget};
use crate::physics::TileMap;

/// Pursuit intensity of a chasing enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlertState {
    /// No target
    #[default]
    Idle,
    /// Noticed the player, reaction window running
    Suspicious,
    /// Full pursuit
    Alert,
    /// Lost track, searching the last known position
    Lost,
}

impl AlertState {
    /// Glyph shown above the enemy while the icon timer runs.
    #[must_use]
    pub fn indicator(self) -> &'static str {
        match self {
            AlertState::Idle => "",
            AlertState::Suspicious => "?",
            AlertState::Alert => "!",
            AlertState::Lost => "...",
        }
    }
}

/// Tuning for one enemy's alert behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Radius within which the player can be noticed
    pub detection_range: f32,
    /// Radius beyond which an alerted enemy gives up (larger than detection)
    pub lose_range: f32,
    /// Reaction window before escalating to Alert
    pub suspicious_duration: f32,
    /// How long to search after losing the player
    pub lost_duration: f32,
    /// Walking speed (Lost); Suspicious approaches at half this
    pub base_speed: f32,
    /// Pursuit speed while Alert
    pub chase_speed: f32,
    /// Seconds between path recomputations while Alert
    pub pathfind_interval: f32,
    /// Path cost cap handed to the path search
    pub max_path_distance: u32,
    /// Penalize hazard tiles when searching
    pub avoid_hazards: bool,
    /// Lifetime of the state icon shown on entry
    pub icon_duration: f32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            detection_range: 150.0,
            lose_range: 260.0,
            suspicious_duration: 0.6,
            lost_duration: 3.0,
            base_speed: 50.0,
            chase_speed: 80.0,
            pathfind_interval: 0.5,
            max_path_distance: 40,
            avoid_hazards: true,
            icon_duration: 1.0,
        }
    }
}

/// Where an enemy wants to go this tick and how fast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementIntent {
    /// World-space point to move towards
    pub target: Vec2,
    /// Speed in pixels per second
    pub speed: f32,
}

impl MovementIntent {
    /// Creates a new intent.
    #[must_use]
    pub const fn new(target: Vec2, speed: f32) -> Self {
        Self { target, speed }
    }

    /// Velocity that realizes this intent from `from`.
    #[must_use]
    pub fn velocity_from(&self, from: Vec2) -> Vec2 {
        seek(from, self.target, self.speed)
    }
}

/// Alert state machine component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertBehavior {
    config: AlertConfig,
    state: AlertState,
    state_timer: f32,
    icon_timer: f32,
    last_known: Option<Vec2>,
    path: Vec<Vec2>,
    path_index: usize,
    path_cooldown: f32,
    group_offset: Vec2,
}

impl AlertBehavior {
    /// Creates an idle behavior.
    #[must_use]
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            state: AlertState::Idle,
            state_timer: 0.0,
            icon_timer: 0.0,
            last_known: None,
            path: Vec::new(),
            path_index: 0,
            path_cooldown: 0.0,
            group_offset: Vec2::ZERO,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AlertState {
        self.state
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Last position the player was seen at; `None` while Idle.
    #[must_use]
    pub const fn last_known(&self) -> Option<Vec2> {
        self.last_known
    }

    /// Remaining time of the current state's countdown.
    #[must_use]
    pub const fn state_timer(&self) -> f32 {
        self.state_timer
    }

    /// Cached waypoints and the index of the one being followed.
    #[must_use]
    pub fn path(&self) -> (&[Vec2], usize) {
        (&self.path, self.path_index)
    }

    /// Flank offset currently applied.
    #[must_use]
    pub const fn group_offset(&self) -> Vec2 {
        self.group_offset
    }

    /// Sets the flank offset; ignored unless Alert.
    pub fn set_group_offset(&mut self, offset: Vec2) {
        self.group_offset = if self.state == AlertState::Alert {
            offset
        } else {
            Vec2::ZERO
        };
    }

    /// State icon and its fade alpha, while the icon timer runs.
    #[must_use]
    pub fn icon(&self) -> Option<(&'static str, f32)> {
        if self.icon_timer <= 0.0 || self.state == AlertState::Idle {
            return None;
        }
        let alpha = (self.icon_timer / self.config.icon_duration.max(f32::EPSILON)).min(1.0);
        Some((self.state.indicator(), alpha))
    }

    /// Jumps straight to Alert, e.g. when struck by the player.
    pub fn provoke(&mut self, player_pos: Vec2) {
        self.last_known = Some(player_pos);
        if self.state != AlertState::Alert {
            self.enter(AlertState::Alert);
        }
    }

    /// Forgets the player entirely.
    pub fn reset(&mut self) {
        self.enter(AlertState::Idle);
    }

    /// Advances the state machine one tick.
    ///
    /// Transitions are evaluated first, then the movement of the resulting
    /// state is returned.
    pub fn update(
        &mut self,
        dt: f32,
        self_pos: Vec2,
        player_pos: Vec2,
        map: &dyn TileMap,
        budget: &mut PathfindBudget,
    ) -> Option<MovementIntent> {
        self.icon_timer = (self.icon_timer - dt).max(0.0);

        let distance = self_pos.distance(player_pos);
        // Nothing beyond the lose radius can change state, so skip the raycast.
        let sight =
            distance <= self.config.lose_range && has_line_of_sight(map, self_pos, player_pos);

        self.transition(dt, distance, sight, player_pos);

        match self.state {
            AlertState::Idle => None,
            AlertState::Suspicious => self
                .last_known
                .map(|target| MovementIntent::new(target, self.config.base_speed * 0.5)),
            AlertState::Alert => Some(self.chase(dt, self_pos, player_pos, map, budget)),
            AlertState::Lost => self
                .last_known
                .map(|target| MovementIntent::new(target, self.config.base_speed)),
        }
    }

    fn transition(&mut self, dt: f32, distance: f32, sight: bool, player_pos: Vec2) {
        let cfg = self.config;
        match self.state {
            AlertState::Idle => {
                if distance < cfg.detection_range && sight {
                    self.last_known = Some(player_pos);
                    self.enter(AlertState::Suspicious);
                }
            },
            AlertState::Suspicious => {
                self.state_timer -= dt;
                if self.state_timer <= 0.0 {
                    if sight {
                        self.last_known = Some(player_pos);
                    }
                    self.enter(AlertState::Alert);
                } else if distance > cfg.detection_range || !sight {
                    self.enter(AlertState::Idle);
                } else {
                    self.last_known = Some(player_pos);
                }
            },
            AlertState::Alert => {
                if sight {
                    self.last_known = Some(player_pos);
                }
                if distance > cfg.lose_range || (!sight && distance > cfg.detection_range) {
                    self.enter(AlertState::Lost);
                }
            },
            AlertState::Lost => {
                self.state_timer -= dt;
                if sight && distance < cfg.detection_range {
                    self.last_known = Some(player_pos);
                    self.enter(AlertState::Alert);
                } else if self.state_timer <= 0.0 {
                    self.enter(AlertState::Idle);
                }
            },
        }
    }

    fn enter(&mut self, state: AlertState) {
        debug!("Alert state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.path.clear();
        self.path_index = 0;
        match state {
            AlertState::Idle => {
                self.state_timer = 0.0;
                self.last_known = None;
                self.group_offset = Vec2::ZERO;
            },
            AlertState::Suspicious => {
                self.state_timer = self.config.suspicious_duration;
                self.icon_timer = self.config.icon_duration;
            },
            AlertState::Alert => {
                self.state_timer = 0.0;
                self.path_cooldown = 0.0;
                self.icon_timer = self.config.icon_duration;
            },
            AlertState::Lost => {
                self.state_timer = self.config.lost_duration;
                self.group_offset = Vec2::ZERO;
                self.icon_timer = self.config.icon_duration;
            },
        }
    }

    fn chase(
        &mut self,
        dt: f32,
        self_pos: Vec2,
        player_pos: Vec2,
        map: &dyn TileMap,
        budget: &mut PathfindBudget,
    ) -> MovementIntent {
        let speed = self.config.chase_speed;
        let mut goal = player_pos + self.group_offset;
        if map.is_solid_at(goal) {
            goal = player_pos;
        }

        self.path_cooldown -= dt;
        if self.path_cooldown <= 0.0 && budget.consume() {
            self.path = find_path(
                map,
                self_pos,
                goal,
                self.config.max_path_distance,
                self.config.avoid_hazards,
            );
            self.path_index = 0;
            self.path_cooldown = self.config.pathfind_interval;
        }

        let arrive_radius = map.tile_size() * 0.5;
        while let Some(&waypoint) = self.path.get(self.path_index) {
            if self_pos.distance(waypoint) < arrive_radius {
                self.path_index += 1;
            } else {
                return MovementIntent::new(waypoint, speed);
            }
        }

        MovementIntent::new(goal, speed)
    }
}

/// Evenly spaced flank offsets around the player for `count` alerted enemies.
///
/// Fewer than two enemies get no offset.
#[must_use]
pub fn flank_offsets(count: usize, spread: f32) -> Vec<Vec2> {
    if count < 2 {
        return vec![Vec2::ZERO; count];
    }
    (0..count)
        .map(|i| Vec2::from_angle(TAU * i as f32 / count as f32) * spread)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{GridMap, TileKind};
    use hollowmere_common::TileCoord;

    const DT: f32 = 1.0 / 60.0;

    fn open_map() -> GridMap {
        GridMap::walled(40, 20)
    }

    fn behavior() -> AlertBehavior {
        AlertBehavior::new(AlertConfig {
            detection_range: 150.0,
            lose_range: 260.0,
            suspicious_duration: 0.5,
            lost_duration: 1.0,
            ..AlertConfig::default()
        })
    }

    #[test]
    fn test_idle_to_suspicious_within_one_tick() {
        let map = open_map();
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = Vec2::new(100.0, 100.0);
        let player = Vec2::new(200.0, 100.0);

        let intent = ai.update(DT, me, player, &map, &mut budget);
        assert_eq!(ai.state(), AlertState::Suspicious);
        assert_eq!(ai.last_known(), Some(player));
        let intent = intent.map(|i| i.speed).unwrap_or_default();
        assert!((intent - 25.0).abs() < f32::EPSILON);
        assert!(ai.icon().is_some());
    }

    #[test]
    fn test_idle_stays_idle_out_of_range() {
        let map = open_map();
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let intent = ai.update(
            DT,
            Vec2::new(40.0, 100.0),
            Vec2::new(400.0, 100.0),
            &map,
            &mut budget,
        );
        assert!(intent.is_none());
        assert_eq!(ai.state(), AlertState::Idle);
        assert!(ai.icon().is_none());
    }

    #[test]
    fn test_idle_needs_line_of_sight() {
        let mut map = open_map();
        for row in 0..20 {
            map.set_tile(10, row, TileKind::Wall);
        }
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        ai.update(
            DT,
            Vec2::new(120.0, 100.0),
            Vec2::new(200.0, 100.0),
            &map,
            &mut budget,
        );
        assert_eq!(ai.state(), AlertState::Idle);
    }

    #[test]
    fn test_suspicious_evaded_returns_to_idle() {
        let mut map = open_map();
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = Vec2::new(100.0, 100.0);
        ai.update(DT, me, Vec2::new(200.0, 100.0), &map, &mut budget);
        assert_eq!(ai.state(), AlertState::Suspicious);

        // Wall goes up and the player slips away before the window closes.
        for row in 0..20 {
            map.set_tile(15, row, TileKind::Wall);
        }
        ai.update(DT, me, Vec2::new(300.0, 100.0), &map, &mut budget);
        assert_eq!(ai.state(), AlertState::Idle);
        assert_eq!(ai.last_known(), None);
    }

    #[test]
    fn test_suspicious_escalates_at_expiry() {
        let map = open_map();
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = Vec2::new(100.0, 100.0);
        let player = Vec2::new(200.0, 100.0);
        ai.update(DT, me, player, &map, &mut budget);

        for _ in 0..40 {
            ai.update(DT, me, player, &map, &mut budget);
        }
        assert_eq!(ai.state(), AlertState::Alert);
    }

    #[test]
    fn test_alert_lost_when_player_outruns() {
        let map = open_map();
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = Vec2::new(100.0, 100.0);
        ai.provoke(Vec2::new(150.0, 100.0));
        assert_eq!(ai.state(), AlertState::Alert);

        ai.update(DT, me, Vec2::new(500.0, 100.0), &map, &mut budget);
        assert_eq!(ai.state(), AlertState::Lost);
        // Last known freezes at the last sighting
        assert_eq!(ai.last_known(), Some(Vec2::new(150.0, 100.0)));
    }

    #[test]
    fn test_lost_times_out_to_idle() {
        let map = open_map();
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = Vec2::new(100.0, 100.0);
        let far = Vec2::new(560.0, 100.0);
        ai.provoke(Vec2::new(150.0, 100.0));
        ai.update(DT, me, far, &map, &mut budget);
        assert_eq!(ai.state(), AlertState::Lost);
        assert_eq!(ai.last_known(), Some(Vec2::new(150.0, 100.0)));

        for _ in 0..70 {
            ai.update(DT, me, far, &map, &mut budget);
        }
        assert_eq!(ai.state(), AlertState::Idle);
    }

    #[test]
    fn test_lost_reacquires_on_sight() {
        let map = open_map();
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = Vec2::new(100.0, 100.0);
        ai.provoke(Vec2::new(150.0, 100.0));
        ai.update(DT, me, Vec2::new(560.0, 100.0), &map, &mut budget);
        assert_eq!(ai.state(), AlertState::Lost);

        let back = Vec2::new(180.0, 120.0);
        ai.update(DT, me, back, &map, &mut budget);
        assert_eq!(ai.state(), AlertState::Alert);
        assert_eq!(ai.last_known(), Some(back));
    }

    #[test]
    fn test_alert_follows_path_around_wall() {
        let mut map = open_map();
        for row in 0..15 {
            map.set_tile(10, row, TileKind::Wall);
        }
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = TileCoord::new(8, 5).center();
        let player = TileCoord::new(12, 5).center();
        ai.provoke(player);

        let intent = ai.update(DT, me, player, &map, &mut budget);
        assert_eq!(budget.used(), 1);
        let (path, _) = ai.path();
        assert!(!path.is_empty());
        // First waypoint steps away from the wall, not straight at the player
        let target = intent.map(|i| i.target).unwrap_or(player);
        assert_ne!(target, player);
    }

    #[test]
    fn test_alert_falls_back_to_direct_chase_without_budget() {
        let map = open_map();
        let mut budget = PathfindBudget::disabled();
        let mut ai = behavior();
        let me = Vec2::new(100.0, 100.0);
        let player = Vec2::new(180.0, 100.0);
        ai.provoke(player);
        ai.set_group_offset(Vec2::new(0.0, 24.0));

        let intent = ai.update(DT, me, player, &map, &mut budget);
        assert_eq!(
            intent,
            Some(MovementIntent::new(player + Vec2::new(0.0, 24.0), 80.0))
        );
    }

    #[test]
    fn test_path_leads_to_flank_position() {
        let mut map = open_map();
        for row in 0..15 {
            map.set_tile(10, row, TileKind::Wall);
        }
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = TileCoord::new(8, 5).center();
        let player = TileCoord::new(14, 5).center();
        ai.provoke(player);
        ai.set_group_offset(Vec2::new(0.0, 48.0));

        ai.update(DT, me, player, &map, &mut budget);
        let (path, _) = ai.path();
        let last = path.last().copied().unwrap_or(player);
        assert_eq!(last, TileCoord::new(14, 8).center());
    }

    #[test]
    fn test_flank_position_inside_wall_falls_back_to_player() {
        let mut map = open_map();
        map.set_tile(14, 8, TileKind::Wall);
        let mut budget = PathfindBudget::new(4);
        let mut ai = behavior();
        let me = TileCoord::new(8, 5).center();
        let player = TileCoord::new(14, 5).center();
        ai.provoke(player);
        ai.set_group_offset(Vec2::new(0.0, 48.0));

        ai.update(DT, me, player, &map, &mut budget);
        let (path, _) = ai.path();
        assert_eq!(path.last().copied(), Some(player));
    }

    #[test]
    fn test_group_offset_ignored_unless_alert() {
        let mut ai = behavior();
        ai.set_group_offset(Vec2::new(10.0, 0.0));
        assert_eq!(ai.group_offset(), Vec2::ZERO);
    }

    #[test]
    fn test_flank_offsets() {
        assert!(flank_offsets(0, 24.0).is_empty());
        assert_eq!(flank_offsets(1, 24.0), vec![Vec2::ZERO]);

        let offsets = flank_offsets(4, 24.0);
        assert_eq!(offsets.len(), 4);
        for offset in &offsets {
            assert!((offset.length() - 24.0).abs() < 1e-3);
        }
        let sum: Vec2 = offsets.iter().copied().sum();
        assert!(sum.length() < 1e-3);
    }
}
