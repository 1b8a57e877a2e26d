//! Demo dungeon used by the headless runner.
//!
//! Four rooms on a 2x2 grid: a quiet entrance, an enemy camp to the east, a
//! cellar to the south and the Forest Guardian's lair in the corner.

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::info;

use hollowmere_common::TileCoord;
use hollowmere_gameplay::drops::ItemDrop;
use hollowmere_gameplay::{
    BossKind, EnemyKind, GameContent, GameWorld, GridMap, PickupKind, RoomConfig, RoomCoord,
    RoomManager, SaveGame, TileMap,
};

use crate::config::SimConfig;

/// Map rows; `#` wall, `.` floor, `~` water, `^` hazard.
pub const DEMO_MAP: &[&str] = &[
    "################################",
    "#...............#..............#",
    "#...............#..............#",
    "#...............#.........^^...#",
    "#..............................#",
    "#..............................#",
    "#..............................#",
    "#...............#...#..........#",
    "#...~~..........#...#..........#",
    "#...............#..............#",
    "#...............#..............#",
    "######...#############...#######",
    "#...............#..............#",
    "#...............#..............#",
    "#...............#..............#",
    "#..............................#",
    "#..............................#",
    "#.........~~...................#",
    "#.........~.....#..............#",
    "#...............#..............#",
    "#...............#..............#",
    "################################",
];

/// Tile the player starts on.
pub const PLAYER_START: (i32, i32) = (4, 5);

/// Rooms that lock until cleared.
pub const COMBAT_ROOMS: [RoomCoord; 3] = [
    RoomCoord::new(1, 0),
    RoomCoord::new(0, 1),
    RoomCoord::new(1, 1),
];

const CAMP: &[(EnemyKind, (i32, i32))] = &[
    (EnemyKind::Slime, (22, 3)),
    (EnemyKind::Slime, (25, 6)),
    (EnemyKind::Slime, (28, 8)),
    (EnemyKind::Skeleton, (24, 4)),
    (EnemyKind::Bat, (27, 2)),
];

const CELLAR: &[(EnemyKind, (i32, i32))] = &[
    (EnemyKind::Slime, (5, 14)),
    (EnemyKind::Skeleton, (12, 15)),
    (EnemyKind::VineSnapper, (13, 19)),
];

const LAIR_BOSS: (BossKind, (i32, i32)) = (BossKind::ForestGuardian, (25, 16));

fn tile_center(tile: (i32, i32)) -> Vec2 {
    TileCoord::new(tile.0, tile.1).center()
}

/// Parses the demo map.
pub fn demo_map() -> Result<GridMap> {
    GridMap::from_rows(DEMO_MAP).context("demo map is malformed")
}

fn demo_rooms(map: &GridMap) -> RoomManager {
    let mut rooms = RoomManager::new(
        DEMO_MAP[0].len() as u32,
        DEMO_MAP.len() as u32,
        map.tile_size(),
        RoomConfig::default(),
    );
    for coord in COMBAT_ROOMS {
        rooms.set_combat(coord, true);
    }
    rooms
}

fn populate(world: &mut GameWorld) {
    for &(kind, tile) in CAMP.iter().chain(CELLAR) {
        world.spawn_enemy(kind, tile_center(tile));
    }
    let (boss, tile) = LAIR_BOSS;
    world.spawn_boss(boss, tile_center(tile));

    world.add_chest(
        "chest_entrance",
        tile_center((2, 2)),
        vec![
            PickupKind::Item(ItemDrop {
                item_id: "wood_sword".into(),
                count: 1,
            }),
            PickupKind::Gold(5),
        ],
    );
    world.add_chest(
        "chest_camp",
        tile_center((29, 9)),
        vec![PickupKind::Gold(12)],
    );
    world.add_chest(
        "chest_cellar",
        tile_center((2, 19)),
        vec![PickupKind::Item(ItemDrop {
            item_id: "potion".into(),
            count: 2,
        })],
    );
}

/// Builds a fresh demo session with the opening quests running.
pub fn build_world(config: &SimConfig, content: &GameContent) -> Result<GameWorld> {
    let map = demo_map()?;
    let rooms = demo_rooms(&map);
    let mut world = GameWorld::new(
        Box::new(map),
        content,
        config.tuning(),
        config.seed,
        tile_center(PLAYER_START),
    );
    world.set_rooms(rooms);
    populate(&mut world);

    world.enter_area("whisperwood");
    world.start_quest("elders_request");
    world.talk_to("elder");
    world.process_events();
    for quest in ["clear_the_woods", "slime_trouble", "treasure_trail"] {
        world.start_quest(quest);
    }

    info!(
        "Demo dungeon ready: {} enemies, {} bosses, {} chests",
        world.enemies().len(),
        world.bosses().len(),
        world.chests().len()
    );
    Ok(world)
}

/// Rebuilds the demo session from a save; enemies are respawned fresh.
pub fn restore_world(config: &SimConfig, content: &GameContent, save: &SaveGame) -> Result<GameWorld> {
    let map = demo_map()?;
    let rooms = demo_rooms(&map);
    let mut world = GameWorld::from_save(Box::new(map), content, config.tuning(), save);
    world.set_rooms(rooms);
    populate(&mut world);
    Ok(world)
}
