//! Procedural practice map served by the offline shard.

use cr_sim::Position;
use cr_utils::{
    LandCell, LandTileFlags, MAP_BLOCK_SIZE, MapBlock, MobileUpdate, StaticTile, StaticTileFlags,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEMO_SEED: u64 = 0x5eed_2024;
/// Side length of the map in blocks.
pub const WORLD_BLOCKS: u16 = 8;
pub const SPAWN: Position = Position::new(32, 32, 0);

const WORLD_TILES: u16 = WORLD_BLOCKS * MAP_BLOCK_SIZE;

const GRASS: [u16; 4] = [0x0003, 0x0004, 0x0005, 0x0006];
const WATER: u16 = 0x00A8;
const STONE_WALL: u16 = 0x0080;
const WOODEN_DOOR: u16 = 0x0675;
const BRIDGE_PLANK: u16 = 0x051D;
const TREE: u16 = 0x0CCA;

const HILL_CENTER: (i32, i32) = (44, 20);
const HILL_RADIUS: i32 = 8;
const WALL_X: u16 = 20;
const DOOR_Y: u16 = 24;
const RIVER_Y: std::ops::RangeInclusive<u16> = 50..=52;
const BRIDGE_X: std::ops::RangeInclusive<u16> = 30..=31;
const TREE_COUNT: usize = 40;

struct Builder {
    blocks: Vec<MapBlock>,
}

impl Builder {
    fn block_index(x: u16, y: u16) -> usize {
        (y / MAP_BLOCK_SIZE * WORLD_BLOCKS + x / MAP_BLOCK_SIZE) as usize
    }

    fn land_mut(&mut self, x: u16, y: u16) -> Option<&mut LandCell> {
        self.blocks
            .get_mut(Self::block_index(x, y))?
            .cell_mut(x % MAP_BLOCK_SIZE, y % MAP_BLOCK_SIZE)
    }

    fn add_static(&mut self, x: u16, y: u16, graphic: u16, z: i8, height: u8, flags: StaticTileFlags) {
        if let Some(block) = self.blocks.get_mut(Self::block_index(x, y)) {
            block.statics.push(StaticTile {
                graphic,
                x: (x % MAP_BLOCK_SIZE) as u8,
                y: (y % MAP_BLOCK_SIZE) as u8,
                z,
                height,
                flags,
            });
        }
    }
}

fn hill_z(x: u16, y: u16) -> Option<i8> {
    let dx = x as i32 - HILL_CENTER.0;
    let dy = y as i32 - HILL_CENTER.1;
    let distance = dx.abs().max(dy.abs());
    (distance < HILL_RADIUS).then(|| ((HILL_RADIUS - distance) * 3) as i8)
}

fn is_reserved(x: u16, y: u16) -> bool {
    let near_spawn = x.abs_diff(SPAWN.x) <= 4 && y.abs_diff(SPAWN.y) <= 4;
    near_spawn
        || x == WALL_X
        || RIVER_Y.contains(&y)
        || BRIDGE_X.contains(&x)
        || hill_z(x, y).is_some()
}

/// Grass with a sloped hill, a walled-off strip with one door, a river
/// crossed by a bridge and scattered trees. Same seed, same map.
pub fn generate(seed: u64) -> Vec<MapBlock> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = Builder {
        blocks: Vec::with_capacity((WORLD_BLOCKS * WORLD_BLOCKS) as usize),
    };
    for by in 0..WORLD_BLOCKS {
        for bx in 0..WORLD_BLOCKS {
            builder.blocks.push(MapBlock::flat(bx, by, LandCell::default()));
        }
    }

    for y in 0..WORLD_TILES {
        for x in 0..WORLD_TILES {
            let graphic = GRASS[rng.gen_range(0..GRASS.len())];
            let cell = if RIVER_Y.contains(&y) {
                LandCell {
                    graphic: WATER,
                    z: -5,
                    flags: LandTileFlags {
                        impassable: true,
                        wet: true,
                        ..Default::default()
                    },
                }
            } else {
                // Tiles whose corners touch the hill slope down to the plain.
                let near_hill = [(0, 0), (1, 0), (0, 1), (1, 1)]
                    .iter()
                    .any(|&(dx, dy)| hill_z(x + dx, y + dy).is_some());
                LandCell {
                    graphic,
                    z: hill_z(x, y).unwrap_or(0),
                    flags: LandTileFlags {
                        stretchable: near_hill,
                        ..Default::default()
                    },
                }
            };
            if let Some(land) = builder.land_mut(x, y) {
                *land = cell;
            }
        }
    }

    let wall = StaticTileFlags {
        impassable: true,
        ..Default::default()
    };
    for y in 8..=40 {
        if y == DOOR_Y {
            let door = StaticTileFlags {
                impassable: true,
                door: true,
                ..Default::default()
            };
            builder.add_static(WALL_X, y, WOODEN_DOOR, 0, 20, door);
        } else {
            builder.add_static(WALL_X, y, STONE_WALL, 0, 20, wall);
        }
    }

    let plank = StaticTileFlags {
        surface: true,
        ..Default::default()
    };
    for y in RIVER_Y.start() - 1..=RIVER_Y.end() + 1 {
        for x in BRIDGE_X {
            builder.add_static(x, y, BRIDGE_PLANK, 0, 0, plank);
        }
    }

    let mut planted = 0;
    while planted < TREE_COUNT {
        let x = rng.gen_range(0..WORLD_TILES);
        let y = rng.gen_range(0..WORLD_TILES);
        if is_reserved(x, y) {
            continue;
        }
        builder.add_static(x, y, TREE, 0, 20, wall);
        planted += 1;
    }

    builder.blocks
}

/// Two bystanders near the spawn point, one of them a corpse.
pub fn demo_mobiles() -> Vec<MobileUpdate> {
    vec![
        MobileUpdate {
            serial: 0x0000_1001,
            x: SPAWN.x + 3,
            y: SPAWN.y,
            z: 0,
            dead: false,
            ignore_mobiles: false,
        },
        MobileUpdate {
            serial: 0x0000_1002,
            x: SPAWN.x - 3,
            y: SPAWN.y,
            z: 0,
            dead: true,
            ignore_mobiles: false,
        },
    ]
}
