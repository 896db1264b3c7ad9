use std::collections::HashMap;

use bevy::prelude::Resource;
use cr_utils::{
    LandCell, LandTileFlags, MAP_BLOCK_CELLS, MAP_BLOCK_SIZE, MapBlock, MobileUpdate,
    StaticTileFlags,
};
use tracing::warn;

use crate::types::StepState;

/// Height every standing mobile occupies.
pub const CHARACTER_HEIGHT: i32 = 16;

/// Corner elevations of a sloped land tile, in render units (4 per z step).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CornerOffsets {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl CornerOffsets {
    fn corner_z(&self, corner: i32, real_z: i32) -> i32 {
        match corner {
            1 => self.right >> 2,
            2 => self.bottom >> 2,
            3 => self.left >> 2,
            _ => real_z,
        }
    }

    /// Height of the tile edge facing `direction`. Diagonals take the corner
    /// itself, cardinals the mean of the two corners bounding the edge.
    pub fn edge_z(&self, direction: cr_utils::Direction, real_z: i32) -> i32 {
        let dir = direction.index() as i32;
        let edge = self.corner_z(((dir >> 1) + 1) & 3, real_z);
        if dir & 1 != 0 {
            return edge;
        }
        (edge + self.corner_z(dir >> 1, real_z)) >> 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stretch {
    pub min_z: i32,
    pub avg_z: i32,
    pub offsets: CornerOffsets,
}

impl Stretch {
    pub fn from_corners(top: i8, right: i8, bottom: i8, left: i8) -> Self {
        let (t, r, b, l) = (top as i32, right as i32, bottom as i32, left as i32);
        // Split along the flatter diagonal.
        let avg_z = if (t - b).abs() <= (l - r).abs() {
            (t + b) >> 1
        } else {
            (l + r) >> 1
        };
        Self {
            min_z: t.min(r).min(b).min(l),
            avg_z,
            offsets: CornerOffsets {
                top: t * 4,
                right: r * 4,
                bottom: b * 4,
                left: l * 4,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LandOccupant {
    pub graphic: u16,
    pub z: i8,
    pub flags: LandTileFlags,
    pub stretch: Option<Stretch>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticOccupant {
    pub graphic: u16,
    pub z: i8,
    pub height: u8,
    pub flags: StaticTileFlags,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MobileOccupant {
    pub serial: u32,
    pub z: i8,
    pub dead: bool,
    pub ignore_mobiles: bool,
}

/// Anything standing on a tile that can carry or block a walker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupant {
    Land(LandOccupant),
    Static(StaticOccupant),
    Mobile(MobileOccupant),
}

/// Point queries against streamed terrain.
pub trait TerrainOracle {
    /// Appends the occupants of tile (`x`, `y`) to `out`, land first.
    /// Returns `false` when nothing is known about the tile.
    fn occupants_at(&self, x: i32, y: i32, out: &mut Vec<Occupant>) -> bool;
}

/// Land graphics that never take part in movement (void and "no draw" tiles).
pub fn is_void_land(graphic: u16) -> bool {
    !((graphic < 0x01AE && graphic != 0x0002) || (graphic > 0x01B5 && graphic != 0x01DB))
}

/// Energy fields and similar items that never block.
fn is_field_graphic(graphic: u16) -> bool {
    (0x3946..=0x3964).contains(&graphic) || graphic == 0x0082
}

/// Statics a ghost or game master walks through.
fn is_ghost_passable(graphic: u16) -> bool {
    matches!(graphic, 0x0692 | 0x06F5 | 0x06F6 | 0x0846 | 0x0873)
}

/// One occupant reduced to what the height walk needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainSample {
    pub impassable_or_surface: bool,
    pub surface: bool,
    pub bridge: bool,
    pub no_diagonal: bool,
    pub z: i32,
    pub avg_z: i32,
    pub height: i32,
    pub stretched: Option<CornerOffsets>,
    pub real_z: i32,
}

impl TerrainSample {
    pub const CEILING_Z: i32 = 128;

    /// Sentinel closing the height walk.
    pub fn ceiling() -> Self {
        Self {
            impassable_or_surface: true,
            surface: false,
            bridge: false,
            no_diagonal: false,
            z: Self::CEILING_Z,
            avg_z: Self::CEILING_Z,
            height: Self::CEILING_Z,
            stretched: None,
            real_z: Self::CEILING_Z,
        }
    }

    pub fn from_occupant(occupant: &Occupant, state: StepState) -> Option<Self> {
        match occupant {
            Occupant::Land(land) => Self::from_land(land, state),
            Occupant::Static(item) => Self::from_static(item, state),
            Occupant::Mobile(mobile) => Self::from_mobile(mobile, state),
        }
    }

    fn from_land(land: &LandOccupant, state: StepState) -> Option<Self> {
        if is_void_land(land.graphic) {
            return None;
        }

        let (walkable, no_diagonal) = if state == StepState::OnSeaHorse {
            (land.flags.wet, false)
        } else {
            (
                !land.flags.impassable,
                state == StepState::Flying && land.flags.no_diagonal,
            )
        };

        let real_z = land.z as i32;
        let (z, avg_z) = match land.stretch {
            Some(stretch) => (stretch.min_z, stretch.avg_z),
            None => (real_z, real_z),
        };

        Some(Self {
            impassable_or_surface: true,
            surface: walkable,
            bridge: walkable,
            no_diagonal,
            z,
            avg_z,
            height: avg_z - z,
            stretched: land.stretch.map(|s| s.offsets),
            real_z,
        })
    }

    fn from_static(item: &StaticOccupant, state: StepState) -> Option<Self> {
        let flags = item.flags;
        let mut sample = Self {
            impassable_or_surface: false,
            surface: false,
            bridge: false,
            no_diagonal: false,
            z: item.z as i32,
            avg_z: 0,
            height: item.height as i32,
            stretched: None,
            real_z: item.z as i32,
        };

        if state == StepState::OnSeaHorse {
            if flags.wet {
                sample.surface = true;
                sample.bridge = true;
            }
        } else {
            sample.impassable_or_surface = flags.impassable || flags.surface;
            if !flags.impassable {
                sample.surface = flags.surface;
                sample.bridge = flags.bridge;
            }

            let drop_blocking = is_field_graphic(item.graphic)
                || (state == StepState::DeadOrGm
                    && (flags.door || is_ghost_passable(item.graphic)));
            if drop_blocking {
                sample.impassable_or_surface = false;
            }

            sample.no_diagonal = state == StepState::Flying && flags.no_diagonal;
        }

        if !(sample.impassable_or_surface || sample.surface || sample.bridge || sample.no_diagonal)
        {
            return None;
        }

        // Bridges (stairs, ramps) are walked on at half their height.
        let stand_height = if flags.bridge {
            sample.height / 2
        } else {
            sample.height
        };
        sample.avg_z = sample.z + stand_height;
        Some(sample)
    }

    fn from_mobile(mobile: &MobileOccupant, state: StepState) -> Option<Self> {
        if mobile.dead || mobile.ignore_mobiles || state == StepState::DeadOrGm {
            return None;
        }
        let z = mobile.z as i32;
        Some(Self {
            impassable_or_surface: true,
            surface: false,
            bridge: false,
            no_diagonal: false,
            z,
            avg_z: z + CHARACTER_HEIGHT,
            height: CHARACTER_HEIGHT,
            stretched: None,
            real_z: z,
        })
    }
}

/// Streamed map blocks and mobile positions, indexed by tile.
#[derive(Resource, Default)]
pub struct TileMap {
    blocks: HashMap<(u16, u16), MapBlock>,
    mobiles: HashMap<u32, MobileUpdate>,
    mobile_tiles: HashMap<(u16, u16), Vec<u32>>,
}

impl TileMap {
    pub fn update_block(&mut self, block: MapBlock) -> bool {
        if block.cells.len() != MAP_BLOCK_CELLS {
            warn!(
                x = block.x,
                y = block.y,
                cells = block.cells.len(),
                "dropping malformed map block"
            );
            return false;
        }
        self.blocks.insert((block.x, block.y), block);
        true
    }

    pub fn unload_block(&mut self, x: u16, y: u16) -> bool {
        self.blocks.remove(&(x, y)).is_some()
    }

    pub fn has_block(&self, x: u16, y: u16) -> bool {
        self.blocks.contains_key(&(x, y))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn block_for(&self, x: i32, y: i32) -> Option<(&MapBlock, usize, usize)> {
        let x = u16::try_from(x).ok()?;
        let y = u16::try_from(y).ok()?;
        let block = self
            .blocks
            .get(&(x / MAP_BLOCK_SIZE, y / MAP_BLOCK_SIZE))?;
        Some((
            block,
            (x % MAP_BLOCK_SIZE) as usize,
            (y % MAP_BLOCK_SIZE) as usize,
        ))
    }

    pub fn land_at(&self, x: i32, y: i32) -> Option<&LandCell> {
        let (block, lx, ly) = self.block_for(x, y)?;
        block.cells.get(ly * MAP_BLOCK_SIZE as usize + lx)
    }

    /// Slope of the land tile at (`x`, `y`), using its east, south and
    /// south-east neighbours as the right, left and bottom corners.
    /// Corners in blocks that are not loaded count as flat.
    pub fn stretch_at(&self, x: i32, y: i32) -> Option<Stretch> {
        let cell = self.land_at(x, y)?;
        if !cell.flags.stretchable {
            return None;
        }
        let corner = |cx: i32, cy: i32| self.land_at(cx, cy).map_or(cell.z, |c| c.z);
        let top = cell.z;
        let right = corner(x + 1, y);
        let left = corner(x, y + 1);
        let bottom = corner(x + 1, y + 1);
        if right == top && left == top && bottom == top {
            return None;
        }
        Some(Stretch::from_corners(top, right, bottom, left))
    }

    pub fn update_mobile(&mut self, update: MobileUpdate) {
        self.remove_mobile(update.serial);
        self.mobile_tiles
            .entry((update.x, update.y))
            .or_default()
            .push(update.serial);
        self.mobiles.insert(update.serial, update);
    }

    pub fn remove_mobile(&mut self, serial: u32) -> bool {
        let Some(old) = self.mobiles.remove(&serial) else {
            return false;
        };
        if let Some(serials) = self.mobile_tiles.get_mut(&(old.x, old.y)) {
            serials.retain(|s| *s != serial);
            if serials.is_empty() {
                self.mobile_tiles.remove(&(old.x, old.y));
            }
        }
        true
    }
}

impl TerrainOracle for TileMap {
    fn occupants_at(&self, x: i32, y: i32, out: &mut Vec<Occupant>) -> bool {
        let Some((block, lx, ly)) = self.block_for(x, y) else {
            return false;
        };
        let Some(cell) = block.cells.get(ly * MAP_BLOCK_SIZE as usize + lx) else {
            return false;
        };

        out.push(Occupant::Land(LandOccupant {
            graphic: cell.graphic,
            z: cell.z,
            flags: cell.flags,
            stretch: self.stretch_at(x, y),
        }));

        out.extend(
            block
                .statics
                .iter()
                .filter(|s| s.x as usize == lx && s.y as usize == ly)
                .map(|s| {
                    Occupant::Static(StaticOccupant {
                        graphic: s.graphic,
                        z: s.z,
                        height: s.height,
                        flags: s.flags,
                    })
                }),
        );

        if let Some(serials) = self.mobile_tiles.get(&(x as u16, y as u16)) {
            out.extend(serials.iter().filter_map(|serial| {
                self.mobiles.get(serial).map(|m| {
                    Occupant::Mobile(MobileOccupant {
                        serial: m.serial,
                        z: m.z,
                        dead: m.dead,
                        ignore_mobiles: m.ignore_mobiles,
                    })
                })
            }));
        }

        true
    }
}
