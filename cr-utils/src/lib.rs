use bevy::prelude::Resource;
use crossbeam::channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

pub mod direction;
pub use direction::{Direction, Facing};

/// Side length of a streamed map block, in tiles.
pub const MAP_BLOCK_SIZE: u16 = 8;
pub const MAP_BLOCK_CELLS: usize = (MAP_BLOCK_SIZE * MAP_BLOCK_SIZE) as usize;

#[derive(Resource)]
pub struct AppState(pub ApplicationState);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationState {
    Disconnected,
    Connecting,
    InWorld,
}

/// Server-assigned alignment of a mobile. The movement code only passes it through.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notoriety {
    #[default]
    Unknown,
    Innocent,
    Ally,
    Gray,
    Criminal,
    Enemy,
    Murderer,
    Invulnerable,
}

/// Movement speed override pushed by the server.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedMode {
    #[default]
    Normal,
    FastUnmount,
    CantRun,
    FastUnmountAndCantRun,
}

impl SpeedMode {
    pub fn can_run(self) -> bool {
        matches!(self, SpeedMode::Normal | SpeedMode::FastUnmount)
    }

    /// On-foot movement at mounted speed.
    pub fn fast_unmounted(self) -> bool {
        matches!(
            self,
            SpeedMode::FastUnmount | SpeedMode::FastUnmountAndCantRun
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandTileFlags {
    pub impassable: bool,
    pub wet: bool,
    pub no_diagonal: bool,
    /// Textured land that is drawn as a slope when its corners differ.
    pub stretchable: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandCell {
    pub graphic: u16,
    pub z: i8,
    pub flags: LandTileFlags,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticTileFlags {
    pub impassable: bool,
    pub surface: bool,
    pub bridge: bool,
    pub wet: bool,
    pub no_diagonal: bool,
    pub door: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticTile {
    pub graphic: u16,
    /// Block-local coordinates, 0..MAP_BLOCK_SIZE.
    pub x: u8,
    pub y: u8,
    pub z: i8,
    pub height: u8,
    pub flags: StaticTileFlags,
}

/// One 8x8 block of land plus the statics standing on it. `cells` is row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBlock {
    pub x: u16,
    pub y: u16,
    pub cells: Vec<LandCell>,
    pub statics: Vec<StaticTile>,
}

impl MapBlock {
    pub fn flat(x: u16, y: u16, cell: LandCell) -> Self {
        Self {
            x,
            y,
            cells: vec![cell; MAP_BLOCK_CELLS],
            statics: Vec::new(),
        }
    }

    pub fn cell_mut(&mut self, local_x: u16, local_y: u16) -> Option<&mut LandCell> {
        if local_x >= MAP_BLOCK_SIZE || local_y >= MAP_BLOCK_SIZE {
            return None;
        }
        self.cells
            .get_mut((local_y * MAP_BLOCK_SIZE + local_x) as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPosition {
    pub x: u16,
    pub y: u16,
    pub z: i8,
    pub facing: Facing,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerFlags {
    pub mounted: bool,
    pub on_sea_horse: bool,
    pub flying: bool,
    pub dead: bool,
    pub game_master: bool,
    /// Walks through other mobiles regardless of stamina.
    pub ignore_mobiles: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamina {
    pub current: u16,
    pub max: u16,
}

impl Stamina {
    pub fn is_full(self) -> bool {
        self.current >= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileUpdate {
    pub serial: u32,
    pub x: u16,
    pub y: u16,
    pub z: i8,
    pub dead: bool,
    pub ignore_mobiles: bool,
}

#[derive(Resource)]
pub struct ToNet(pub Sender<ToNetMessage>);

#[derive(Resource)]
pub struct FromNet(pub Receiver<FromNetMessage>);

#[derive(Debug, Clone)]
pub enum ToNetMessage {
    Connect {
        username: String,
        address: String,
    },
    Disconnect,
    Shutdown,
    WalkRequest {
        direction: Direction,
        sequence: u8,
        running: bool,
        fast_walk: u32,
    },
    Resync,
}

#[derive(Debug, Clone)]
pub enum FromNetMessage {
    Connected,
    Disconnected,
    EnterWorld(PlayerPosition),
    /// Server-asserted position outside the walk handshake (resync reply, teleport).
    PlayerPosition(PlayerPosition),
    PlayerFlags(PlayerFlags),
    SpeedMode(SpeedMode),
    Stamina(Stamina),
    /// Index of the map (facet) the player is on.
    MapChanged(u8),
    StepAccepted {
        sequence: u8,
        notoriety: Notoriety,
    },
    StepRejected {
        sequence: u8,
        x: u16,
        y: u16,
        z: i8,
        facing: Facing,
    },
    FastWalkKeys(Vec<u32>),
    FastWalkKey(u32),
    MapBlock(MapBlock),
    MapBlockUnloaded {
        x: u16,
        y: u16,
    },
    MobileMoved(MobileUpdate),
    MobileRemoved {
        serial: u32,
    },
}
