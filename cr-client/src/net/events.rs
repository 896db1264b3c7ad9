use std::collections::VecDeque;

use bevy::prelude::Resource;
use cr_utils::{
    Facing, MapBlock, MobileUpdate, Notoriety, PlayerFlags, PlayerPosition, SpeedMode, Stamina,
};

/// Server messages that touch the walker, applied on the fixed tick in
/// arrival order.
#[derive(Clone, Debug)]
pub enum NetEvent {
    EnterWorld(PlayerPosition),
    LeftWorld,
    Position(PlayerPosition),
    Flags(PlayerFlags),
    SpeedMode(SpeedMode),
    Stamina(Stamina),
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
}

/// Terrain and bystander changes, applied at the start of each fixed tick.
#[derive(Clone, Debug)]
pub enum TerrainUpdate {
    BlockLoaded(MapBlock),
    BlockUnloaded { x: u16, y: u16 },
    MobileMoved(MobileUpdate),
    MobileRemoved { serial: u32 },
}

#[derive(Default, Resource)]
pub struct NetEventQueue {
    pub events: VecDeque<NetEvent>,
}

impl NetEventQueue {
    pub fn push(&mut self, event: NetEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, NetEvent> {
        self.events.drain(..)
    }
}

#[derive(Default, Resource)]
pub struct TerrainUpdateQueue {
    pub updates: VecDeque<TerrainUpdate>,
}

impl TerrainUpdateQueue {
    pub fn push(&mut self, update: TerrainUpdate) {
        self.updates.push_back(update);
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, TerrainUpdate> {
        self.updates.drain(..)
    }
}
