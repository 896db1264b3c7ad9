use bevy::ecs::system::ResMut;
use bevy::prelude::*;
use cr_utils::{AppState, ApplicationState, FromNet, FromNetMessage};
use tracing::info;

use crate::net::events::{NetEvent, NetEventQueue, TerrainUpdate, TerrainUpdateQueue};
use crate::timing::{PerfTimings, Timing};

pub fn handle_messages(
    from_net: Res<FromNet>,
    mut app_state: ResMut<AppState>,
    mut net_events: ResMut<NetEventQueue>,
    mut terrain: ResMut<TerrainUpdateQueue>,
    mut timings: ResMut<PerfTimings>,
) {
    let timing = Timing::start();
    while let Ok(msg) = from_net.0.try_recv() {
        let event = match msg {
            FromNetMessage::Connected => {
                info!("connected to shard");
                continue;
            }
            FromNetMessage::Disconnected => {
                if app_state.0 != ApplicationState::Disconnected {
                    info!("disconnected from shard");
                }
                *app_state = AppState(ApplicationState::Disconnected);
                NetEvent::LeftWorld
            }
            FromNetMessage::EnterWorld(position) => {
                *app_state = AppState(ApplicationState::InWorld);
                NetEvent::EnterWorld(position)
            }
            FromNetMessage::PlayerPosition(position) => NetEvent::Position(position),
            FromNetMessage::PlayerFlags(flags) => NetEvent::Flags(flags),
            FromNetMessage::SpeedMode(mode) => NetEvent::SpeedMode(mode),
            FromNetMessage::Stamina(stamina) => NetEvent::Stamina(stamina),
            FromNetMessage::MapChanged(index) => NetEvent::MapChanged(index),
            FromNetMessage::StepAccepted {
                sequence,
                notoriety,
            } => NetEvent::StepAccepted {
                sequence,
                notoriety,
            },
            FromNetMessage::StepRejected {
                sequence,
                x,
                y,
                z,
                facing,
            } => NetEvent::StepRejected {
                sequence,
                x,
                y,
                z,
                facing,
            },
            FromNetMessage::FastWalkKeys(keys) => NetEvent::FastWalkKeys(keys),
            FromNetMessage::FastWalkKey(key) => NetEvent::FastWalkKey(key),
            FromNetMessage::MapBlock(block) => {
                terrain.push(TerrainUpdate::BlockLoaded(block));
                continue;
            }
            FromNetMessage::MapBlockUnloaded { x, y } => {
                terrain.push(TerrainUpdate::BlockUnloaded { x, y });
                continue;
            }
            FromNetMessage::MobileMoved(mobile) => {
                terrain.push(TerrainUpdate::MobileMoved(mobile));
                continue;
            }
            FromNetMessage::MobileRemoved { serial } => {
                terrain.push(TerrainUpdate::MobileRemoved { serial });
                continue;
            }
        };
        net_events.push(event);
    }
    timings.handle_messages_ms = timing.ms();
}
