use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use cr_sim::input::PointerState;
use cr_sim::{Position, StepOutcome, TileMap, WalkTransport, Walker};
use cr_utils::{AppState, ApplicationState, Direction, ToNet, ToNetMessage};
use tracing::{debug, trace, warn};

use crate::net::events::{NetEvent, NetEventQueue, TerrainUpdate, TerrainUpdateQueue};
use crate::timing::{PerfTimings, Timing};

/// Pointer state accumulated between fixed ticks.
#[derive(Debug, Default, Resource)]
pub struct PointerInput(pub PointerState);

/// Screen rectangle the player walks in, in window pixels.
#[derive(Debug, Default, Resource)]
pub struct WalkViewport(pub Rect);

/// Walk requests go straight onto the network channel.
struct ChannelTransport<'a>(&'a ToNet);

impl WalkTransport for ChannelTransport<'_> {
    fn send_walk_request(&mut self, direction: Direction, sequence: u8, running: bool, fast_walk: u32) {
        let msg = ToNetMessage::WalkRequest {
            direction,
            sequence,
            running,
            fast_walk,
        };
        if self.0.0.send(msg).is_err() {
            warn!(sequence, "network thread gone, walk request dropped");
        }
    }

    fn send_resync(&mut self) {
        if self.0.0.send(ToNetMessage::Resync).is_err() {
            warn!("network thread gone, resync dropped");
        }
    }
}

pub fn collect_pointer_input(
    windows: Query<&Window, With<PrimaryWindow>>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut pointer: ResMut<PointerInput>,
    mut viewport: ResMut<WalkViewport>,
    mut timings: ResMut<PerfTimings>,
) {
    let timing = Timing::start();
    let Ok(window) = windows.single() else {
        return;
    };
    viewport.0 = Rect::new(0.0, 0.0, window.width(), window.height());

    if let Some(cursor) = window.cursor_position() {
        pointer.0.position = cursor;
    }
    pointer.0.left = buttons.pressed(MouseButton::Left);
    pointer.0.right = buttons.pressed(MouseButton::Right);
    // Latched until the next fixed tick consumes it.
    pointer.0.right_just_pressed |= buttons.just_pressed(MouseButton::Right);
    timings.input_collect_ms = timing.ms();
}

pub fn net_event_apply_system(
    mut net_events: ResMut<NetEventQueue>,
    mut walker: ResMut<Walker>,
    mut map: ResMut<TileMap>,
    to_net: Res<ToNet>,
    mut timings: ResMut<PerfTimings>,
) {
    let timing = Timing::start();
    let mut transport = ChannelTransport(&to_net);
    for event in net_events.drain() {
        match event {
            NetEvent::EnterWorld(p) => {
                walker.enter_world(Position::new(p.x, p.y, p.z), p.facing.direction);
            }
            NetEvent::LeftWorld => {
                walker.leave_world();
                *map = TileMap::default();
            }
            NetEvent::Position(p) => {
                walker.on_position_update(Position::new(p.x, p.y, p.z), p.facing);
            }
            NetEvent::Flags(flags) => walker.set_flags(flags),
            NetEvent::SpeedMode(mode) => {
                debug!(?mode, "speed mode changed");
                walker.set_speed_mode(mode);
            }
            NetEvent::Stamina(stamina) => walker.set_stamina(stamina),
            NetEvent::MapChanged(index) => {
                debug!(index, "map changed");
                walker.set_map_index(index);
            }
            NetEvent::StepAccepted {
                sequence,
                notoriety,
            } => {
                walker.on_step_accepted(sequence, notoriety, &mut transport);
            }
            NetEvent::StepRejected {
                sequence,
                x,
                y,
                z,
                facing,
            } => {
                debug!(sequence, "server denied step");
                walker.on_step_rejected(Position::new(x, y, z), facing);
            }
            NetEvent::FastWalkKeys(keys) => walker.fast_walk_keys_mut().set_all(&keys),
            NetEvent::FastWalkKey(key) => walker.fast_walk_keys_mut().add(key),
        }
    }
    timings.net_apply_ms = timing.ms();
}

pub fn apply_terrain_updates(mut updates: ResMut<TerrainUpdateQueue>, mut map: ResMut<TileMap>) {
    for update in updates.drain() {
        match update {
            TerrainUpdate::BlockLoaded(block) => {
                map.update_block(block);
            }
            TerrainUpdate::BlockUnloaded { x, y } => {
                map.unload_block(x, y);
            }
            TerrainUpdate::MobileMoved(mobile) => map.update_mobile(mobile),
            TerrainUpdate::MobileRemoved { serial } => {
                map.remove_mobile(serial);
            }
        }
    }
}

pub fn walk_tick_system(
    time: Res<Time>,
    app_state: Res<AppState>,
    mut walker: ResMut<Walker>,
    map: Res<TileMap>,
    mut pointer: ResMut<PointerInput>,
    viewport: Res<WalkViewport>,
    to_net: Res<ToNet>,
    mut timings: ResMut<PerfTimings>,
) {
    let timing = Timing::start();
    let snapshot = pointer.0;
    pointer.0.right_just_pressed = false;
    if app_state.0 != ApplicationState::InWorld {
        timings.walk_tick_ms = timing.ms();
        return;
    }

    let mut transport = ChannelTransport(&to_net);
    let outcome = walker.tick(time.elapsed(), &snapshot, viewport.0, &*map, &mut transport);
    match outcome {
        StepOutcome::Moved(step) | StepOutcome::Turned(step) => {
            trace!(sequence = step.sequence, x = step.x, y = step.y, z = step.z, "stepped");
        }
        StepOutcome::Blocked => trace!("step blocked"),
        _ => {}
    }
    timings.walk_tick_ms = timing.ms();
}

pub fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

/// Run ring and pointer line around the avatar, who always sits at the viewport centre.
pub fn draw_walk_gizmos(
    mut gizmos: Gizmos,
    walker: Res<Walker>,
    pointer: Res<PointerInput>,
    viewport: Res<WalkViewport>,
) {
    if !walker.in_world() {
        return;
    }
    let half = viewport.0.half_size();
    let run_radius = walker.config().run_radius;
    let color = if walker.is_walk_locked() {
        Color::srgb(0.9, 0.6, 0.2)
    } else {
        Color::srgb(0.4, 0.7, 0.9)
    };
    gizmos.circle_2d(Isometry2d::IDENTITY, run_radius, color);
    gizmos.circle_2d(Isometry2d::IDENTITY, 8.0, Color::WHITE);

    // Window pixels are y-down from the top-left corner.
    let cursor = Vec2::new(pointer.0.position.x - half.x, half.y - pointer.0.position.y);
    gizmos.line_2d(Vec2::ZERO, cursor, color);
}
