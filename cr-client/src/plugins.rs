use std::sync::Mutex;

use bevy::prelude::*;
use bevy::time::Fixed;
use cr_sim::{MovementConfig, TileMap, Walker};
use cr_utils::{AppState, ApplicationState, FromNet, ToNet};
use tracing::error;

use crate::message_handler;
use crate::movement_systems;
use crate::net;
use crate::timing;

/// Fixed tick length; finer than the shortest step cooldown.
const SIM_TICK_SECONDS: f64 = 0.025;

pub struct ClientCorePlugin {
    pub initial_state: ApplicationState,
    pub movement: MovementConfig,
    to_net: Mutex<Option<ToNet>>,
    from_net: Mutex<Option<FromNet>>,
}

impl ClientCorePlugin {
    pub fn new(
        initial_state: ApplicationState,
        movement: MovementConfig,
        to_net: ToNet,
        from_net: FromNet,
    ) -> Self {
        Self {
            initial_state,
            movement,
            to_net: Mutex::new(Some(to_net)),
            from_net: Mutex::new(Some(from_net)),
        }
    }
}

impl Plugin for ClientCorePlugin {
    fn build(&self, app: &mut App) {
        // Plugins are built once; the channel ends are moved out on that call.
        let to_net = self.to_net.lock().ok().and_then(|mut slot| slot.take());
        let from_net = self.from_net.lock().ok().and_then(|mut slot| slot.take());
        if let (Some(to_net), Some(from_net)) = (to_net, from_net) {
            app.insert_resource(to_net).insert_resource(from_net);
        } else {
            error!("network channels already consumed");
        }

        app.insert_resource(AppState(self.initial_state))
            .insert_resource(Walker::new(self.movement.clone()))
            .insert_resource(TileMap::default())
            .insert_resource(net::events::NetEventQueue::default())
            .insert_resource(net::events::TerrainUpdateQueue::default())
            .insert_resource(movement_systems::PointerInput::default())
            .insert_resource(movement_systems::WalkViewport::default())
            .insert_resource(timing::PerfTimings::default());
    }
}

pub struct ClientNetPlugin;

impl Plugin for ClientNetPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreUpdate, message_handler::handle_messages);
    }
}

pub struct ClientMovementPlugin;

impl Plugin for ClientMovementPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_seconds(SIM_TICK_SECONDS))
            .add_systems(Startup, movement_systems::spawn_camera)
            .add_systems(
                PreUpdate,
                movement_systems::collect_pointer_input.after(bevy::input::InputSystem),
            )
            .add_systems(Update, movement_systems::draw_walk_gizmos)
            .add_systems(
                FixedUpdate,
                (
                    movement_systems::apply_terrain_updates,
                    movement_systems::walk_tick_system,
                    movement_systems::net_event_apply_system,
                )
                    .chain(),
            );
    }
}

pub struct ClientTimingPlugin;

#[cfg(feature = "perf_timing")]
impl Plugin for ClientTimingPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(timing::TimingReport::default())
            .add_systems(Last, timing::report_timings);
    }
}

#[cfg(not(feature = "perf_timing"))]
impl Plugin for ClientTimingPlugin {
    fn build(&self, _app: &mut App) {}
}
