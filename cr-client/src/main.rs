use std::path::PathBuf;
use std::thread;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use cr_utils::{AppState, ApplicationState, FromNet, ToNet, ToNetMessage};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod message_handler;
mod movement_systems;
mod net;
mod plugins;
mod timing;

use config::ClientConfig;
use plugins::{ClientCorePlugin, ClientMovementPlugin, ClientNetPlugin, ClientTimingPlugin};

#[derive(Parser, Debug)]
#[command(name = "classicrust", about = "Isometric tile client movement sandbox")]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log filter, e.g. "info,cr_sim=debug". Falls back to RUST_LOG.
    #[arg(long)]
    log: Option<String>,
    #[arg(long)]
    username: Option<String>,
    /// Shard address; "offline" runs the built-in practice shard.
    #[arg(long)]
    address: Option<String>,
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .compact()
        .init();
}

fn main() -> AppExit {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    let mut config = match ClientConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return AppExit::error();
        }
    };
    if let Some(username) = args.username {
        config.net.username = username;
    }
    if let Some(address) = args.address {
        config.net.address = address;
    }

    info!("Starting classicrust");

    let (to_net_tx, to_net_rx) = crossbeam::channel::unbounded::<ToNetMessage>();
    let (from_net_tx, from_net_rx) = crossbeam::channel::unbounded();
    let net_thread = thread::Builder::new()
        .name("net".into())
        .spawn(move || cr_net::start_networking(to_net_rx, from_net_tx));
    if let Err(err) = net_thread {
        error!("failed to start network thread: {err}");
        return AppExit::error();
    }

    let connect = ToNetMessage::Connect {
        username: config.net.username.clone(),
        address: config.net.address.clone(),
    };
    let initial_state = if to_net_tx.send(connect).is_ok() {
        ApplicationState::Connecting
    } else {
        ApplicationState::Disconnected
    };

    App::new()
        .add_plugins(
            DefaultPlugins
                .build()
                .disable::<LogPlugin>()
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "classicrust".into(),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins(ClientCorePlugin::new(
            initial_state,
            config.movement,
            ToNet(to_net_tx),
            FromNet(from_net_rx),
        ))
        .add_plugins((ClientNetPlugin, ClientMovementPlugin, ClientTimingPlugin))
        .add_systems(Last, shutdown_network_on_exit)
        .run()
}

fn shutdown_network_on_exit(
    mut exits: EventReader<AppExit>,
    to_net: Res<ToNet>,
    mut app_state: ResMut<AppState>,
) {
    if exits.read().next().is_some() {
        let _ = to_net.0.send(ToNetMessage::Shutdown);
        *app_state = AppState(ApplicationState::Disconnected);
    }
}
