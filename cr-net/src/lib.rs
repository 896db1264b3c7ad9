use crossbeam::channel::{Receiver, Sender};
use cr_utils::{FromNetMessage, ToNetMessage};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod demo_map;
pub mod offline;

use offline::OfflineShard;

/// Address that selects the in-process shard.
pub const OFFLINE_ADDRESS: &str = "offline";

#[derive(Debug, Error)]
pub enum NetError {
    #[error("no transport for address '{0}'")]
    UnsupportedAddress(String),
    #[error("not connected")]
    NotConnected,
}

/// Network thread body. Runs until `Shutdown` arrives or the main thread hangs up.
pub fn start_networking(from_main: Receiver<ToNetMessage>, to_main: Sender<FromNetMessage>) {
    let mut shard: Option<OfflineShard> = None;

    while let Ok(msg) = from_main.recv() {
        let replies = match msg {
            ToNetMessage::Connect { username, address } => {
                info!(%address, %username, "connecting");
                match connect(&address) {
                    Ok(mut connected) => {
                        let greeting = connected.greeting();
                        shard = Some(connected);
                        greeting
                    }
                    Err(err) => {
                        warn!("failed to connect: {err}");
                        vec![FromNetMessage::Disconnected]
                    }
                }
            }
            ToNetMessage::Disconnect => {
                if shard.take().is_some() {
                    info!("disconnected");
                }
                vec![FromNetMessage::Disconnected]
            }
            ToNetMessage::Shutdown => break,
            other => match shard.as_mut() {
                Some(shard) => shard.handle(&other),
                None => {
                    debug!(?other, "dropping message: {}", NetError::NotConnected);
                    Vec::new()
                }
            },
        };

        for reply in replies {
            if to_main.send(reply).is_err() {
                // Main thread hung up
                return;
            }
        }
    }
}

fn connect(address: &str) -> Result<OfflineShard, NetError> {
    if address == OFFLINE_ADDRESS {
        Ok(OfflineShard::demo())
    } else {
        Err(NetError::UnsupportedAddress(address.to_string()))
    }
}
