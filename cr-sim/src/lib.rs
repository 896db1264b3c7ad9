pub mod collision;
pub mod config;
pub mod input;
pub mod reconcile;
pub mod speed;
pub mod steps;
pub mod terrain;
pub mod types;
pub mod walker;

pub use collision::{CollisionResolver, try_step};
pub use config::MovementConfig;
pub use input::{PointerState, WalkIntent};
pub use reconcile::{AckOutcome, WalkTransport};
pub use steps::{MAX_STEP_COUNT, PendingStep, StepQueue};
pub use terrain::{Occupant, TerrainOracle, TileMap};
pub use types::{Avatar, Position, StepState};
pub use walker::{FastWalkKeys, StepOutcome, Walker};

#[cfg(test)]
mod tests;
