use serde::{Deserialize, Serialize};

use crate::reconcile::DEFAULT_STALE_WINDOW;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Pointer distance from the viewport centre, in pixels, at which walking becomes running.
    pub run_radius: f32,
    pub stale_window: u8,
    /// Allow the both-buttons walk lock.
    pub walk_lock: bool,
    /// Push through other mobiles even while tired.
    pub ignore_stamina_check: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            run_radius: 190.0,
            stale_window: DEFAULT_STALE_WINDOW,
            walk_lock: true,
            ignore_stamina_check: false,
        }
    }
}
