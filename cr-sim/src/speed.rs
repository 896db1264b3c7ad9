use std::time::Duration;

pub const TURN_DELAY: Duration = Duration::from_millis(100);

const STEP_DELAY_WALK: Duration = Duration::from_millis(400);
const STEP_DELAY_RUN: Duration = Duration::from_millis(200);
const STEP_DELAY_MOUNT_WALK: Duration = Duration::from_millis(200);
const STEP_DELAY_MOUNT_RUN: Duration = Duration::from_millis(100);

/// Time one full tile of movement takes.
pub fn time_to_complete_movement(run: bool, mounted: bool) -> Duration {
    match (mounted, run) {
        (true, true) => STEP_DELAY_MOUNT_RUN,
        (true, false) => STEP_DELAY_MOUNT_WALK,
        (false, true) => STEP_DELAY_RUN,
        (false, false) => STEP_DELAY_WALK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faster_states_step_sooner() {
        let walk = time_to_complete_movement(false, false);
        assert!(time_to_complete_movement(true, false) < walk);
        assert!(time_to_complete_movement(false, true) < walk);
        assert!(time_to_complete_movement(true, true) < time_to_complete_movement(false, true));
        assert!(TURN_DELAY <= time_to_complete_movement(true, true));
    }
}
