use std::time::Duration;

use cr_utils::Facing;

use crate::types::Position;

/// Steps that may be in flight before the server has to answer.
pub const MAX_STEP_COUNT: usize = 5;

/// A locally applied step the server has not confirmed yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingStep {
    pub sequence: u8,
    pub direction: Facing,
    pub x: u16,
    pub y: u16,
    pub z: i8,
}

impl PendingStep {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Sequence that follows `sequence`. Counts 1..=255 and never returns to 0,
/// which is only used for the first step after a reset.
pub fn next_sequence_after(sequence: u8) -> u8 {
    (sequence % u8::MAX) + 1
}

/// Bounded queue of speculative steps, oldest first.
#[derive(Clone, Debug, Default)]
pub struct StepQueue {
    steps: [PendingStep; MAX_STEP_COUNT],
    count: usize,
    next_sequence: u8,
    last_step_due_at: Duration,
    resync_in_flight: bool,
}

impl StepQueue {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= MAX_STEP_COUNT
    }

    pub fn steps(&self) -> &[PendingStep] {
        &self.steps[..self.count]
    }

    pub fn back(&self) -> Option<&PendingStep> {
        self.steps().last()
    }

    pub fn next_sequence(&self) -> u8 {
        self.next_sequence
    }

    pub fn resync_in_flight(&self) -> bool {
        self.resync_in_flight
    }

    pub(crate) fn set_resync_in_flight(&mut self, value: bool) {
        self.resync_in_flight = value;
    }

    #[cfg(test)]
    pub(crate) fn due_at(&self) -> Duration {
        self.last_step_due_at
    }

    /// Whether the cooldown of the last step has elapsed at `now`.
    pub fn is_ready(&self, now: Duration) -> bool {
        self.last_step_due_at <= now
    }

    pub fn set_due_at(&mut self, due_at: Duration) {
        self.last_step_due_at = due_at;
    }

    /// Appends a step with the next sequence number. `None` when full.
    pub fn push(&mut self, direction: Facing, position: Position) -> Option<PendingStep> {
        if self.is_full() {
            return None;
        }
        let step = PendingStep {
            sequence: self.next_sequence,
            direction,
            x: position.x,
            y: position.y,
            z: position.z,
        };
        self.steps[self.count] = step;
        self.count += 1;
        self.next_sequence = next_sequence_after(self.next_sequence);
        Some(step)
    }

    pub fn position_of(&self, sequence: u8) -> Option<usize> {
        self.steps().iter().position(|s| s.sequence == sequence)
    }

    /// Drops every step up to and including `index`; returns how many went.
    pub fn pop_through(&mut self, index: usize) -> usize {
        if index >= self.count {
            return 0;
        }
        let popped = index + 1;
        self.steps.copy_within(popped..self.count, 0);
        self.count -= popped;
        popped
    }

    /// Empties the queue and restarts sequencing from 0.
    pub fn clear_and_restart(&mut self) {
        self.count = 0;
        self.next_sequence = 0;
    }

    /// Back to the state of a freshly entered world.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
