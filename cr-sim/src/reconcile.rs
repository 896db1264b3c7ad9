use cr_utils::{Direction, Facing};
use tracing::{debug, info, warn};

use crate::steps::StepQueue;
use crate::types::{Avatar, Position};

/// How far behind `next_sequence` an unmatched acknowledgment may be and
/// still count as a late duplicate rather than a desync.
pub const DEFAULT_STALE_WINDOW: u8 = 32;

/// Outgoing half of the walk handshake.
pub trait WalkTransport {
    fn send_walk_request(&mut self, direction: Direction, sequence: u8, running: bool, fast_walk: u32);
    fn send_resync(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    /// The matching step and everything before it left the queue.
    Confirmed { popped: usize },
    /// Already confirmed or superseded; nothing changed.
    Stale,
    /// Unmatched and not stale: the queue was dropped.
    Desync { resync_sent: bool },
}

/// Distance from `sequence` forward to `next`, on the cycle 0, 1..=255, 1, ...
/// `None` when nothing has been sent since the last reset.
pub fn distance_behind(sequence: u8, next: u8) -> Option<u8> {
    if next == 0 {
        return None;
    }
    if sequence == 0 {
        return Some(next);
    }
    let cycle = u8::MAX as i16;
    Some((next as i16 - sequence as i16).rem_euclid(cycle) as u8)
}

pub fn is_stale(sequence: u8, next: u8, window: u8) -> bool {
    distance_behind(sequence, next).is_some_and(|d| d >= 1 && d <= window)
}

/// Applies a server confirmation of `sequence`.
pub fn apply_accept<T: WalkTransport + ?Sized>(
    queue: &mut StepQueue,
    sequence: u8,
    stale_window: u8,
    transport: &mut T,
) -> AckOutcome {
    if let Some(index) = queue.position_of(sequence) {
        let popped = queue.pop_through(index);
        queue.set_resync_in_flight(false);
        debug!(sequence, popped, remaining = queue.len(), "step confirmed");
        return AckOutcome::Confirmed { popped };
    }

    if is_stale(sequence, queue.next_sequence(), stale_window) {
        debug!(sequence, next = queue.next_sequence(), "ignoring stale confirmation");
        return AckOutcome::Stale;
    }

    warn!(
        sequence,
        next = queue.next_sequence(),
        in_flight = queue.len(),
        "unexpected step confirmation, dropping predicted steps"
    );
    queue.clear_and_restart();
    let resync_sent = !queue.resync_in_flight();
    if resync_sent {
        transport.send_resync();
        queue.set_resync_in_flight(true);
    }
    AckOutcome::Desync { resync_sent }
}

/// Applies a server rejection: the server's position always wins.
pub fn apply_reject(queue: &mut StepQueue, avatar: &mut Avatar, position: Position, facing: Facing) {
    info!(
        x = position.x,
        y = position.y,
        z = position.z,
        dropped = queue.len(),
        "step rejected, snapping to server position"
    );
    avatar.position = position;
    avatar.facing = facing.direction;
    queue.reset();
}
