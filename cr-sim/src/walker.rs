use std::time::Duration;

use bevy::prelude::{Rect, Resource};
use cr_utils::{Direction, Facing, Notoriety, PlayerFlags, SpeedMode, Stamina};
use tracing::{debug, info};

use crate::collision::CollisionResolver;
use crate::config::MovementConfig;
use crate::input::{self, PointerState, WalkGesture, WalkIntent};
use crate::reconcile::{self, AckOutcome, WalkTransport};
use crate::speed::{TURN_DELAY, time_to_complete_movement};
use crate::steps::{MAX_STEP_COUNT, PendingStep, StepQueue};
use crate::terrain::TerrainOracle;
use crate::types::{Avatar, Position};

/// Opaque anti-speedhack tokens handed out by the server, one per walk request.
#[derive(Clone, Copy, Debug, Default)]
pub struct FastWalkKeys {
    keys: [u32; MAX_STEP_COUNT],
}

impl FastWalkKeys {
    pub fn set_all(&mut self, keys: &[u32]) {
        self.keys = [0; MAX_STEP_COUNT];
        for (slot, key) in self.keys.iter_mut().zip(keys) {
            *slot = *key;
        }
    }

    pub fn add(&mut self, key: u32) {
        if let Some(slot) = self.keys.iter_mut().find(|k| **k == 0) {
            *slot = key;
        }
    }

    /// Next key, or 0 when the server has not provided any.
    pub fn take(&mut self) -> u32 {
        self.keys
            .iter_mut()
            .find(|k| **k != 0)
            .map(std::mem::take)
            .unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    OutOfWorld,
    /// No walk gesture this tick.
    Idle,
    Saturated,
    CoolingDown,
    Blocked,
    Turned(PendingStep),
    Moved(PendingStep),
}

/// Local player's movement: authoritative avatar, speculative steps and the
/// input gesture that drives them. Everything runs on the simulation tick.
#[derive(Debug, Default, Resource)]
pub struct Walker {
    pub avatar: Avatar,
    queue: StepQueue,
    resolver: CollisionResolver,
    gesture: WalkGesture,
    fast_walk: FastWalkKeys,
    config: MovementConfig,
    in_world: bool,
}

impl Walker {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn in_world(&self) -> bool {
        self.in_world
    }

    pub fn queue(&self) -> &StepQueue {
        &self.queue
    }

    pub fn is_walk_locked(&self) -> bool {
        self.gesture.is_locked()
    }

    pub fn enter_world(&mut self, position: Position, facing: Direction) {
        info!(x = position.x, y = position.y, z = position.z, ?facing, "entered world");
        self.avatar.position = position;
        self.avatar.facing = facing;
        self.reset_movement();
        self.in_world = true;
    }

    pub fn leave_world(&mut self) {
        if self.in_world {
            info!("left world");
        }
        self.reset_movement();
        self.fast_walk = FastWalkKeys::default();
        self.avatar.stamina = None;
        self.in_world = false;
    }

    fn reset_movement(&mut self) {
        self.queue.reset();
        self.gesture.reset();
    }

    pub fn set_flags(&mut self, flags: PlayerFlags) {
        self.avatar.flags = flags;
    }

    pub fn set_speed_mode(&mut self, mode: SpeedMode) {
        self.avatar.speed_mode = mode;
    }

    pub fn set_stamina(&mut self, stamina: Stamina) {
        self.avatar.stamina = Some(stamina);
    }

    pub fn set_map_index(&mut self, index: u8) {
        self.avatar.map_index = index;
    }

    pub fn fast_walk_keys_mut(&mut self) -> &mut FastWalkKeys {
        &mut self.fast_walk
    }

    /// Where the avatar is drawn: the newest unconfirmed step, else the server position.
    pub fn predicted_position(&self) -> Position {
        self.queue
            .back()
            .map_or(self.avatar.position, PendingStep::position)
    }

    pub fn predicted_facing(&self) -> Direction {
        self.queue
            .back()
            .map_or(self.avatar.facing, |step| step.direction.direction)
    }

    /// One simulation tick of pointer-driven walking.
    pub fn tick<T, N>(
        &mut self,
        now: Duration,
        pointer: &PointerState,
        viewport: Rect,
        terrain: &T,
        transport: &mut N,
    ) -> StepOutcome
    where
        T: TerrainOracle + ?Sized,
        N: WalkTransport + ?Sized,
    {
        if !self.in_world {
            return StepOutcome::OutOfWorld;
        }
        if !self.gesture.update(pointer, viewport, self.config.walk_lock) {
            return StepOutcome::Idle;
        }
        let intent = input::intent_from_pointer(viewport, pointer.position, self.config.run_radius);
        self.request_step(now, intent, terrain, transport)
    }

    /// Tries to enqueue one step (or a turn in place) towards `intent`.
    pub fn request_step<T, N>(
        &mut self,
        now: Duration,
        intent: WalkIntent,
        terrain: &T,
        transport: &mut N,
    ) -> StepOutcome
    where
        T: TerrainOracle + ?Sized,
        N: WalkTransport + ?Sized,
    {
        if !self.in_world {
            return StepOutcome::OutOfWorld;
        }
        if self.queue.is_full() {
            return StepOutcome::Saturated;
        }
        if !self.queue.is_ready(now) {
            return StepOutcome::CoolingDown;
        }

        let run = intent.run && self.avatar.speed_mode.can_run();
        let origin = self.predicted_position();
        let current = self.predicted_facing();

        self.resolver.set_step_state(self.avatar.step_state());
        self.resolver
            .set_ignore_mobiles(self.avatar.passes_mobiles(self.config.ignore_stamina_check));
        let (position, direction, moved) =
            match self.resolver.try_step(terrain, origin, intent.direction) {
                Some((landing, direction)) if direction == current => (landing, direction, true),
                // Facing changes first; the move itself is the next step.
                Some((_, direction)) => (origin, direction, false),
                None if intent.direction != current => (origin, intent.direction, false),
                None => return StepOutcome::Blocked,
            };

        let Some(step) = self.queue.push(Facing::new(direction, run), position) else {
            return StepOutcome::Saturated;
        };
        transport.send_walk_request(direction, step.sequence, run, self.fast_walk.take());

        let cooldown = if moved {
            time_to_complete_movement(run, self.avatar.moves_mounted())
        } else {
            TURN_DELAY
        };
        self.queue.set_due_at(now + cooldown);

        debug!(
            sequence = step.sequence,
            ?direction,
            run,
            x = step.x,
            y = step.y,
            z = step.z,
            in_flight = self.queue.len(),
            "walk request"
        );

        if moved {
            StepOutcome::Moved(step)
        } else {
            StepOutcome::Turned(step)
        }
    }

    pub fn on_step_accepted<N: WalkTransport + ?Sized>(
        &mut self,
        sequence: u8,
        notoriety: Notoriety,
        transport: &mut N,
    ) -> AckOutcome {
        if !self.in_world {
            debug!(sequence, "confirmation outside the world");
            return AckOutcome::Stale;
        }
        let matched = self
            .queue
            .position_of(sequence)
            .map(|index| self.queue.steps()[index]);
        let outcome =
            reconcile::apply_accept(&mut self.queue, sequence, self.config.stale_window, transport);
        if let (AckOutcome::Confirmed { .. }, Some(step)) = (outcome, matched) {
            // The confirmed step becomes the authoritative state.
            self.avatar.position = step.position();
            self.avatar.facing = step.direction.direction;
            self.avatar.notoriety = notoriety;
        }
        outcome
    }

    pub fn on_step_rejected(&mut self, position: Position, facing: Facing) {
        reconcile::apply_reject(&mut self.queue, &mut self.avatar, position, facing);
    }

    /// Server-asserted position outside the walk handshake; handled like a rejection.
    pub fn on_position_update(&mut self, position: Position, facing: Facing) {
        reconcile::apply_reject(&mut self.queue, &mut self.avatar, position, facing);
    }
}
