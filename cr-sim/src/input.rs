use bevy::prelude::{Rect, Vec2};
use cr_utils::Direction;

/// Pointer snapshot for one simulation tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerState {
    pub position: Vec2,
    pub left: bool,
    pub right: bool,
    /// Right button went down since the previous tick.
    pub right_just_pressed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkIntent {
    pub direction: Direction,
    pub run: bool,
}

/// Tracks whether the player is asking to walk: right button held, or the
/// walk lock engaged by holding both buttons. A fresh right press releases
/// the lock. Walking only happens while the last right press landed inside
/// the viewport.
#[derive(Clone, Copy, Debug, Default)]
pub struct WalkGesture {
    locked: bool,
    anchor: Option<Vec2>,
}

impl WalkGesture {
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn update(&mut self, pointer: &PointerState, viewport: Rect, allow_lock: bool) -> bool {
        if pointer.right_just_pressed {
            self.anchor = Some(pointer.position);
        }

        if !allow_lock {
            self.locked = false;
        } else if !self.locked {
            if pointer.left && pointer.right {
                self.locked = true;
            }
        } else if pointer.right_just_pressed {
            self.locked = false;
        }

        let in_bounds = self.anchor.is_some_and(|anchor| viewport.contains(anchor));
        in_bounds && (self.locked || pointer.right)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Eight-way bucket of the pointer relative to `center`, in screen terms
/// (North is up). A pointer exactly on the centre reads as north-east.
pub fn screen_direction(center: Vec2, pointer: Vec2) -> Direction {
    let shift_x = pointer.x as i32 - center.x as i32;
    let shift_y = pointer.y as i32 - center.y as i32;
    if shift_x == 0 && shift_y == 0 {
        return Direction::NorthEast;
    }

    let horizontal = if shift_x < 0 {
        Direction::West
    } else {
        Direction::East
    };
    let vertical = if shift_y < 0 {
        Direction::North
    } else {
        Direction::South
    };

    if shift_x == 0 {
        return vertical;
    }
    if shift_y == 0 {
        return horizontal;
    }

    let (abs_x, abs_y) = (shift_x.abs(), shift_y.abs());
    if abs_y * 5 <= abs_x * 2 {
        horizontal
    } else if abs_y * 2 >= abs_x * 5 {
        vertical
    } else {
        match (shift_x > 0, shift_y > 0) {
            (true, false) => Direction::NorthEast,
            (true, true) => Direction::SouthEast,
            (false, true) => Direction::SouthWest,
            (false, false) => Direction::NorthWest,
        }
    }
}

/// The isometric view is turned 45 degrees: screen up is world north-west.
pub fn screen_to_world(direction: Direction) -> Direction {
    direction.counter_clockwise()
}

pub fn intent_from_pointer(viewport: Rect, pointer: Vec2, run_radius: f32) -> WalkIntent {
    let center = viewport.center();
    WalkIntent {
        direction: screen_to_world(screen_direction(center, pointer)),
        run: center.distance(pointer) >= run_radius,
    }
}
