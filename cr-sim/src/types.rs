use cr_utils::{Direction, Notoriety, PlayerFlags, SpeedMode, Stamina};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: i8,
}

impl Position {
    pub const fn new(x: u16, y: u16, z: i8) -> Self {
        Self { x, y, z }
    }

    /// Neighbouring tile in `direction`, keeping z. `None` off the edge of the map.
    pub fn step(self, direction: Direction) -> Option<(u16, u16)> {
        let (dx, dy) = direction.offset();
        let x = u16::try_from(self.x as i32 + dx).ok()?;
        let y = u16::try_from(self.y as i32 + dy).ok()?;
        Some((x, y))
    }
}

/// How terrain occupants are interpreted for the walking mobile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StepState {
    #[default]
    Normal,
    DeadOrGm,
    OnSeaHorse,
    Flying,
}

/// Authoritative state of the local avatar.
#[derive(Clone, Copy, Debug, Default)]
pub struct Avatar {
    pub position: Position,
    pub facing: Direction,
    pub notoriety: Notoriety,
    pub flags: PlayerFlags,
    pub speed_mode: SpeedMode,
    /// Unknown until the server reports it.
    pub stamina: Option<Stamina>,
    pub map_index: u8,
}

impl Avatar {
    pub fn step_state(&self) -> StepState {
        if self.flags.dead || self.flags.game_master {
            StepState::DeadOrGm
        } else if self.flags.flying {
            StepState::Flying
        } else if self.flags.on_sea_horse {
            StepState::OnSeaHorse
        } else {
            StepState::Normal
        }
    }

    /// Whether other mobiles are walked through. Only a tired player on the
    /// first map has to go around them; unknown stamina counts as tired.
    pub fn passes_mobiles(&self, ignore_stamina_check: bool) -> bool {
        let tired = self.stamina.is_none_or(|stamina| !stamina.is_full());
        ignore_stamina_check || self.flags.ignore_mobiles || !(tired && self.map_index == 0)
    }

    /// Mounted, flying and fast-unmount avatars all step at mount speed.
    pub fn moves_mounted(&self) -> bool {
        self.flags.mounted
            || self.flags.on_sea_horse
            || self.flags.flying
            || self.speed_mode.fast_unmounted()
    }
}
