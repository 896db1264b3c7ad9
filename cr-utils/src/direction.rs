use serde::{Deserialize, Serialize};

/// Compass direction in world space. Odd values are the diagonals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    #[default]
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Decodes the low three bits; the running bit and anything above it is ignored.
    pub fn from_bits(value: u8) -> Self {
        Self::ALL[(value & 7) as usize]
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn is_diagonal(self) -> bool {
        self.index() % 2 != 0
    }

    pub fn rotated(self, steps: i8) -> Self {
        Self::from_bits((self.index() as i16 + steps as i16).rem_euclid(8) as u8)
    }

    pub fn clockwise(self) -> Self {
        self.rotated(1)
    }

    pub fn counter_clockwise(self) -> Self {
        self.rotated(-1)
    }

    /// Tile delta for one step. North is -y, east is +x.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }
}

/// A direction plus the running modifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Facing {
    pub direction: Direction,
    pub running: bool,
}

impl Facing {
    pub fn new(direction: Direction, running: bool) -> Self {
        Self { direction, running }
    }

    pub fn walking(direction: Direction) -> Self {
        Self::new(direction, false)
    }
}

impl From<Direction> for Facing {
    fn from(direction: Direction) -> Self {
        Self::walking(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonals_are_odd() {
        let diagonals: Vec<_> = Direction::ALL
            .iter()
            .filter(|d| d.is_diagonal())
            .copied()
            .collect();
        assert_eq!(
            diagonals,
            vec![
                Direction::NorthEast,
                Direction::SouthEast,
                Direction::SouthWest,
                Direction::NorthWest
            ]
        );
    }

    #[test]
    fn rotation_wraps() {
        assert_eq!(Direction::NorthWest.clockwise(), Direction::North);
        assert_eq!(Direction::North.counter_clockwise(), Direction::NorthWest);
        assert_eq!(Direction::East.rotated(4), Direction::West);
    }
}
