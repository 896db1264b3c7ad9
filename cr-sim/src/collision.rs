use cr_utils::Direction;

use crate::terrain::{Occupant, TerrainOracle, TerrainSample};
use crate::types::{Position, StepState};

/// Minimum clearance between a walking surface and whatever is above it.
pub const BLOCK_HEIGHT: i32 = 16;
/// Result of the height walk when no surface can be stood on.
pub const NO_LANDING_Z: i32 = -128;
/// Flying avatars snap onto no-diagonal surfaces this close to them.
const FLYING_SNAP_RANGE: i32 = 25;

/// Decides whether one step is legal and where it lands.
///
/// Keeps scratch buffers between queries so the per-tick path does not
/// allocate once they have grown to the busiest tile seen.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    step_state: StepState,
    ignore_mobiles: bool,
    occupants: Vec<Occupant>,
    samples: Vec<TerrainSample>,
}

impl CollisionResolver {
    pub fn new(step_state: StepState) -> Self {
        Self {
            step_state,
            ..Default::default()
        }
    }

    pub fn step_state(&self) -> StepState {
        self.step_state
    }

    pub fn set_step_state(&mut self, step_state: StepState) {
        self.step_state = step_state;
    }

    /// Other mobiles stop counting as obstacles while set.
    pub fn set_ignore_mobiles(&mut self, ignore: bool) {
        self.ignore_mobiles = ignore;
    }

    /// Attempts a step from `origin` towards `facing`.
    ///
    /// A diagonal is only taken when both of its orthogonal components are
    /// legal on their own; otherwise the components are tried in turn
    /// (clockwise first) so the walker slides around corners. The returned
    /// direction is the one actually used.
    pub fn try_step<T: TerrainOracle + ?Sized>(
        &mut self,
        terrain: &T,
        origin: Position,
        facing: Direction,
    ) -> Option<(Position, Direction)> {
        let direct = self.check_step(terrain, origin, facing);
        if !facing.is_diagonal() {
            return direct.map(|pos| (pos, facing));
        }

        let components = [facing.clockwise(), facing.counter_clockwise()];
        if let Some(pos) = direct {
            if components
                .iter()
                .all(|&component| self.check_step(terrain, origin, component).is_some())
            {
                return Some((pos, facing));
            }
        }

        components.into_iter().find_map(|component| {
            self.check_step(terrain, origin, component)
                .map(|pos| (pos, component))
        })
    }

    /// Single step without diagonal handling.
    pub fn check_step<T: TerrainOracle + ?Sized>(
        &mut self,
        terrain: &T,
        origin: Position,
        direction: Direction,
    ) -> Option<Position> {
        let (x, y) = origin.step(direction)?;
        let current_z = origin.z as i32;
        let (mut min_z, max_z) = self.bracket(terrain, origin, direction);

        if !self.load_samples(terrain, x as i32, y as i32) || self.samples.is_empty() {
            return None;
        }

        // Stable: occupants at the same (z, height) keep oracle order.
        self.samples
            .sort_by(|a, b| a.z.cmp(&b.z).then(a.height.cmp(&b.height)));
        self.samples.push(TerrainSample::ceiling());

        let reference_z = current_z.max(min_z);
        let mut result_z = NO_LANDING_Z;
        let mut best_delta = i32::MAX;
        let mut top_z = NO_LANDING_Z;

        for i in 0..self.samples.len() {
            let sample = self.samples[i];

            if sample.no_diagonal && self.step_state == StepState::Flying {
                if (sample.avg_z - reference_z).abs() <= FLYING_SNAP_RANGE {
                    result_z = if sample.avg_z != NO_LANDING_Z {
                        sample.avg_z
                    } else {
                        top_z
                    };
                    break;
                }
            }

            if !sample.impassable_or_surface {
                continue;
            }

            if sample.z - min_z >= BLOCK_HEIGHT {
                for candidate in self.samples[..i].iter().rev() {
                    if !(candidate.surface || candidate.bridge) {
                        continue;
                    }
                    let fits = candidate.avg_z >= top_z
                        && sample.z - candidate.avg_z >= BLOCK_HEIGHT
                        && ((candidate.surface && candidate.avg_z <= max_z)
                            || (candidate.bridge && candidate.z <= max_z));
                    if !fits {
                        continue;
                    }
                    let delta = (reference_z - candidate.avg_z).abs();
                    if delta < best_delta {
                        best_delta = delta;
                        result_z = candidate.avg_z;
                    }
                }
            }

            min_z = min_z.max(sample.avg_z);
            top_z = top_z.max(sample.avg_z);
        }

        if result_z == NO_LANDING_Z {
            return None;
        }
        let z = i8::try_from(result_z).ok()?;
        Some(Position { x, y, z })
    }

    /// Lowest floor and highest reachable step, read from the tile the
    /// step leaves. Slopes contribute the height of the edge crossed.
    fn bracket<T: TerrainOracle + ?Sized>(
        &mut self,
        terrain: &T,
        origin: Position,
        direction: Direction,
    ) -> (i32, i32) {
        let current_z = origin.z as i32;
        let mut min_z = NO_LANDING_Z;
        let mut max_z = current_z;

        if !self.load_samples(terrain, origin.x as i32, origin.y as i32) {
            return (min_z, max_z + 2);
        }
        for sample in &self.samples {
            if let Some(offsets) = sample.stretched.filter(|_| sample.avg_z <= current_z) {
                let edge_z = offsets.edge_z(direction, sample.real_z);
                min_z = min_z.max(edge_z);
                max_z = max_z.max(edge_z);
                continue;
            }

            if sample.impassable_or_surface && sample.avg_z <= current_z {
                min_z = min_z.max(sample.avg_z);
            }

            if sample.bridge && sample.avg_z == current_z {
                max_z = max_z.max(sample.z + sample.height);
                min_z = min_z.min(sample.z);
            }
        }

        (min_z, max_z + 2)
    }

    fn load_samples<T: TerrainOracle + ?Sized>(&mut self, terrain: &T, x: i32, y: i32) -> bool {
        self.occupants.clear();
        self.samples.clear();
        if !terrain.occupants_at(x, y, &mut self.occupants) {
            return false;
        }
        let state = self.step_state;
        let ignore_mobiles = self.ignore_mobiles;
        self.samples.extend(
            self.occupants
                .iter()
                .filter(|occupant| !(ignore_mobiles && matches!(occupant, Occupant::Mobile(_))))
                .filter_map(|occupant| TerrainSample::from_occupant(occupant, state)),
        );
        true
    }
}

/// One-shot form of [`CollisionResolver::try_step`] for a walker in the normal step state.
pub fn try_step<T: TerrainOracle + ?Sized>(
    terrain: &T,
    origin: Position,
    facing: Direction,
) -> Option<(Position, Direction)> {
    CollisionResolver::default().try_step(terrain, origin, facing)
}
