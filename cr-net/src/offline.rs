use cr_sim::steps::next_sequence_after;
use cr_sim::{CollisionResolver, Position, TileMap};
use cr_utils::{
    Direction, Facing, FromNetMessage, MapBlock, MobileUpdate, Notoriety, PlayerFlags,
    PlayerPosition, SpeedMode, ToNetMessage,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::demo_map::{self, DEMO_SEED, SPAWN};

const FAST_WALK_KEYS: usize = cr_sim::MAX_STEP_COUNT;

/// In-process authority for the walk handshake. Holds the real position and
/// validates every request against its own copy of the map.
pub struct OfflineShard {
    blocks: Vec<MapBlock>,
    mobiles: Vec<MobileUpdate>,
    map: TileMap,
    resolver: CollisionResolver,
    position: Position,
    facing: Direction,
    flags: PlayerFlags,
    expected_sequence: u8,
    rng: StdRng,
}

impl OfflineShard {
    pub fn new(blocks: Vec<MapBlock>, mobiles: Vec<MobileUpdate>, spawn: Position, seed: u64) -> Self {
        let mut map = TileMap::default();
        for block in &blocks {
            map.update_block(block.clone());
        }
        for mobile in &mobiles {
            map.update_mobile(*mobile);
        }
        Self {
            blocks,
            mobiles,
            map,
            resolver: CollisionResolver::default(),
            position: spawn,
            facing: Direction::South,
            flags: PlayerFlags::default(),
            expected_sequence: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn demo() -> Self {
        Self::new(
            demo_map::generate(DEMO_SEED),
            demo_map::demo_mobiles(),
            SPAWN,
            DEMO_SEED,
        )
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn expected_sequence(&self) -> u8 {
        self.expected_sequence
    }

    fn player_position(&self) -> PlayerPosition {
        PlayerPosition {
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            facing: Facing::walking(self.facing),
        }
    }

    fn next_key(&mut self) -> u32 {
        self.rng.gen_range(1..=u32::MAX)
    }

    /// Everything a client needs before it can walk: terrain, bystanders,
    /// player state and the first batch of fast-walk keys.
    pub fn greeting(&mut self) -> Vec<FromNetMessage> {
        let mut messages = vec![FromNetMessage::Connected];
        messages.extend(self.blocks.iter().cloned().map(FromNetMessage::MapBlock));
        messages.extend(self.mobiles.iter().copied().map(FromNetMessage::MobileMoved));
        messages.push(FromNetMessage::PlayerFlags(self.flags));
        messages.push(FromNetMessage::SpeedMode(SpeedMode::Normal));
        let keys = (0..FAST_WALK_KEYS).map(|_| self.next_key()).collect();
        messages.push(FromNetMessage::FastWalkKeys(keys));
        messages.push(FromNetMessage::EnterWorld(self.player_position()));
        info!(
            blocks = self.blocks.len(),
            x = self.position.x,
            y = self.position.y,
            "offline shard ready"
        );
        messages
    }

    pub fn handle(&mut self, msg: &ToNetMessage) -> Vec<FromNetMessage> {
        match *msg {
            ToNetMessage::WalkRequest {
                direction,
                sequence,
                fast_walk,
                ..
            } => self.walk(direction, sequence, fast_walk),
            ToNetMessage::Resync => {
                debug!("resync requested");
                self.expected_sequence = 0;
                vec![FromNetMessage::PlayerPosition(self.player_position())]
            }
            _ => Vec::new(),
        }
    }

    fn walk(&mut self, direction: Direction, sequence: u8, fast_walk: u32) -> Vec<FromNetMessage> {
        if sequence != self.expected_sequence {
            debug!(
                sequence,
                expected = self.expected_sequence,
                "walk request out of order"
            );
            return vec![self.reject(sequence)];
        }

        if direction != self.facing {
            self.facing = direction;
        } else {
            match self.resolver.try_step(&self.map, self.position, direction) {
                Some((landing, used)) if used == direction => self.position = landing,
                _ => {
                    debug!(sequence, ?direction, "walk request blocked");
                    return vec![self.reject(sequence)];
                }
            }
        }

        self.expected_sequence = next_sequence_after(sequence);
        let mut replies = vec![FromNetMessage::StepAccepted {
            sequence,
            notoriety: Notoriety::Innocent,
        }];
        if fast_walk != 0 {
            replies.push(FromNetMessage::FastWalkKey(self.next_key()));
        }
        replies
    }

    fn reject(&mut self, sequence: u8) -> FromNetMessage {
        self.expected_sequence = 0;
        FromNetMessage::StepRejected {
            sequence,
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            facing: Facing::walking(self.facing),
        }
    }
}
