use std::time::Duration;

use bevy::prelude::{Rect, Vec2};
use cr_utils::{
    Direction, Facing, LandCell, LandTileFlags, MAP_BLOCK_SIZE, MapBlock, MobileUpdate, Notoriety,
    PlayerFlags, SpeedMode, Stamina, StaticTile, StaticTileFlags,
};

use super::collision::{CollisionResolver, try_step};
use super::config::MovementConfig;
use super::input::{PointerState, WalkGesture, WalkIntent, intent_from_pointer, screen_direction};
use super::reconcile::{
    AckOutcome, WalkTransport, apply_accept, apply_reject, distance_behind, is_stale,
};
use super::steps::{MAX_STEP_COUNT, StepQueue, next_sequence_after};
use super::terrain::{Stretch, TileMap};
use super::types::{Avatar, Position, StepState};
use super::walker::{FastWalkKeys, StepOutcome, Walker};

const GRASS: u16 = 0x0003;
const VOID: u16 = 0x01B0;
const WATER: u16 = 0x00A8;
const STALE_WINDOW: u8 = 32;

#[derive(Default)]
struct RecordingTransport {
    requests: Vec<(Direction, u8, bool, u32)>,
    resyncs: usize,
}

impl WalkTransport for RecordingTransport {
    fn send_walk_request(&mut self, direction: Direction, sequence: u8, running: bool, fast_walk: u32) {
        self.requests.push((direction, sequence, running, fast_walk));
    }

    fn send_resync(&mut self) {
        self.resyncs += 1;
    }
}

/// Flat grass at `z` covering tiles 88..120 on both axes.
fn flat_blocks(z: i8) -> Vec<MapBlock> {
    let cell = LandCell {
        graphic: GRASS,
        z,
        flags: LandTileFlags::default(),
    };
    let mut blocks = Vec::new();
    for by in 11..15 {
        for bx in 11..15 {
            blocks.push(MapBlock::flat(bx, by, cell));
        }
    }
    blocks
}

fn block_of(blocks: &mut [MapBlock], x: u16, y: u16) -> &mut MapBlock {
    let (bx, by) = (x / MAP_BLOCK_SIZE, y / MAP_BLOCK_SIZE);
    blocks
        .iter_mut()
        .find(|b| b.x == bx && b.y == by)
        .expect("tile outside test blocks")
}

fn set_land(blocks: &mut [MapBlock], x: u16, y: u16, cell: LandCell) {
    let block = block_of(blocks, x, y);
    *block
        .cell_mut(x % MAP_BLOCK_SIZE, y % MAP_BLOCK_SIZE)
        .expect("local cell") = cell;
}

fn place_static(blocks: &mut [MapBlock], x: u16, y: u16, z: i8, height: u8, flags: StaticTileFlags) {
    place_graphic(blocks, x, y, 0x0080, z, height, flags);
}

fn place_graphic(
    blocks: &mut [MapBlock],
    x: u16,
    y: u16,
    graphic: u16,
    z: i8,
    height: u8,
    flags: StaticTileFlags,
) {
    block_of(blocks, x, y).statics.push(StaticTile {
        graphic,
        x: (x % MAP_BLOCK_SIZE) as u8,
        y: (y % MAP_BLOCK_SIZE) as u8,
        z,
        height,
        flags,
    });
}

fn wall() -> StaticTileFlags {
    StaticTileFlags {
        impassable: true,
        ..Default::default()
    }
}

fn load(blocks: Vec<MapBlock>) -> TileMap {
    let mut map = TileMap::default();
    for block in blocks {
        assert!(map.update_block(block));
    }
    map
}

fn walker_at(position: Position, facing: Direction) -> Walker {
    let mut walker = Walker::new(MovementConfig::default());
    walker.enter_world(position, facing);
    walker
}

fn walk(direction: Direction) -> WalkIntent {
    WalkIntent {
        direction,
        run: false,
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn queue_with_steps(count: usize) -> StepQueue {
    let mut queue = StepQueue::default();
    for i in 0..count {
        queue.push(Facing::walking(Direction::South), Position::new(100, 100 + i as u16, 0));
    }
    queue
}

// Collision

#[test]
fn flat_step_keeps_elevation() {
    let map = load(flat_blocks(0));
    let result = try_step(&map, Position::new(100, 100, 0), Direction::South);
    assert_eq!(result, Some((Position::new(100, 101, 0), Direction::South)));
}

#[test]
fn flat_step_at_any_height_keeps_elevation() {
    for z in [-20i8, 0, 7, 40] {
        let map = load(flat_blocks(z));
        for direction in Direction::ALL {
            let (landing, used) = try_step(&map, Position::new(100, 100, z), direction)
                .expect("flat ground is always walkable");
            assert_eq!(landing.z, z);
            assert_eq!(used, direction);
        }
    }
}

#[test]
fn unknown_tiles_are_never_walkable() {
    let map = load(flat_blocks(0));
    // Block (15, 12) is not loaded.
    assert_eq!(try_step(&map, Position::new(119, 100, 0), Direction::East), None);
    assert_eq!(try_step(&map, Position::new(0, 0, 0), Direction::North), None);
    assert_eq!(try_step(&TileMap::default(), Position::new(5, 5, 0), Direction::South), None);
}

#[test]
fn void_land_has_no_samples() {
    let mut blocks = flat_blocks(0);
    set_land(
        &mut blocks,
        100,
        101,
        LandCell {
            graphic: VOID,
            z: 0,
            flags: LandTileFlags::default(),
        },
    );
    let map = load(blocks);
    assert_eq!(try_step(&map, Position::new(100, 100, 0), Direction::South), None);
}

#[test]
fn wall_blocks_step() {
    let mut blocks = flat_blocks(0);
    place_static(&mut blocks, 100, 101, 0, 20, wall());
    let map = load(blocks);
    assert_eq!(try_step(&map, Position::new(100, 100, 0), Direction::South), None);
}

#[test]
fn stairs_raise_the_walker() {
    let mut blocks = flat_blocks(0);
    let stairs = StaticTileFlags {
        surface: true,
        bridge: true,
        ..Default::default()
    };
    place_static(&mut blocks, 100, 101, 0, 10, stairs);
    let map = load(blocks);
    let (landing, _) = try_step(&map, Position::new(100, 100, 0), Direction::South)
        .expect("stairs are climbable");
    assert_eq!(landing.z, 5);
}

#[test]
fn ledge_too_high_to_climb() {
    let mut blocks = flat_blocks(0);
    let table = StaticTileFlags {
        surface: true,
        ..Default::default()
    };
    place_static(&mut blocks, 100, 101, 0, 10, table);
    let map = load(blocks);
    assert_eq!(try_step(&map, Position::new(100, 100, 0), Direction::South), None);
}

#[test]
fn headroom_under_an_overhang() {
    let mut low = flat_blocks(0);
    place_static(&mut low, 100, 101, 10, 5, wall());
    let low = load(low);
    assert_eq!(try_step(&low, Position::new(100, 100, 0), Direction::South), None);

    let mut high = flat_blocks(0);
    place_static(&mut high, 100, 101, 20, 5, wall());
    let high = load(high);
    assert_eq!(
        try_step(&high, Position::new(100, 100, 0), Direction::South),
        Some((Position::new(100, 101, 0), Direction::South))
    );
}

#[test]
fn diagonal_falls_back_to_clockwise_component() {
    let mut blocks = flat_blocks(0);
    place_static(&mut blocks, 101, 101, 0, 20, wall());
    let map = load(blocks);
    let result = try_step(&map, Position::new(100, 100, 0), Direction::SouthEast);
    assert_eq!(result, Some((Position::new(100, 101, 0), Direction::South)));
}

#[test]
fn diagonal_slides_along_a_wall() {
    // The diagonal tile itself is open, but the south component is not.
    let mut blocks = flat_blocks(0);
    place_static(&mut blocks, 100, 101, 0, 20, wall());
    let map = load(blocks);
    let result = try_step(&map, Position::new(100, 100, 0), Direction::SouthEast);
    assert_eq!(result, Some((Position::new(101, 100, 0), Direction::East)));
}

#[test]
fn diagonal_boxed_in_is_blocked() {
    let mut blocks = flat_blocks(0);
    for (x, y) in [(100, 101), (101, 100), (101, 101)] {
        place_static(&mut blocks, x, y, 0, 20, wall());
    }
    let map = load(blocks);
    assert_eq!(try_step(&map, Position::new(100, 100, 0), Direction::SouthEast), None);
}

#[test]
fn mobiles_block_unless_dead_or_ghost() {
    let mut map = load(flat_blocks(0));
    map.update_mobile(MobileUpdate {
        serial: 7,
        x: 100,
        y: 101,
        z: 0,
        dead: false,
        ignore_mobiles: false,
    });
    let origin = Position::new(100, 100, 0);
    assert_eq!(try_step(&map, origin, Direction::South), None);

    let mut ghost = CollisionResolver::new(StepState::DeadOrGm);
    assert!(ghost.try_step(&map, origin, Direction::South).is_some());

    map.update_mobile(MobileUpdate {
        serial: 7,
        x: 100,
        y: 101,
        z: 0,
        dead: true,
        ignore_mobiles: false,
    });
    assert!(try_step(&map, origin, Direction::South).is_some());

    map.update_mobile(MobileUpdate {
        serial: 7,
        x: 100,
        y: 101,
        z: 0,
        dead: false,
        ignore_mobiles: false,
    });
    assert!(map.remove_mobile(7));
    assert!(!map.remove_mobile(7));
    assert!(try_step(&map, origin, Direction::South).is_some());
}

#[test]
fn ghosts_pass_doors() {
    let mut blocks = flat_blocks(0);
    let door = StaticTileFlags {
        impassable: true,
        door: true,
        ..Default::default()
    };
    place_static(&mut blocks, 100, 101, 0, 20, door);
    let map = load(blocks);
    let origin = Position::new(100, 100, 0);
    assert_eq!(try_step(&map, origin, Direction::South), None);
    let mut ghost = CollisionResolver::new(StepState::DeadOrGm);
    assert!(ghost.try_step(&map, origin, Direction::South).is_some());
}

#[test]
fn energy_fields_never_block() {
    let mut blocks = flat_blocks(0);
    place_graphic(&mut blocks, 100, 101, 0x3946, 0, 20, wall());
    let map = load(blocks);
    assert!(try_step(&map, Position::new(100, 100, 0), Direction::South).is_some());
}

#[test]
fn sea_horse_swims_on_wet_land_only() {
    let water = LandCell {
        graphic: WATER,
        z: -5,
        flags: LandTileFlags {
            impassable: true,
            wet: true,
            ..Default::default()
        },
    };
    let mut blocks = flat_blocks(-5);
    for block in &mut blocks {
        block.cells.fill(water);
    }
    let map = load(blocks);
    let origin = Position::new(100, 100, -5);
    assert_eq!(try_step(&map, origin, Direction::South), None);
    let mut rider = CollisionResolver::new(StepState::OnSeaHorse);
    assert_eq!(
        rider.try_step(&map, origin, Direction::South),
        Some((Position::new(100, 101, -5), Direction::South))
    );
}

#[test]
fn flying_snaps_onto_hover_surface() {
    let mut blocks = flat_blocks(0);
    let hover = StaticTileFlags {
        no_diagonal: true,
        ..Default::default()
    };
    place_static(&mut blocks, 100, 101, 10, 0, hover);
    let map = load(blocks);
    let mut flyer = CollisionResolver::new(StepState::Flying);
    let (landing, _) = flyer
        .try_step(&map, Position::new(100, 100, 0), Direction::South)
        .expect("hover surface in range");
    assert_eq!(landing.z, 10);
}

#[test]
fn stretch_splits_along_flatter_diagonal() {
    let stretch = Stretch::from_corners(0, 4, 8, 4);
    assert_eq!(stretch.min_z, 0);
    assert_eq!(stretch.avg_z, 4);
    assert_eq!(stretch.offsets.bottom, 32);

    let steep = Stretch::from_corners(0, 10, 2, 0);
    assert_eq!(steep.avg_z, 1);
}

#[test]
fn stretched_edge_heights() {
    let offsets = Stretch::from_corners(0, 4, 8, 4).offsets;
    assert_eq!(offsets.edge_z(Direction::North, 0), 2);
    assert_eq!(offsets.edge_z(Direction::South, 0), 6);
    assert_eq!(offsets.edge_z(Direction::SouthEast, 0), 8);
    assert_eq!(offsets.edge_z(Direction::NorthWest, 0), 0);
}

#[test]
fn stepping_onto_a_slope_lands_on_its_average() {
    let mut blocks = flat_blocks(0);
    let slope = LandCell {
        graphic: GRASS,
        z: 0,
        flags: LandTileFlags {
            stretchable: true,
            ..Default::default()
        },
    };
    let raised = |z| LandCell {
        graphic: GRASS,
        z,
        flags: LandTileFlags::default(),
    };
    set_land(&mut blocks, 100, 101, slope);
    set_land(&mut blocks, 101, 101, raised(4));
    set_land(&mut blocks, 100, 102, raised(4));
    set_land(&mut blocks, 101, 102, raised(8));
    let map = load(blocks);

    assert!(map.stretch_at(100, 101).is_some());
    assert!(map.stretch_at(100, 100).is_none());
    let (landing, _) = try_step(&map, Position::new(100, 100, 0), Direction::South)
        .expect("slope is walkable");
    assert_eq!(landing.z, 4);
}

fn grass(z: i8) -> LandCell {
    LandCell {
        graphic: GRASS,
        z,
        flags: LandTileFlags::default(),
    }
}

fn sloped_grass(z: i8) -> LandCell {
    LandCell {
        flags: LandTileFlags {
            stretchable: true,
            ..Default::default()
        },
        ..grass(z)
    }
}

#[test]
fn slopes_beside_the_path_do_not_help_climbing() {
    let table = StaticTileFlags {
        surface: true,
        ..Default::default()
    };
    let mut blocks = flat_blocks(0);
    place_static(&mut blocks, 100, 101, 0, 15, table);
    // (99,101) leans up towards its left corner at (99,102).
    set_land(&mut blocks, 99, 101, sloped_grass(0));
    set_land(&mut blocks, 99, 102, grass(30));
    let map = load(blocks);

    assert!(map.stretch_at(99, 101).is_some());
    assert_eq!(try_step(&map, Position::new(100, 100, 0), Direction::South), None);
}

#[test]
fn stair_top_reaches_the_floor_above() {
    let stairs = StaticTileFlags {
        surface: true,
        bridge: true,
        ..Default::default()
    };
    let floor = StaticTileFlags {
        surface: true,
        ..Default::default()
    };
    let mut blocks = flat_blocks(0);
    place_static(&mut blocks, 100, 100, 0, 10, stairs);
    place_static(&mut blocks, 100, 101, 10, 0, floor);
    let map = load(blocks);

    assert_eq!(
        try_step(&map, Position::new(100, 100, 5), Direction::South),
        Some((Position::new(100, 101, 10), Direction::South))
    );
}

#[test]
fn floor_above_is_out_of_reach_without_stairs() {
    let floor = StaticTileFlags {
        surface: true,
        ..Default::default()
    };
    let mut blocks = flat_blocks(0);
    place_static(&mut blocks, 100, 100, 5, 0, floor);
    place_static(&mut blocks, 100, 101, 10, 0, floor);
    let map = load(blocks);

    assert_eq!(try_step(&map, Position::new(100, 100, 5), Direction::South), None);
}

#[test]
fn sloped_origin_climbs_by_its_edge_height() {
    let mut flat = flat_blocks(0);
    set_land(&mut flat, 100, 100, grass(4));
    set_land(&mut flat, 100, 101, grass(8));
    let flat = load(flat);
    assert_eq!(try_step(&flat, Position::new(100, 100, 4), Direction::South), None);

    // Corners: top 0, right 0, bottom 8, left 8. The south edge sits at 8.
    let mut slope = flat_blocks(0);
    set_land(&mut slope, 100, 100, sloped_grass(0));
    set_land(&mut slope, 100, 101, grass(8));
    set_land(&mut slope, 101, 101, grass(8));
    let slope = load(slope);
    assert_eq!(slope.stretch_at(100, 100).map(|s| s.avg_z), Some(4));
    assert_eq!(
        try_step(&slope, Position::new(100, 100, 4), Direction::South),
        Some((Position::new(100, 101, 8), Direction::South))
    );
}

#[test]
fn malformed_blocks_are_dropped() {
    let mut map = TileMap::default();
    let mut block = MapBlock::flat(1, 1, LandCell::default());
    block.cells.pop();
    assert!(!map.update_block(block));
    assert_eq!(map.block_count(), 0);

    assert!(map.update_block(MapBlock::flat(1, 1, LandCell::default())));
    assert!(map.has_block(1, 1));
    assert!(map.unload_block(1, 1));
    assert!(!map.has_block(1, 1));
}

// Step queue and reconciliation

#[test]
fn sequences_skip_zero_after_wrapping() {
    assert_eq!(next_sequence_after(0), 1);
    assert_eq!(next_sequence_after(254), 255);
    assert_eq!(next_sequence_after(255), 1);

    let mut queue = StepQueue::default();
    let mut seen = Vec::new();
    for _ in 0..257 {
        let step = queue
            .push(Facing::walking(Direction::North), Position::default())
            .expect("queue drained every iteration");
        seen.push(step.sequence);
        assert_eq!(queue.pop_through(0), 1);
    }
    assert_eq!(&seen[..3], &[0, 1, 2]);
    assert_eq!(&seen[254..], &[254, 255, 1]);
}

#[test]
fn queue_is_bounded() {
    let mut queue = queue_with_steps(MAX_STEP_COUNT);
    assert!(queue.is_full());
    assert_eq!(
        queue.push(Facing::walking(Direction::South), Position::default()),
        None
    );
    assert_eq!(queue.len(), MAX_STEP_COUNT);
}

#[test]
fn accept_pops_through_the_match() {
    let mut queue = queue_with_steps(3);
    let mut transport = RecordingTransport::default();
    for seq in 0..3 {
        apply_accept(&mut queue, seq, STALE_WINDOW, &mut transport);
    }
    for _ in 0..3 {
        queue.push(Facing::walking(Direction::South), Position::default());
    }
    let sequences: Vec<u8> = queue.steps().iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![3, 4, 5]);

    let outcome = apply_accept(&mut queue, 4, STALE_WINDOW, &mut transport);
    assert_eq!(outcome, AckOutcome::Confirmed { popped: 2 });
    let sequences: Vec<u8> = queue.steps().iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![5]);
    assert_eq!(transport.resyncs, 0);
}

#[test]
fn accepting_every_step_in_order_empties_the_queue() {
    for count in 1..=MAX_STEP_COUNT {
        let mut queue = queue_with_steps(count);
        let mut transport = RecordingTransport::default();
        for seq in 0..count as u8 {
            assert!(matches!(
                apply_accept(&mut queue, seq, STALE_WINDOW, &mut transport),
                AckOutcome::Confirmed { popped: 1 }
            ));
        }
        assert!(queue.is_empty());
        assert_eq!(transport.resyncs, 0);
    }
}

#[test]
fn repeated_accept_is_a_no_op() {
    let mut queue = queue_with_steps(3);
    let mut transport = RecordingTransport::default();
    apply_accept(&mut queue, 0, STALE_WINDOW, &mut transport);
    apply_accept(&mut queue, 1, STALE_WINDOW, &mut transport);
    let before: Vec<_> = queue.steps().to_vec();

    for seq in [0, 1] {
        assert_eq!(
            apply_accept(&mut queue, seq, STALE_WINDOW, &mut transport),
            AckOutcome::Stale
        );
    }
    assert_eq!(queue.steps(), before.as_slice());
    assert_eq!(transport.resyncs, 0);
}

#[test]
fn stale_accept_on_empty_queue_is_ignored() {
    let mut queue = queue_with_steps(5);
    let mut transport = RecordingTransport::default();
    for seq in 0..5 {
        apply_accept(&mut queue, seq, STALE_WINDOW, &mut transport);
    }
    queue.push(Facing::walking(Direction::South), Position::default());
    queue.push(Facing::walking(Direction::South), Position::default());
    apply_accept(&mut queue, 6, STALE_WINDOW, &mut transport);
    assert!(queue.is_empty());
    assert_eq!(queue.next_sequence(), 7);

    assert_eq!(
        apply_accept(&mut queue, 3, STALE_WINDOW, &mut transport),
        AckOutcome::Stale
    );
    assert_eq!(transport.resyncs, 0);
    assert_eq!(queue.next_sequence(), 7);
}

#[test]
fn unknown_accept_resyncs_once() {
    let mut queue = StepQueue::default();
    let mut transport = RecordingTransport::default();
    for seq in 0..9 {
        queue.push(Facing::walking(Direction::South), Position::default());
        apply_accept(&mut queue, seq, STALE_WINDOW, &mut transport);
    }
    queue.push(Facing::walking(Direction::South), Position::default());
    assert_eq!(queue.steps().first().map(|s| s.sequence), Some(9));

    assert_eq!(
        apply_accept(&mut queue, 200, STALE_WINDOW, &mut transport),
        AckOutcome::Desync { resync_sent: true }
    );
    assert!(queue.is_empty());
    assert!(queue.resync_in_flight());
    assert_eq!(transport.resyncs, 1);

    assert_eq!(
        apply_accept(&mut queue, 150, STALE_WINDOW, &mut transport),
        AckOutcome::Desync { resync_sent: false }
    );
    assert_eq!(transport.resyncs, 1);

    // A confirmed step after recovery re-arms the resync.
    queue.push(Facing::walking(Direction::South), Position::default());
    apply_accept(&mut queue, 0, STALE_WINDOW, &mut transport);
    assert!(!queue.resync_in_flight());
}

#[test]
fn staleness_is_wrap_aware() {
    assert_eq!(distance_behind(5, 0), None);
    assert_eq!(distance_behind(0, 4), Some(4));
    assert_eq!(distance_behind(250, 3), Some(8));
    assert!(is_stale(250, 3, STALE_WINDOW));
    assert!(is_stale(3, 7, STALE_WINDOW));
    assert!(!is_stale(7, 7, STALE_WINDOW));
    assert!(!is_stale(200, 10, STALE_WINDOW));
    assert!(!is_stale(8, 7, STALE_WINDOW));
}

#[test]
fn reject_snaps_to_server_state() {
    for count in 0..=MAX_STEP_COUNT {
        let mut queue = queue_with_steps(count);
        let mut avatar = Avatar::default();
        let position = Position::new(42, 43, -3);
        let facing = Facing::new(Direction::West, true);
        apply_reject(&mut queue, &mut avatar, position, facing);
        assert!(queue.is_empty());
        assert_eq!(queue.next_sequence(), 0);
        assert_eq!(avatar.position, position);
        assert_eq!(avatar.facing, Direction::West);
    }
}

// Walker

#[test]
fn walker_moves_then_cools_down() {
    let map = load(flat_blocks(0));
    let mut walker = walker_at(Position::new(100, 100, 0), Direction::South);
    let mut transport = RecordingTransport::default();

    let outcome = walker.request_step(ms(0), walk(Direction::South), &map, &mut transport);
    let StepOutcome::Moved(step) = outcome else {
        panic!("expected a move, got {outcome:?}");
    };
    assert_eq!(step.sequence, 0);
    assert_eq!(step.position(), Position::new(100, 101, 0));
    assert_eq!(walker.predicted_position(), Position::new(100, 101, 0));
    assert_eq!(walker.avatar.position, Position::new(100, 100, 0));

    assert_eq!(
        walker.request_step(ms(399), walk(Direction::South), &map, &mut transport),
        StepOutcome::CoolingDown
    );
    assert!(matches!(
        walker.request_step(ms(400), walk(Direction::South), &map, &mut transport),
        StepOutcome::Moved(_)
    ));
    assert_eq!(
        transport.requests,
        vec![
            (Direction::South, 0, false, 0),
            (Direction::South, 1, false, 0)
        ]
    );
}

#[test]
fn walker_turns_before_moving() {
    let map = load(flat_blocks(0));
    let mut walker = walker_at(Position::new(100, 100, 0), Direction::South);
    let mut transport = RecordingTransport::default();

    let StepOutcome::Turned(turn) =
        walker.request_step(ms(0), walk(Direction::East), &map, &mut transport)
    else {
        panic!("expected a turn");
    };
    assert_eq!(turn.position(), Position::new(100, 100, 0));
    assert_eq!(walker.predicted_facing(), Direction::East);
    assert_eq!(walker.queue().due_at(), ms(100));

    assert_eq!(
        walker.request_step(ms(100), walk(Direction::East), &map, &mut transport),
        StepOutcome::Moved(super::steps::PendingStep {
            sequence: 1,
            direction: Facing::walking(Direction::East),
            x: 101,
            y: 100,
            z: 0,
        })
    );
}

#[test]
fn walker_turns_towards_blocked_tiles_once() {
    let mut blocks = flat_blocks(0);
    place_static(&mut blocks, 100, 101, 0, 20, wall());
    let map = load(blocks);
    let mut walker = walker_at(Position::new(100, 100, 0), Direction::North);
    let mut transport = RecordingTransport::default();

    assert!(matches!(
        walker.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Turned(_)
    ));
    assert_eq!(
        walker.request_step(ms(500), walk(Direction::South), &map, &mut transport),
        StepOutcome::Blocked
    );
    assert_eq!(transport.requests.len(), 1);
}

fn map_with_bystander() -> TileMap {
    let mut map = load(flat_blocks(0));
    map.update_mobile(MobileUpdate {
        serial: 7,
        x: 100,
        y: 101,
        z: 0,
        dead: false,
        ignore_mobiles: false,
    });
    map
}

#[test]
fn tired_walker_goes_around_mobiles() {
    let map = map_with_bystander();
    let mut transport = RecordingTransport::default();

    let mut unknown = walker_at(Position::new(100, 100, 0), Direction::South);
    assert_eq!(
        unknown.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Blocked
    );

    let mut tired = walker_at(Position::new(100, 100, 0), Direction::South);
    tired.set_stamina(Stamina {
        current: 40,
        max: 100,
    });
    assert_eq!(
        tired.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Blocked
    );

    tired.set_map_index(1);
    assert!(matches!(
        tired.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Moved(step) if step.position() == Position::new(100, 101, 0)
    ));
}

#[test]
fn rested_walker_shoves_through_mobiles() {
    let map = map_with_bystander();
    let mut transport = RecordingTransport::default();

    let mut rested = walker_at(Position::new(100, 100, 0), Direction::South);
    rested.set_stamina(Stamina {
        current: 100,
        max: 100,
    });
    assert!(matches!(
        rested.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Moved(_)
    ));

    let mut flagged = walker_at(Position::new(100, 100, 0), Direction::South);
    flagged.set_flags(PlayerFlags {
        ignore_mobiles: true,
        ..Default::default()
    });
    assert!(matches!(
        flagged.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Moved(_)
    ));

    let mut configured = Walker::new(MovementConfig {
        ignore_stamina_check: true,
        ..Default::default()
    });
    configured.enter_world(Position::new(100, 100, 0), Direction::South);
    assert!(matches!(
        configured.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Moved(_)
    ));

    // Leaving the world forgets the last stamina report.
    rested.leave_world();
    rested.enter_world(Position::new(100, 100, 0), Direction::South);
    assert_eq!(
        rested.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::Blocked
    );
}

#[test]
fn mobiles_flagged_to_ignore_others_never_block() {
    let mut map = load(flat_blocks(0));
    map.update_mobile(MobileUpdate {
        serial: 8,
        x: 100,
        y: 101,
        z: 0,
        dead: false,
        ignore_mobiles: true,
    });
    assert!(try_step(&map, Position::new(100, 100, 0), Direction::South).is_some());
}

#[test]
fn walker_saturates_at_max_steps() {
    let map = load(flat_blocks(0));
    let mut walker = walker_at(Position::new(100, 100, 0), Direction::South);
    let mut transport = RecordingTransport::default();

    let mut now = ms(0);
    for _ in 0..MAX_STEP_COUNT {
        assert!(matches!(
            walker.request_step(now, walk(Direction::South), &map, &mut transport),
            StepOutcome::Moved(_)
        ));
        now += ms(400);
    }
    assert_eq!(
        walker.request_step(now, walk(Direction::South), &map, &mut transport),
        StepOutcome::Saturated
    );
    assert_eq!(walker.predicted_position(), Position::new(100, 105, 0));

    assert!(matches!(
        walker.on_step_accepted(0, Notoriety::Innocent, &mut transport),
        AckOutcome::Confirmed { popped: 1 }
    ));
    assert_eq!(walker.avatar.notoriety, Notoriety::Innocent);
    assert!(matches!(
        walker.request_step(now, walk(Direction::South), &map, &mut transport),
        StepOutcome::Moved(_)
    ));
}

#[test]
fn speed_depends_on_mount_and_mode() {
    let map = load(flat_blocks(0));
    let mut transport = RecordingTransport::default();
    let run = WalkIntent {
        direction: Direction::South,
        run: true,
    };

    let mut walker = walker_at(Position::new(100, 100, 0), Direction::South);
    walker.request_step(ms(0), run, &map, &mut transport);
    assert_eq!(walker.queue().due_at(), ms(200));

    let mut rider = walker_at(Position::new(100, 100, 0), Direction::South);
    rider.set_flags(PlayerFlags {
        mounted: true,
        ..Default::default()
    });
    rider.request_step(ms(0), run, &map, &mut transport);
    assert_eq!(rider.queue().due_at(), ms(100));

    let mut tired = walker_at(Position::new(100, 100, 0), Direction::South);
    tired.set_speed_mode(SpeedMode::CantRun);
    tired.request_step(ms(0), run, &map, &mut transport);
    assert_eq!(tired.queue().due_at(), ms(400));
    assert_eq!(transport.requests.last(), Some(&(Direction::South, 0, false, 0)));
}

#[test]
fn walker_rejection_restores_server_position() {
    let map = load(flat_blocks(0));
    let mut walker = walker_at(Position::new(100, 100, 0), Direction::South);
    let mut transport = RecordingTransport::default();
    walker.request_step(ms(0), walk(Direction::South), &map, &mut transport);
    walker.request_step(ms(400), walk(Direction::South), &map, &mut transport);

    walker.on_step_rejected(Position::new(100, 100, 0), Facing::walking(Direction::North));
    assert!(walker.queue().is_empty());
    assert_eq!(walker.predicted_position(), Position::new(100, 100, 0));
    assert_eq!(walker.predicted_facing(), Direction::North);

    // Sequencing restarts and the cooldown is cleared.
    let outcome = walker.request_step(ms(401), walk(Direction::North), &map, &mut transport);
    assert!(matches!(outcome, StepOutcome::Moved(step) if step.sequence == 0));
}

#[test]
fn walker_ignores_everything_outside_the_world() {
    let map = load(flat_blocks(0));
    let mut walker = Walker::new(MovementConfig::default());
    let mut transport = RecordingTransport::default();
    assert_eq!(
        walker.request_step(ms(0), walk(Direction::South), &map, &mut transport),
        StepOutcome::OutOfWorld
    );
    assert_eq!(
        walker.on_step_accepted(3, Notoriety::Enemy, &mut transport),
        AckOutcome::Stale
    );

    walker.enter_world(Position::new(100, 100, 0), Direction::South);
    walker.request_step(ms(0), walk(Direction::South), &map, &mut transport);
    walker.leave_world();
    assert!(!walker.in_world());
    assert!(walker.queue().is_empty());
    assert_eq!(transport.resyncs, 0);
}

#[test]
fn fast_walk_keys_are_spent_in_order() {
    let mut keys = FastWalkKeys::default();
    keys.set_all(&[11, 22]);
    keys.add(33);
    assert_eq!(keys.take(), 11);
    assert_eq!(keys.take(), 22);
    assert_eq!(keys.take(), 33);
    assert_eq!(keys.take(), 0);

    // Refills land in the first free slot.
    keys.set_all(&[11, 22]);
    assert_eq!(keys.take(), 11);
    keys.add(44);
    assert_eq!(keys.take(), 44);
    assert_eq!(keys.take(), 22);

    let map = load(flat_blocks(0));
    let mut walker = walker_at(Position::new(100, 100, 0), Direction::South);
    let mut transport = RecordingTransport::default();
    walker.fast_walk_keys_mut().set_all(&[0xDEAD_BEEF]);
    walker.request_step(ms(0), walk(Direction::South), &map, &mut transport);
    walker.request_step(ms(400), walk(Direction::South), &map, &mut transport);
    assert_eq!(transport.requests[0].3, 0xDEAD_BEEF);
    assert_eq!(transport.requests[1].3, 0);
}

// Input

fn viewport() -> Rect {
    Rect::new(0.0, 0.0, 800.0, 600.0)
}

#[test]
fn pointer_buckets_into_eight_directions() {
    let center = Vec2::new(400.0, 300.0);
    let at = |dx: f32, dy: f32| screen_direction(center, center + Vec2::new(dx, dy));
    assert_eq!(at(0.0, 0.0), Direction::NorthEast);
    assert_eq!(at(0.0, -50.0), Direction::North);
    assert_eq!(at(50.0, 0.0), Direction::East);
    assert_eq!(at(100.0, 100.0), Direction::SouthEast);
    assert_eq!(at(-100.0, -100.0), Direction::NorthWest);
    assert_eq!(at(100.0, 20.0), Direction::East);
    assert_eq!(at(-20.0, 100.0), Direction::South);
}

#[test]
fn pointer_intent_is_rotated_into_world_space() {
    let center = viewport().center();
    let near = intent_from_pointer(viewport(), center + Vec2::new(0.0, -50.0), 190.0);
    assert_eq!(
        near,
        WalkIntent {
            direction: Direction::NorthWest,
            run: false
        }
    );

    let far = intent_from_pointer(viewport(), center + Vec2::new(250.0, 0.0), 190.0);
    assert_eq!(
        far,
        WalkIntent {
            direction: Direction::NorthEast,
            run: true
        }
    );

    // Dead centre walks north whatever the current facing.
    let centred = intent_from_pointer(viewport(), center, 190.0);
    assert_eq!(centred.direction, Direction::North);
    assert!(!centred.run);
}

#[test]
fn walk_lock_holds_until_next_right_press() {
    let mut gesture = WalkGesture::default();
    let inside = Vec2::new(400.0, 500.0);
    let press = PointerState {
        position: inside,
        left: false,
        right: true,
        right_just_pressed: true,
    };
    assert!(gesture.update(&press, viewport(), true));

    let both = PointerState {
        left: true,
        right_just_pressed: false,
        ..press
    };
    assert!(gesture.update(&both, viewport(), true));
    assert!(gesture.is_locked());

    let released = PointerState {
        position: inside,
        ..Default::default()
    };
    assert!(gesture.update(&released, viewport(), true));

    assert!(gesture.update(&press, viewport(), true));
    assert!(!gesture.is_locked());
    assert!(!gesture.update(&released, viewport(), true));
}

#[test]
fn walking_needs_a_press_inside_the_viewport() {
    let mut gesture = WalkGesture::default();
    let outside = PointerState {
        position: Vec2::new(900.0, 700.0),
        right: true,
        right_just_pressed: true,
        ..Default::default()
    };
    assert!(!gesture.update(&outside, viewport(), true));

    let mut gesture = WalkGesture::default();
    let both = PointerState {
        position: Vec2::new(10.0, 10.0),
        left: true,
        right: true,
        right_just_pressed: true,
    };
    gesture.update(&both, viewport(), false);
    assert!(!gesture.is_locked());
}

#[test]
fn walker_tick_follows_the_pointer() {
    let map = load(flat_blocks(0));
    let mut walker = walker_at(Position::new(100, 100, 0), Direction::South);
    let mut transport = RecordingTransport::default();
    let idle = PointerState::default();
    assert_eq!(
        walker.tick(ms(0), &idle, viewport(), &map, &mut transport),
        StepOutcome::Idle
    );

    // Straight down on screen is south-west in the world.
    let pointer = PointerState {
        position: Vec2::new(400.0, 400.0),
        right: true,
        right_just_pressed: true,
        ..Default::default()
    };
    assert!(matches!(
        walker.tick(ms(0), &pointer, viewport(), &map, &mut transport),
        StepOutcome::Turned(step) if step.direction.direction == Direction::SouthWest
    ));
    let held = PointerState {
        right_just_pressed: false,
        ..pointer
    };
    assert!(matches!(
        walker.tick(ms(100), &held, viewport(), &map, &mut transport),
        StepOutcome::Moved(step) if step.position() == Position::new(99, 101, 0)
    ));
}
