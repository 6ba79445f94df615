use std::time::Duration;

use crystal_run_core::{
    Command, Event, InstanceTag, PathAnchor, RunPhase, Viewport, WorldPosition,
};
use crystal_run_system_path_generation::{Config, PathGenerator};
use crystal_run_system_session::{Session, SessionInput};
use crystal_run_world::{self as world, query, World};

const CADENCE: Duration = Duration::from_millis(100);
const TICK: Duration = Duration::from_millis(150);

fn config(preroll_tile_count: u32, pickup_probability: f32, rng_seed: u64) -> Config {
    Config::new(
        PathAnchor::new(0, 0),
        1.0,
        preroll_tile_count,
        CADENCE,
        CADENCE,
        rng_seed,
    )
    .with_pickup_probability(pickup_probability)
}

fn prepared_world() -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureTrack {
            start_anchor: PathAnchor::new(0, 0),
            tile_length: 1.0,
            tile_half_height: 0.5,
            pickup_half_height: 0.25,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::PopulatePools {
            tiles: 128,
            pickups: 64,
        },
        &mut events,
    );
    world
}

fn wide_viewport() -> Viewport {
    // Wide enough that the path never reaches a bound.
    Viewport::new(WorldPosition::new(0.0, 0.0), 100.0)
}

/// Advances one tick and pumps the generator to a command fixpoint,
/// returning every event the tick produced.
fn pump(
    world: &mut World,
    generator: &mut PathGenerator,
    viewport: &Viewport,
    dt: Duration,
) -> Vec<Event> {
    let mut all_events = Vec::new();
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);

    loop {
        all_events.extend(events.iter().cloned());
        let mut commands = Vec::new();
        generator.handle(&events, query::run_phase(world), viewport, &mut commands);
        if commands.is_empty() {
            break;
        }
        events.clear();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }

    all_events
}

fn expendable_tiles(world: &World) -> usize {
    query::tile_view(world)
        .iter()
        .filter(|tile| tile.tag == InstanceTag::Expendable)
        .count()
}

#[test]
fn preroll_places_exactly_the_configured_count() {
    for preroll_count in [1_u32, 2, 5, 8] {
        let mut world = prepared_world();
        let viewport = wide_viewport();
        let mut generator = PathGenerator::new(config(preroll_count, 0.0, 7)).expect("valid");

        for _ in 0..preroll_count {
            let _ = pump(&mut world, &mut generator, &viewport, TICK);
        }
        assert_eq!(query::run_phase(&world), RunPhase::Idle);
        assert_eq!(expendable_tiles(&world), preroll_count as usize);

        // Further ticks in idle place nothing.
        let _ = pump(&mut world, &mut generator, &viewport, TICK);
        assert_eq!(expendable_tiles(&world), preroll_count as usize);
    }
}

#[test]
fn scenario_three_preroll_steps_with_guaranteed_pickups() {
    let mut world = prepared_world();
    let viewport = wide_viewport();
    let mut generator = PathGenerator::new(config(3, 1.0, 42)).expect("valid");

    for _ in 0..3 {
        let _ = pump(&mut world, &mut generator, &viewport, TICK);
    }

    assert_eq!(query::run_phase(&world), RunPhase::Idle);
    assert_eq!(expendable_tiles(&world), 3);

    let pickups = query::pickup_view(&world).into_vec();
    assert_eq!(pickups.len(), 3);
    for pickup in &pickups {
        assert!(pickup.parent.is_some(), "pickup chained to its fresh tile");
    }
}

#[test]
fn first_placement_of_a_run_is_forced_forward() {
    let mut world = prepared_world();
    let viewport = wide_viewport();
    let mut generator = PathGenerator::new(config(3, 0.0, 9)).expect("valid");

    let events = pump(&mut world, &mut generator, &viewport, TICK);
    assert!(events.contains(&Event::TilePlaced {
        tile: query::tile_at(&world, PathAnchor::new(1, 0)).expect("forward tile"),
        anchor: PathAnchor::new(1, 0),
    }));
    assert_eq!(generator.cursor(), PathAnchor::new(1, 0));
}

#[test]
fn at_most_one_placement_per_tick_even_for_a_huge_dt() {
    let mut world = prepared_world();
    let viewport = wide_viewport();
    let mut generator = PathGenerator::new(config(5, 0.0, 3)).expect("valid");

    let events = pump(&mut world, &mut generator, &viewport, Duration::from_secs(10));
    let placements = events
        .iter()
        .filter(|event| matches!(event, Event::TilePlaced { .. }))
        .count();
    assert_eq!(placements, 1);
}

#[test]
fn viewport_redirect_flips_a_direction_that_would_leave_the_band() {
    let mut world = prepared_world();
    // Narrow band: the forced forward first step projects at ~0.32, below
    // the 0.4 bound, so the step must redirect to the right axis.
    let viewport = Viewport::new(WorldPosition::new(0.0, 0.0), 2.0);
    let mut generator = PathGenerator::new(
        config(1, 0.0, 11).with_viewport_bounds(0.4, 1.0),
    )
    .expect("valid");

    let _ = pump(&mut world, &mut generator, &viewport, TICK);

    assert!(query::tile_at(&world, PathAnchor::new(1, 0)).is_none());
    assert!(query::tile_at(&world, PathAnchor::new(0, 1)).is_some());
    assert_eq!(generator.cursor(), PathAnchor::new(0, 1));
}

#[test]
fn reset_restores_the_initial_generation_state() {
    let mut world = prepared_world();
    let viewport = wide_viewport();
    let mut generator = PathGenerator::new(config(2, 0.0, 21)).expect("valid");
    let mut session = Session::new();

    for _ in 0..2 {
        let _ = pump(&mut world, &mut generator, &viewport, TICK);
    }
    assert_eq!(query::run_phase(&world), RunPhase::Idle);

    // Enable continuous generation and run a few active steps.
    let mut commands = Vec::new();
    session.handle(
        SessionInput::new(true, false),
        query::run_phase(&world),
        &mut commands,
    );
    let mut events = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }
    generator.handle(&events, query::run_phase(&world), &viewport, &mut Vec::new());
    for _ in 0..4 {
        let _ = pump(&mut world, &mut generator, &viewport, TICK);
    }
    assert!(generator.step_index() >= 2);
    assert_ne!(generator.cursor(), PathAnchor::new(0, 0));

    // Round restart.
    let mut commands = Vec::new();
    session.handle(
        SessionInput::new(false, true),
        query::run_phase(&world),
        &mut commands,
    );
    let mut events = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }
    generator.handle(&events, query::run_phase(&world), &viewport, &mut Vec::new());

    assert_eq!(query::run_phase(&world), RunPhase::PreRoll);
    assert_eq!(generator.step_index(), 0);
    assert_eq!(generator.cursor(), PathAnchor::new(0, 0));
    assert_eq!(expendable_tiles(&world), 0);

    // The replayed pre-roll starts with the forced forward step again.
    let _ = pump(&mut world, &mut generator, &viewport, TICK);
    assert!(query::tile_at(&world, PathAnchor::new(1, 0)).is_some());
}

#[test]
fn zero_probability_never_spawns_pickups() {
    let mut world = prepared_world();
    let viewport = wide_viewport();
    let mut generator = PathGenerator::new(config(40, 0.0, 1234)).expect("valid");

    for _ in 0..40 {
        let _ = pump(&mut world, &mut generator, &viewport, TICK);
    }
    assert_eq!(expendable_tiles(&world), 40);
    assert!(query::pickup_view(&world).into_vec().is_empty());
}

#[test]
fn unit_probability_spawns_a_pickup_on_every_placement() {
    let mut world = prepared_world();
    let viewport = wide_viewport();
    let mut generator = PathGenerator::new(config(40, 1.0, 1234)).expect("valid");

    for _ in 0..40 {
        let _ = pump(&mut world, &mut generator, &viewport, TICK);
    }
    assert_eq!(expendable_tiles(&world), 40);
    assert_eq!(query::pickup_view(&world).into_vec().len(), 40);
}

#[test]
fn press_enables_continuous_generation_at_the_creation_cadence() {
    let mut world = prepared_world();
    let viewport = wide_viewport();
    let mut generator = PathGenerator::new(config(1, 0.0, 5)).expect("valid");
    let mut session = Session::new();

    let _ = pump(&mut world, &mut generator, &viewport, TICK);
    assert_eq!(query::run_phase(&world), RunPhase::Idle);

    let mut commands = Vec::new();
    session.handle(
        SessionInput::new(true, false),
        query::run_phase(&world),
        &mut commands,
    );
    let mut events = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }
    generator.handle(&events, query::run_phase(&world), &viewport, &mut Vec::new());
    assert_eq!(query::run_phase(&world), RunPhase::Active);
    let placed_before = expendable_tiles(&world);

    // The creation stopwatch re-arms on enable: a sub-cadence tick places
    // nothing, and crossing the cadence places exactly one tile.
    let _ = pump(&mut world, &mut generator, &viewport, Duration::from_millis(50));
    assert_eq!(expendable_tiles(&world), placed_before);

    let _ = pump(&mut world, &mut generator, &viewport, Duration::from_millis(60));
    assert_eq!(expendable_tiles(&world), placed_before + 1);
}
