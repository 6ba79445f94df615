use std::time::Duration;

use crystal_run_core::{Command, PathAnchor};
use crystal_run_system_despawn::{Config, Despawn};
use crystal_run_world::{self as world, query, World};

const TILE_LINGER: Duration = Duration::from_secs(3);
const PICKUP_FADE: Duration = Duration::from_secs(1);

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
    world
}

fn despawn() -> Despawn {
    Despawn::new(Config::new(TILE_LINGER, PICKUP_FADE)).expect("valid config")
}

fn tick(world: &mut World, dt: Duration) -> Vec<crystal_run_core::Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);
    events
}

#[test]
fn vacated_tile_is_reclaimed_after_the_linger() {
    let mut world = prepared_world();
    let mut despawn = despawn();
    let anchor = PathAnchor::new(1, 0);

    let mut events = Vec::new();
    world::apply(&mut world, Command::PlaceTile { anchor }, &mut events);
    let tile = query::tile_at(&world, anchor).expect("tile placed");
    world::apply(&mut world, Command::VacateTile { tile }, &mut events);

    let mut commands = Vec::new();
    despawn.handle(&events, &mut commands);
    assert!(commands.is_empty(), "no release before the linger expires");
    assert_eq!(despawn.pending(), 1);

    let events = tick(&mut world, TILE_LINGER + Duration::from_millis(1));
    despawn.handle(&events, &mut commands);
    assert_eq!(commands, vec![Command::ReleaseTile { tile }]);
    assert_eq!(despawn.pending(), 0);

    let mut events = Vec::new();
    world::apply(&mut world, commands.remove(0), &mut events);
    assert!(!query::is_tile_live(&world, tile));
}

#[test]
fn collected_pickup_is_reclaimed_after_the_fade() {
    let mut world = prepared_world();
    let mut despawn = despawn();
    let anchor = PathAnchor::new(1, 0);

    let mut events = Vec::new();
    world::apply(&mut world, Command::PlaceTile { anchor }, &mut events);
    world::apply(&mut world, Command::SpawnPickup { anchor }, &mut events);
    let pickup = query::pickup_view(&world).into_vec()[0].id;
    world::apply(&mut world, Command::CollectPickup { pickup }, &mut events);

    let mut commands = Vec::new();
    despawn.handle(&events, &mut commands);
    assert!(commands.is_empty());

    let events = tick(&mut world, PICKUP_FADE + Duration::from_millis(1));
    despawn.handle(&events, &mut commands);
    assert_eq!(commands, vec![Command::ReleasePickup { pickup }]);
}

#[test]
fn board_reset_drops_pending_entries() {
    let mut world = prepared_world();
    let mut despawn = despawn();
    let anchor = PathAnchor::new(1, 0);

    let mut events = Vec::new();
    world::apply(&mut world, Command::PlaceTile { anchor }, &mut events);
    let tile = query::tile_at(&world, anchor).expect("tile placed");
    world::apply(&mut world, Command::VacateTile { tile }, &mut events);
    world::apply(&mut world, Command::ResetRun, &mut events);

    let mut commands = Vec::new();
    despawn.handle(&events, &mut commands);
    assert!(commands.is_empty());
    assert_eq!(despawn.pending(), 0);

    let events = tick(&mut world, TILE_LINGER + Duration::from_millis(1));
    despawn.handle(&events, &mut commands);
    assert!(commands.is_empty(), "reset instances must not be re-released");
}

#[test]
fn externally_released_tile_is_not_reclaimed_twice() {
    let mut world = prepared_world();
    let mut despawn = despawn();
    let anchor = PathAnchor::new(1, 0);

    let mut events = Vec::new();
    world::apply(&mut world, Command::PlaceTile { anchor }, &mut events);
    let tile = query::tile_at(&world, anchor).expect("tile placed");
    world::apply(&mut world, Command::VacateTile { tile }, &mut events);
    world::apply(&mut world, Command::ReleaseTile { tile }, &mut events);

    let mut commands = Vec::new();
    despawn.handle(&events, &mut commands);
    assert_eq!(despawn.pending(), 0);

    let events = tick(&mut world, TILE_LINGER + Duration::from_millis(1));
    despawn.handle(&events, &mut commands);
    assert!(commands.is_empty());
}
