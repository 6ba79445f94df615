#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted, headless Crystal Run session.
//!
//! The demo wires the full loop together: the world executes commands, the
//! session system presses play once the pre-roll settles, the generator lays
//! the path, a scripted runner follows it collecting crystals, and the
//! despawn system reclaims what the runner leaves behind. The finished run
//! is printed as an ASCII sketch plus a shareable snapshot string that can
//! be replayed with `--replay`.

mod run_transfer;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crystal_run_core::{Command, Event, PathAnchor, RunPhase, Viewport, WorldPosition};
use crystal_run_system_despawn::{Config as DespawnConfig, Despawn};
use crystal_run_system_path_generation::{CadencePolicy, Config as GeneratorConfig, PathGenerator};
use crystal_run_system_session::{Session, SessionInput};
use crystal_run_world::{self as world, query, World};

use run_transfer::RunSnapshot;

const TILE_LENGTH: f32 = 1.0;
const TILE_HALF_HEIGHT: f32 = 0.25;
const PICKUP_HALF_HEIGHT: f32 = 0.15;
const TILE_LINGER: Duration = Duration::from_secs(3);
const PICKUP_FADE: Duration = Duration::from_secs(1);
const MAP_ROWS: i32 = 32;

/// Scripted headless demo of the Crystal Run generation loop.
#[derive(Debug, Parser)]
#[command(name = "crystal-run")]
struct Args {
    /// Seed for direction and pickup rolls; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of fixed-cadence ticks to simulate.
    #[arg(long, default_value_t = 240)]
    ticks: u64,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Tiles generated before play begins.
    #[arg(long, default_value_t = 10)]
    preroll: u32,
    /// Milliseconds between placements.
    #[arg(long, default_value_t = 100)]
    cadence_ms: u64,
    /// Milliseconds the pre-roll cadence shrinks by after each step.
    #[arg(long, default_value_t = 0)]
    ramp_ms: u64,
    /// Probability of a crystal spawning above each placed tile.
    #[arg(long, default_value_t = 0.2)]
    pickup_probability: f32,
    /// Half-width of the visible viewport band in world units.
    #[arg(long, default_value_t = 2.0)]
    viewport_half_extent: f32,
    /// Restart the round at this tick.
    #[arg(long)]
    restart_at: Option<u64>,
    /// Decode and display a shared run instead of simulating.
    #[arg(long)]
    replay: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(code) = &args.replay {
        let snapshot = RunSnapshot::decode(code)?;
        print_replay(&snapshot);
        return Ok(());
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let cadence = Duration::from_millis(args.cadence_ms);
    let mut config = GeneratorConfig::new(
        PathAnchor::new(0, 0),
        TILE_LENGTH,
        args.preroll,
        cadence,
        cadence,
        seed,
    )
    .with_pickup_probability(args.pickup_probability);
    if args.ramp_ms > 0 {
        config = config.with_cadence_policy(CadencePolicy::RampDown {
            decrement: Duration::from_millis(args.ramp_ms),
            floor: Duration::from_millis((args.cadence_ms / 2).max(1)),
        });
    }

    let mut generator = PathGenerator::new(config)?;
    let mut session = Session::new();
    let mut despawn = Despawn::new(DespawnConfig::new(TILE_LINGER, PICKUP_FADE))?;
    let viewport = Viewport::new(WorldPosition::new(0.0, 0.0), args.viewport_half_extent);

    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureTrack {
            start_anchor: PathAnchor::new(0, 0),
            tile_length: TILE_LENGTH,
            tile_half_height: TILE_HALF_HEIGHT,
            pickup_half_height: PICKUP_HALF_HEIGHT,
        },
        &mut events,
    );
    // One tile per tick is the worst case; size the pools for it up front.
    let tile_budget = args.preroll.saturating_add(args.ticks.min(u64::from(u32::MAX)) as u32);
    world::apply(
        &mut world,
        Command::PopulatePools {
            tiles: tile_budget,
            pickups: tile_budget,
        },
        &mut events,
    );

    println!("{}", query::welcome_banner(&world));

    let dt = Duration::from_millis(args.tick_ms);
    let mut path: Vec<PathAnchor> = Vec::new();
    let mut pickup_anchors: Vec<PathAnchor> = Vec::new();
    let mut runner_index: usize = 0;
    let mut pressed = false;

    for tick in 0..args.ticks {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt }, &mut events);

        let phase = query::run_phase(&world);
        let press = !pressed && phase == RunPhase::Idle;
        if press {
            pressed = true;
        }
        let restart = args.restart_at == Some(tick);
        if restart {
            pressed = false;
        }

        let mut commands = Vec::new();
        session.handle(SessionInput::new(press, restart), phase, &mut commands);
        commands.extend(runner_commands(&world, &path, &mut runner_index));

        loop {
            for command in commands.drain(..) {
                world::apply(&mut world, command, &mut events);
            }
            record(&events, &mut path, &mut pickup_anchors, &mut runner_index);

            generator.handle(&events, query::run_phase(&world), &viewport, &mut commands);
            despawn.handle(&events, &mut commands);
            if commands.is_empty() {
                break;
            }
            events.clear();
        }
    }

    println!(
        "phase after {} ticks: {:?}",
        args.ticks,
        query::run_phase(&world)
    );
    println!(
        "tiles placed: {} (pool {:?})",
        path.len(),
        query::tile_pool_stats(&world)
    );
    println!(
        "pickups spawned: {} (pool {:?})",
        pickup_anchors.len(),
        query::pickup_pool_stats(&world)
    );
    println!("score: {}", query::score(&world));
    print_map(&path, &pickup_anchors);

    let snapshot = RunSnapshot {
        seed,
        tile_length: TILE_LENGTH,
        tiles: path,
        pickups: pickup_anchors,
        score: query::score(&world),
    };
    println!("share: {}", snapshot.encode());

    Ok(())
}

/// Scripted runner: once play is enabled it walks the path one tile per
/// tick, vacating the tile it leaves and collecting the crystal it reaches.
fn runner_commands(world: &World, path: &[PathAnchor], runner_index: &mut usize) -> Vec<Command> {
    let mut commands = Vec::new();
    if query::run_phase(world) != RunPhase::Active {
        return commands;
    }
    if *runner_index + 1 >= path.len() {
        return commands;
    }

    let current = path[*runner_index];
    *runner_index += 1;
    let next = path[*runner_index];

    if let Some(tile) = query::tile_at(world, current) {
        commands.push(Command::VacateTile { tile });
    }
    if let Some(pickup) = query::pickup_view(world)
        .iter()
        .find(|pickup| pickup.anchor == next && !pickup.collected)
    {
        commands.push(Command::CollectPickup { pickup: pickup.id });
    }

    commands
}

fn record(
    events: &[Event],
    path: &mut Vec<PathAnchor>,
    pickup_anchors: &mut Vec<PathAnchor>,
    runner_index: &mut usize,
) {
    for event in events {
        match event {
            Event::TilePlaced { anchor, .. } => path.push(*anchor),
            Event::PickupSpawned { anchor, .. } => pickup_anchors.push(*anchor),
            Event::RunReset => {
                path.clear();
                pickup_anchors.clear();
                *runner_index = 0;
            }
            _ => {}
        }
    }
}

fn print_replay(snapshot: &RunSnapshot) {
    println!(
        "shared run: seed {} | {} tiles | {} pickups | score {}",
        snapshot.seed,
        snapshot.tiles.len(),
        snapshot.pickups.len(),
        snapshot.score
    );
    print_map(&snapshot.tiles, &snapshot.pickups);
}

/// Sketches the tail of the path, forward axis up, right axis across.
fn print_map(tiles: &[PathAnchor], pickups: &[PathAnchor]) {
    if tiles.is_empty() {
        return;
    }

    let max_forward = tiles.iter().map(PathAnchor::forward).max().unwrap_or(0);
    let min_forward = tiles
        .iter()
        .map(PathAnchor::forward)
        .min()
        .unwrap_or(0)
        .max(max_forward - (MAP_ROWS - 1));
    let window: Vec<PathAnchor> = tiles
        .iter()
        .copied()
        .filter(|anchor| anchor.forward() >= min_forward)
        .collect();
    let min_right = window.iter().map(PathAnchor::right).min().unwrap_or(0);
    let max_right = window.iter().map(PathAnchor::right).max().unwrap_or(0);

    for forward in (min_forward..=max_forward).rev() {
        let mut line = String::new();
        for right in min_right..=max_right {
            let anchor = PathAnchor::new(forward, right);
            let glyph = if pickups.contains(&anchor) {
                '*'
            } else if tiles.contains(&anchor) {
                '#'
            } else if anchor == PathAnchor::new(0, 0) {
                'S'
            } else {
                '.'
            };
            line.push(glyph);
        }
        println!("{line}");
    }
}
