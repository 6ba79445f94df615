#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative track state management for Crystal Run.
//!
//! The world owns the pooled tile and pickup instances, the run phase, and
//! the session score. Adapters and systems mutate it exclusively through
//! [`apply`], which executes one [`Command`] and broadcasts the resulting
//! [`Event`] values.

use crystal_run_core::{
    Command, Event, InstanceTag, PathAnchor, PickupId, RunPhase, TileId, TrackConfigError,
    WELCOME_BANNER,
};

mod pool;

use pool::Pool;

const DEFAULT_START_ANCHOR: PathAnchor = PathAnchor::new(0, 0);
const DEFAULT_TILE_LENGTH: f32 = 1.0;
const DEFAULT_TILE_HALF_HEIGHT: f32 = 0.25;
const DEFAULT_PICKUP_HALF_HEIGHT: f32 = 0.15;

/// Score awarded for collecting a single crystal pickup.
pub const PICKUP_SCORE: u32 = 3;

/// Describes the track geometry the run plays out on.
#[derive(Debug)]
pub struct Track {
    start_anchor: PathAnchor,
    tile_length: f32,
    pickup_height: f32,
}

impl Track {
    fn new(
        start_anchor: PathAnchor,
        tile_length: f32,
        tile_half_height: f32,
        pickup_half_height: f32,
    ) -> Result<Self, TrackConfigError> {
        if !tile_length.is_finite() || tile_length <= 0.0 {
            return Err(TrackConfigError::NonPositiveTileLength);
        }
        if !tile_half_height.is_finite()
            || !pickup_half_height.is_finite()
            || tile_half_height < 0.0
            || pickup_half_height < 0.0
        {
            return Err(TrackConfigError::InvalidHalfHeight);
        }

        Ok(Self {
            start_anchor,
            tile_length,
            pickup_height: tile_half_height + pickup_half_height,
        })
    }

    /// Anchor where the run begins and where resets return the cursor.
    #[must_use]
    pub const fn start_anchor(&self) -> PathAnchor {
        self.start_anchor
    }

    /// Side length of a square floor tile expressed in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Elevation of a spawned pickup above its tile's anchor.
    #[must_use]
    pub const fn pickup_height(&self) -> f32 {
        self.pickup_height
    }
}

#[derive(Debug)]
struct TileState {
    anchor: PathAnchor,
    vacated: bool,
}

#[derive(Debug)]
struct PickupState {
    anchor: PathAnchor,
    height: f32,
    parent: Option<TileId>,
    collected: bool,
}

/// Represents the authoritative Crystal Run world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    track: Track,
    phase: RunPhase,
    tiles: Pool<TileState>,
    pickups: Pool<PickupState>,
    score: u32,
    tick_index: u64,
}

impl World {
    /// Creates a new Crystal Run world ready for simulation.
    #[must_use]
    pub fn new() -> Self {
        let track = Track {
            start_anchor: DEFAULT_START_ANCHOR,
            tile_length: DEFAULT_TILE_LENGTH,
            pickup_height: DEFAULT_TILE_HALF_HEIGHT + DEFAULT_PICKUP_HALF_HEIGHT,
        };

        let mut world = Self {
            banner: WELCOME_BANNER,
            track,
            phase: RunPhase::PreRoll,
            tiles: Pool::new(),
            pickups: Pool::new(),
            score: 0,
            tick_index: 0,
        };
        world.place_start_marker();
        world
    }

    fn place_start_marker(&mut self) {
        let _ = self.tiles.acquire(
            InstanceTag::Marker,
            TileState {
                anchor: self.track.start_anchor,
                vacated: false,
            },
        );
    }

    fn set_phase(&mut self, phase: RunPhase, out_events: &mut Vec<Event>) {
        if self.phase != phase {
            self.phase = phase;
            out_events.push(Event::RunPhaseChanged { phase });
        }
    }

    fn clear_board(&mut self, keep: InstanceTag, out_events: &mut Vec<Event>) {
        let released_tiles = self.tiles.release_all_except(keep);
        let released_pickups = self.pickups.release_all_except(keep);

        for id in &released_tiles {
            out_events.push(Event::TileReleased {
                tile: TileId::new(*id),
            });
        }
        for id in &released_pickups {
            out_events.push(Event::PickupReleased {
                pickup: PickupId::new(*id),
            });
        }
        out_events.push(Event::BoardCleared {
            tiles_released: released_tiles.len() as u32,
            pickups_released: released_pickups.len() as u32,
        });
    }

    fn live_tile_at(&self, anchor: PathAnchor) -> Option<TileId> {
        // The path may double back over itself; the latest placement wins.
        self.tiles
            .iter()
            .filter(|(_, _, tile)| tile.anchor == anchor)
            .map(|(id, _, _)| TileId::new(id))
            .last()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureTrack {
            start_anchor,
            tile_length,
            tile_half_height,
            pickup_half_height,
        } => match Track::new(
            start_anchor,
            tile_length,
            tile_half_height,
            pickup_half_height,
        ) {
            Ok(track) => {
                world.track = track;
                world.tiles = Pool::new();
                world.pickups = Pool::new();
                world.score = 0;
                world.tick_index = 0;
                world.place_start_marker();
                out_events.push(Event::TrackConfigured {
                    start_anchor,
                    tile_length,
                });
                world.set_phase(RunPhase::PreRoll, out_events);
            }
            Err(error) => out_events.push(Event::TrackRejected { error }),
        },
        Command::PopulatePools { tiles, pickups } => {
            world.tiles.populate(tiles);
            world.pickups.populate(pickups);
            out_events.push(Event::PoolsPopulated {
                tiles: world.tiles.stats().idle,
                pickups: world.pickups.stats().idle,
            });
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SetRunPhase { phase } => {
            world.set_phase(phase, out_events);
        }
        Command::ResetRun => {
            world.clear_board(InstanceTag::Marker, out_events);
            world.score = 0;
            world.set_phase(RunPhase::PreRoll, out_events);
            out_events.push(Event::RunReset);
        }
        Command::PlaceTile { anchor } => {
            let id = world.tiles.acquire(
                InstanceTag::Expendable,
                TileState {
                    anchor,
                    vacated: false,
                },
            );
            out_events.push(Event::TilePlaced {
                tile: TileId::new(id),
                anchor,
            });
        }
        Command::SpawnPickup { anchor } => {
            // Explicit validity check: a vanished tile means no parent, but
            // the pickup still spawns at its computed world position.
            let parent = world.live_tile_at(anchor);
            let height = world.track.pickup_height;
            let id = world.pickups.acquire(
                InstanceTag::Expendable,
                PickupState {
                    anchor,
                    height,
                    parent,
                    collected: false,
                },
            );
            out_events.push(Event::PickupSpawned {
                pickup: PickupId::new(id),
                anchor,
                parent,
            });
        }
        Command::CollectPickup { pickup } => {
            let Some(state) = world.pickups.get_mut(pickup.get()) else {
                return;
            };
            if state.collected {
                return;
            }
            state.collected = true;
            world.score = world.score.saturating_add(PICKUP_SCORE);
            out_events.push(Event::PickupCollected {
                pickup,
                score: PICKUP_SCORE,
                total: world.score,
            });
        }
        Command::VacateTile { tile } => {
            let Some(state) = world.tiles.get_mut(tile.get()) else {
                return;
            };
            if state.vacated {
                return;
            }
            state.vacated = true;
            out_events.push(Event::TileVacated { tile });
        }
        Command::ReleaseTile { tile } => {
            if world.tiles.release(tile.get()) {
                out_events.push(Event::TileReleased { tile });
            }
        }
        Command::ReleasePickup { pickup } => {
            if world.pickups.release(pickup.get()) {
                out_events.push(Event::PickupReleased { pickup });
            }
        }
        Command::ReleaseBoard { keep } => {
            world.clear_board(keep, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use crystal_run_core::{
        PathAnchor, PickupId, PickupSnapshot, PickupView, PoolStats, RunPhase, TileId,
        TileSnapshot, TileView,
    };

    use super::{Track, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the configured track geometry.
    #[must_use]
    pub fn track(world: &World) -> &Track {
        &world.track
    }

    /// Reports the phase the run is currently in.
    #[must_use]
    pub fn run_phase(world: &World) -> RunPhase {
        world.phase
    }

    /// Reports the session score accumulated from collected pickups.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }

    /// Reports how many ticks the world has processed.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Captures a read-only view of the live tiles in deterministic order.
    #[must_use]
    pub fn tile_view(world: &World) -> TileView {
        TileView::from_snapshots(
            world
                .tiles
                .iter()
                .map(|(id, tag, tile)| TileSnapshot {
                    id: TileId::new(id),
                    anchor: tile.anchor,
                    tag,
                    vacated: tile.vacated,
                })
                .collect(),
        )
    }

    /// Captures a read-only view of the live pickups in deterministic order.
    #[must_use]
    pub fn pickup_view(world: &World) -> PickupView {
        PickupView::from_snapshots(
            world
                .pickups
                .iter()
                .map(|(id, _, pickup)| PickupSnapshot {
                    id: PickupId::new(id),
                    anchor: pickup.anchor,
                    height: pickup.height,
                    parent: pickup.parent,
                    collected: pickup.collected,
                })
                .collect(),
        )
    }

    /// Finds the live tile occupying the provided anchor, if any.
    #[must_use]
    pub fn tile_at(world: &World, anchor: PathAnchor) -> Option<TileId> {
        world.live_tile_at(anchor)
    }

    /// Reports whether the tile handle still refers to a live instance.
    #[must_use]
    pub fn is_tile_live(world: &World, tile: TileId) -> bool {
        world.tiles.is_live(tile.get())
    }

    /// Occupancy counters for the tile pool.
    #[must_use]
    pub fn tile_pool_stats(world: &World) -> PoolStats {
        world.tiles.stats()
    }

    /// Occupancy counters for the pickup pool.
    #[must_use]
    pub fn pickup_pool_stats(world: &World) -> PoolStats {
        world.pickups.stats()
    }
}
