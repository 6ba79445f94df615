#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared contracts for the Crystal Run simulation.
//!
//! Everything that crosses a crate boundary lives here: the [`Command`] set
//! adapters may submit, the [`Event`] set the world broadcasts after applying
//! them, and the identifier, lattice, viewport, and snapshot types those
//! messages carry. Systems stay pure by construction: they fold event slices
//! and read query views, and the only way they influence the world is by
//! emitting further commands of their own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod stopwatch;

pub use stopwatch::Stopwatch;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Crystal Run.";

/// Identifier allocated to a floor tile by the world's tile pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u64);

impl TileId {
    /// Creates a new tile identifier wrapper.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the underlying identifier value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier allocated to a crystal pickup by the world's pickup pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(u64);

impl PickupId {
    /// Creates a new pickup identifier wrapper.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the underlying identifier value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// One of the two orthogonal unit-step axes used for tile placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LatticeDirection {
    /// Step away from the camera, deeper into the run.
    Forward,
    /// Step across the run, toward the right edge of the screen.
    Right,
}

impl LatticeDirection {
    /// Returns the other lattice axis.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Right,
            Self::Right => Self::Forward,
        }
    }

    /// Returns the unit lattice offset produced by one step along the axis.
    #[must_use]
    pub const fn step(self) -> (i32, i32) {
        match self {
            Self::Forward => (1, 0),
            Self::Right => (0, 1),
        }
    }
}

/// Lattice coordinate anchoring a tile on the forward/right plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathAnchor {
    forward: i32,
    right: i32,
}

impl PathAnchor {
    /// Creates a new anchor at the provided lattice coordinates.
    #[must_use]
    pub const fn new(forward: i32, right: i32) -> Self {
        Self { forward, right }
    }

    /// Lattice coordinate along the forward axis.
    #[must_use]
    pub const fn forward(&self) -> i32 {
        self.forward
    }

    /// Lattice coordinate along the right axis.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.right
    }

    /// Returns the anchor one unit lattice step away in the given direction.
    #[must_use]
    pub const fn offset_by(self, direction: LatticeDirection) -> Self {
        let (forward, right) = direction.step();
        Self {
            forward: self.forward + forward,
            right: self.right + right,
        }
    }

    /// Converts the anchor into continuous world coordinates.
    #[must_use]
    pub fn world_position(self, tile_length: f32) -> WorldPosition {
        WorldPosition {
            forward: self.forward as f32 * tile_length,
            right: self.right as f32 * tile_length,
        }
    }
}

/// Continuous position on the forward/right plane measured in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldPosition {
    /// Distance along the forward axis.
    pub forward: f32,
    /// Distance along the right axis.
    pub right: f32,
}

impl WorldPosition {
    /// Creates a new world position from explicit axis values.
    #[must_use]
    pub const fn new(forward: f32, right: f32) -> Self {
        Self { forward, right }
    }
}

/// Camera-projection collaborator mapping world positions onto the screen.
///
/// The camera rides the run diagonal, so the horizontal screen axis is the
/// normalized difference between the right and forward world axes. Positions
/// project into `0.0..=1.0` inside the visible frame; values outside that
/// range are off-screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    center: WorldPosition,
    half_extent: f32,
}

impl Viewport {
    /// Creates a viewport centered on the provided position.
    ///
    /// `half_extent` is half the visible width along the screen's horizontal
    /// axis, measured in world units, and must be positive.
    #[must_use]
    pub fn new(center: WorldPosition, half_extent: f32) -> Self {
        debug_assert!(half_extent > 0.0, "viewport half extent must be positive");
        Self {
            center,
            half_extent,
        }
    }

    /// Projects a world position to its normalized horizontal coordinate.
    #[must_use]
    pub fn horizontal(&self, position: WorldPosition) -> f32 {
        let axis = |p: WorldPosition| (p.right - p.forward) * std::f32::consts::FRAC_1_SQRT_2;
        0.5 + (axis(position) - axis(self.center)) / (2.0 * self.half_extent)
    }
}

/// Describes the active phase of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Initial burst of path generation before input-driven play begins.
    PreRoll,
    /// Pre-roll finished; generation paused until the first press.
    Idle,
    /// Continuous input-enabled generation at the creation cadence.
    Active,
}

/// Tag carried by pooled instances, consulted by broadcast releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceTag {
    /// Ordinary generated instance, reclaimed by board resets.
    Expendable,
    /// Persistent scene fixture (the start marker); survives board resets.
    Marker,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the track geometry and resets the session.
    ConfigureTrack {
        /// Anchor where the run begins and where resets return the cursor.
        start_anchor: PathAnchor,
        /// Side length of a square floor tile in world units.
        tile_length: f32,
        /// Half the height of a floor tile, used for pickup elevation.
        tile_half_height: f32,
        /// Half the height of a crystal pickup, used for pickup elevation.
        pickup_half_height: f32,
    },
    /// Pre-warms the tile and pickup free lists before generation starts.
    PopulatePools {
        /// Number of tile instances to construct ahead of time.
        tiles: u32,
        /// Number of pickup instances to construct ahead of time.
        pickups: u32,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the run transition to the provided phase.
    SetRunPhase {
        /// Phase the run should activate.
        phase: RunPhase,
    },
    /// Restarts the round: clears the board and returns to pre-roll.
    ResetRun,
    /// Takes a tile from the pool and places it at the anchor.
    PlaceTile {
        /// Lattice anchor the tile occupies after placement.
        anchor: PathAnchor,
    },
    /// Takes a pickup from the pool, elevated above the tile at the anchor.
    ///
    /// The world resolves the parent tile by looking up the live tile at the
    /// anchor; a vanished tile yields an unparented pickup at the same world
    /// position.
    SpawnPickup {
        /// Lattice anchor of the tile the pickup should hover above.
        anchor: PathAnchor,
    },
    /// Records that the player collected a pickup, awarding its score.
    CollectPickup {
        /// Identifier of the collected pickup.
        pickup: PickupId,
    },
    /// Records that the player left a tile, so it may fall and be reclaimed.
    VacateTile {
        /// Identifier of the vacated tile.
        tile: TileId,
    },
    /// Returns a tile instance to the free list.
    ReleaseTile {
        /// Identifier of the tile to reclaim.
        tile: TileId,
    },
    /// Returns a pickup instance to the free list.
    ReleasePickup {
        /// Identifier of the pickup to reclaim.
        pickup: PickupId,
    },
    /// Broadcast release of every live instance except those carrying `keep`.
    ReleaseBoard {
        /// Tag whose instances survive the broadcast.
        keep: InstanceTag,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the track geometry was configured.
    TrackConfigured {
        /// Anchor where the run begins.
        start_anchor: PathAnchor,
        /// Side length of a square floor tile in world units.
        tile_length: f32,
    },
    /// Reports that a track configuration request was refused.
    TrackRejected {
        /// Reason the configuration was refused.
        error: TrackConfigError,
    },
    /// Confirms that the pools were pre-warmed.
    PoolsPopulated {
        /// Number of tile instances now idle in the free list.
        tiles: u32,
        /// Number of pickup instances now idle in the free list.
        pickups: u32,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the run entered a new phase.
    RunPhaseChanged {
        /// Phase that became active after processing commands.
        phase: RunPhase,
    },
    /// Announces that the round restarted and the board was cleared.
    RunReset,
    /// Confirms that a tile was placed on the track.
    TilePlaced {
        /// Identifier assigned to the placed tile.
        tile: TileId,
        /// Lattice anchor the tile occupies.
        anchor: PathAnchor,
    },
    /// Confirms that a pickup spawned above the track.
    PickupSpawned {
        /// Identifier assigned to the spawned pickup.
        pickup: PickupId,
        /// Lattice anchor the pickup hovers above.
        anchor: PathAnchor,
        /// Tile the pickup is visually grouped under, when still live.
        parent: Option<TileId>,
    },
    /// Confirms that a pickup was collected and scored.
    PickupCollected {
        /// Identifier of the collected pickup.
        pickup: PickupId,
        /// Score awarded for this pickup.
        score: u32,
        /// Session total after awarding the pickup.
        total: u32,
    },
    /// Confirms that a tile was marked vacated by the player.
    TileVacated {
        /// Identifier of the vacated tile.
        tile: TileId,
    },
    /// Confirms that a tile returned to the free list.
    TileReleased {
        /// Identifier of the reclaimed tile.
        tile: TileId,
    },
    /// Confirms that a pickup returned to the free list.
    PickupReleased {
        /// Identifier of the reclaimed pickup.
        pickup: PickupId,
    },
    /// Summarizes a broadcast board release.
    BoardCleared {
        /// Number of tiles returned to the free list.
        tiles_released: u32,
        /// Number of pickups returned to the free list.
        pickups_released: u32,
    },
}

/// Reasons a track configuration request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackConfigError {
    /// The tile side length was zero, negative, or not finite.
    NonPositiveTileLength,
    /// A half-height was negative or not finite.
    InvalidHalfHeight,
}

/// Immutable representation of a single tile's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileSnapshot {
    /// Identifier allocated to the tile by the world.
    pub id: TileId,
    /// Lattice anchor the tile occupies.
    pub anchor: PathAnchor,
    /// Tag consulted by broadcast releases.
    pub tag: InstanceTag,
    /// Whether the player has vacated the tile.
    pub vacated: bool,
}

/// Read-only snapshot describing all live tiles on the track.
#[derive(Clone, Debug, Default)]
pub struct TileView {
    snapshots: Vec<TileSnapshot>,
}

impl TileView {
    /// Creates a new tile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tile snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &TileSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TileSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single pickup's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickupSnapshot {
    /// Identifier allocated to the pickup by the world.
    pub id: PickupId,
    /// Lattice anchor the pickup hovers above.
    pub anchor: PathAnchor,
    /// Elevation of the pickup above the anchor's world position.
    pub height: f32,
    /// Tile the pickup is visually grouped under, when still live.
    pub parent: Option<TileId>,
    /// Whether the player has collected the pickup.
    pub collected: bool,
}

/// Read-only snapshot describing all live pickups on the track.
#[derive(Clone, Debug, Default)]
pub struct PickupView {
    snapshots: Vec<PickupSnapshot>,
}

impl PickupView {
    /// Creates a new pickup view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PickupSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured pickup snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &PickupSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PickupSnapshot> {
        self.snapshots
    }
}

/// Occupancy counters exposed by a pooled-instance provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances currently handed out and live on the board.
    pub live: u32,
    /// Instances idle in the free list, ready for reuse.
    pub idle: u32,
    /// Acquisitions that had to construct because the free list was empty.
    ///
    /// A non-zero value means the caller under-provisioned the pool before
    /// enabling generation.
    pub cold_acquisitions: u32,
}

#[cfg(test)]
mod tests {
    use super::{
        LatticeDirection, PathAnchor, PickupId, RunPhase, TileId, TrackConfigError, Viewport,
        WorldPosition,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn anchor_steps_along_each_axis() {
        let anchor = PathAnchor::new(3, -1);
        assert_eq!(
            anchor.offset_by(LatticeDirection::Forward),
            PathAnchor::new(4, -1)
        );
        assert_eq!(
            anchor.offset_by(LatticeDirection::Right),
            PathAnchor::new(3, 0)
        );
    }

    #[test]
    fn flipped_swaps_axes() {
        assert_eq!(
            LatticeDirection::Forward.flipped(),
            LatticeDirection::Right
        );
        assert_eq!(
            LatticeDirection::Right.flipped(),
            LatticeDirection::Forward
        );
    }

    #[test]
    fn viewport_centers_the_camera_anchor() {
        let viewport = Viewport::new(WorldPosition::new(0.0, 0.0), 4.0);
        let center = viewport.horizontal(WorldPosition::new(0.0, 0.0));
        assert!((center - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn viewport_projects_rightward_drift_toward_one() {
        let viewport = Viewport::new(WorldPosition::new(0.0, 0.0), 4.0);
        let drifted = viewport.horizontal(WorldPosition::new(0.0, 5.0));
        assert!(drifted > 0.5);

        let opposite = viewport.horizontal(WorldPosition::new(5.0, 0.0));
        assert!(opposite < 0.5);
    }

    #[test]
    fn world_position_scales_with_tile_length() {
        let position = PathAnchor::new(2, 3).world_position(1.5);
        assert!((position.forward - 3.0).abs() < f32::EPSILON);
        assert!((position.right - 4.5).abs() < f32::EPSILON);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn tile_id_round_trips_through_bincode() {
        assert_round_trip(&TileId::new(42));
    }

    #[test]
    fn pickup_id_round_trips_through_bincode() {
        assert_round_trip(&PickupId::new(7));
    }

    #[test]
    fn path_anchor_round_trips_through_bincode() {
        assert_round_trip(&PathAnchor::new(-3, 12));
    }

    #[test]
    fn run_phase_round_trips_through_bincode() {
        assert_round_trip(&RunPhase::Active);
    }

    #[test]
    fn track_config_error_round_trips_through_bincode() {
        assert_round_trip(&TrackConfigError::NonPositiveTileLength);
    }
}
