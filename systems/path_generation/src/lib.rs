#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic path-generation system for Crystal Run.
//!
//! Owns the generation state machine: an initial stopwatch-gated pre-roll
//! burst, an idle wait for the first press, and continuous cadence-gated
//! placement afterwards. Each placement step chooses a lattice direction,
//! redirects once if the candidate would leave the visible viewport band, and
//! rolls for a crystal pickup above the new tile. The system never touches
//! the world directly; it emits [`Command`] batches for the world to apply.

use std::time::Duration;

use crystal_run_core::{
    Command, Event, LatticeDirection, PathAnchor, RunPhase, Stopwatch, Viewport,
};
use thiserror::Error;

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;

/// Default left edge of the viewport band the path must stay inside.
pub const DEFAULT_LEFT_BOUND: f32 = 0.05;
/// Default right edge of the viewport band the path must stay inside.
pub const DEFAULT_RIGHT_BOUND: f32 = 0.95;

/// Strategy applied to the pre-roll cadence after each placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CadencePolicy {
    /// Every pre-roll step fires at the same cadence.
    Fixed,
    /// Each pre-roll step shortens the cadence by `decrement`, never below
    /// `floor` and never growing back.
    RampDown {
        /// Amount the cadence shrinks after each placement.
        decrement: Duration,
        /// Smallest cadence the ramp may reach.
        floor: Duration,
    },
}

/// Reasons a generator configuration is refused at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The tile side length was zero, negative, or not finite.
    #[error("tile length must be positive and finite")]
    NonPositiveTileLength,
    /// The pre-roll burst must place at least one tile.
    #[error("pre-roll tile count must be at least one")]
    ZeroPreRollCount,
    /// The pre-roll cadence gates placements and cannot be zero.
    #[error("pre-roll cadence must be non-zero")]
    ZeroPreRollCadence,
    /// The continuous creation cadence gates placements and cannot be zero.
    #[error("creation cadence must be non-zero")]
    ZeroCreationCadence,
    /// A ramp that may reach zero would disable the cadence gate entirely.
    #[error("ramp floor must be non-zero")]
    ZeroRampFloor,
    /// The pickup roll is a probability and must lie in `0.0..=1.0`.
    #[error("pickup probability must lie in 0.0..=1.0")]
    ProbabilityOutOfRange,
    /// Viewport bounds must satisfy `0.0 <= left < right <= 1.0`.
    #[error("viewport bounds must satisfy 0.0 <= left < right <= 1.0")]
    InvalidViewportBounds,
}

/// Configuration parameters required to construct the generator.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    start_anchor: PathAnchor,
    tile_length: f32,
    preroll_tile_count: u32,
    preroll_cadence: Duration,
    creation_cadence: Duration,
    cadence_policy: CadencePolicy,
    pickup_probability: f32,
    left_bound: f32,
    right_bound: f32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration with default bounds, a fixed cadence policy,
    /// and no pickups.
    #[must_use]
    pub const fn new(
        start_anchor: PathAnchor,
        tile_length: f32,
        preroll_tile_count: u32,
        preroll_cadence: Duration,
        creation_cadence: Duration,
        rng_seed: u64,
    ) -> Self {
        Self {
            start_anchor,
            tile_length,
            preroll_tile_count,
            preroll_cadence,
            creation_cadence,
            cadence_policy: CadencePolicy::Fixed,
            pickup_probability: 0.0,
            left_bound: DEFAULT_LEFT_BOUND,
            right_bound: DEFAULT_RIGHT_BOUND,
            rng_seed,
        }
    }

    /// Sets the probability of spawning a pickup above each placed tile.
    #[must_use]
    pub const fn with_pickup_probability(mut self, probability: f32) -> Self {
        self.pickup_probability = probability;
        self
    }

    /// Sets the strategy applied to the pre-roll cadence between steps.
    #[must_use]
    pub const fn with_cadence_policy(mut self, policy: CadencePolicy) -> Self {
        self.cadence_policy = policy;
        self
    }

    /// Overrides the viewport band the path must stay inside.
    #[must_use]
    pub const fn with_viewport_bounds(mut self, left: f32, right: f32) -> Self {
        self.left_bound = left;
        self.right_bound = right;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.tile_length.is_finite() || self.tile_length <= 0.0 {
            return Err(ConfigError::NonPositiveTileLength);
        }
        if self.preroll_tile_count == 0 {
            return Err(ConfigError::ZeroPreRollCount);
        }
        if self.preroll_cadence.is_zero() {
            return Err(ConfigError::ZeroPreRollCadence);
        }
        if self.creation_cadence.is_zero() {
            return Err(ConfigError::ZeroCreationCadence);
        }
        if let CadencePolicy::RampDown { floor, .. } = self.cadence_policy {
            if floor.is_zero() {
                return Err(ConfigError::ZeroRampFloor);
            }
        }
        if !self.pickup_probability.is_finite()
            || self.pickup_probability < 0.0
            || self.pickup_probability > 1.0
        {
            return Err(ConfigError::ProbabilityOutOfRange);
        }
        if !self.left_bound.is_finite()
            || !self.right_bound.is_finite()
            || self.left_bound < 0.0
            || self.right_bound > 1.0
            || self.left_bound >= self.right_bound
        {
            return Err(ConfigError::InvalidViewportBounds);
        }
        Ok(())
    }
}

/// Pure system that deterministically emits tile and pickup placement
/// commands, throttled by stopwatch gates and bounded by the viewport.
#[derive(Debug)]
pub struct PathGenerator {
    config: Config,
    clock: Duration,
    cursor: PathAnchor,
    step_index: u32,
    preroll_watch: Stopwatch,
    creation_watch: Stopwatch,
    rng_state: u64,
    first_step_pending: bool,
}

impl PathGenerator {
    /// Creates a new generator, refusing invalid configurations.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Duration::ZERO,
            cursor: config.start_anchor,
            step_index: 0,
            preroll_watch: Stopwatch::new(config.preroll_cadence),
            creation_watch: Stopwatch::new(config.creation_cadence),
            rng_state: config.rng_seed,
            first_step_pending: true,
        })
    }

    /// Anchor of the most recently placed tile.
    #[must_use]
    pub const fn cursor(&self) -> PathAnchor {
        self.cursor
    }

    /// Number of tiles placed in the current pre-roll run.
    #[must_use]
    pub const fn step_index(&self) -> u32 {
        self.step_index
    }

    /// Consumes events and the current run phase to emit placement commands.
    ///
    /// At most one tile-placement step is emitted per call, even when a large
    /// time delta leaves a stopwatch elapsed by several multiples.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: RunPhase,
        viewport: &Viewport,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.clock = self.clock.saturating_add(*dt);
                }
                Event::RunReset => self.restart(),
                Event::RunPhaseChanged {
                    phase: RunPhase::Active,
                } => self.creation_watch.reset(self.clock),
                _ => {}
            }
        }

        match phase {
            RunPhase::PreRoll => self.step_preroll(viewport, out),
            RunPhase::Idle => {}
            RunPhase::Active => self.step_active(viewport, out),
        }
    }

    fn restart(&mut self) {
        self.cursor = self.config.start_anchor;
        self.step_index = 0;
        self.first_step_pending = true;
        // Back to the initial, non-ramped cadence.
        self.preroll_watch
            .reset_with(self.clock, self.config.preroll_cadence);
    }

    fn step_preroll(&mut self, viewport: &Viewport, out: &mut Vec<Command>) {
        if self.step_index >= self.config.preroll_tile_count {
            return;
        }
        if !self.preroll_watch.is_elapsed(self.clock) {
            return;
        }

        let forced = self
            .first_step_pending
            .then_some(LatticeDirection::Forward);
        self.place_step(forced, viewport, out);
        self.first_step_pending = false;
        self.step_index += 1;

        let next_cadence = self.next_preroll_cadence();
        self.preroll_watch.reset_with(self.clock, next_cadence);

        if self.step_index == self.config.preroll_tile_count {
            out.push(Command::SetRunPhase {
                phase: RunPhase::Idle,
            });
        }
    }

    fn step_active(&mut self, viewport: &Viewport, out: &mut Vec<Command>) {
        if !self.creation_watch.is_elapsed(self.clock) {
            return;
        }

        self.place_step(None, viewport, out);
        self.creation_watch.reset(self.clock);
    }

    fn place_step(
        &mut self,
        forced: Option<LatticeDirection>,
        viewport: &Viewport,
        out: &mut Vec<Command>,
    ) {
        let mut direction = forced.unwrap_or_else(|| self.random_direction());
        let mut candidate = self.cursor.offset_by(direction);

        let horizontal = viewport.horizontal(candidate.world_position(self.config.tile_length));
        if horizontal < self.config.left_bound || horizontal > self.config.right_bound {
            // Hard redirect, applied at most once per step.
            direction = direction.flipped();
            candidate = self.cursor.offset_by(direction);
        }

        self.cursor = candidate;
        out.push(Command::PlaceTile { anchor: candidate });

        if self.roll_pickup() {
            out.push(Command::SpawnPickup { anchor: candidate });
        }
    }

    fn next_preroll_cadence(&self) -> Duration {
        match self.config.cadence_policy {
            CadencePolicy::Fixed => self.preroll_watch.duration(),
            CadencePolicy::RampDown { decrement, floor } => {
                let shortened = self.preroll_watch.duration().saturating_sub(decrement);
                shortened.max(floor)
            }
        }
    }

    fn random_direction(&mut self) -> LatticeDirection {
        // Low LCG bits alternate; the top bit gives the 50/50 split.
        if self.advance_rng() >> 63 == 0 {
            LatticeDirection::Forward
        } else {
            LatticeDirection::Right
        }
    }

    fn roll_pickup(&mut self) -> bool {
        let roll = (self.advance_rng() >> 40) as f32 / (1u64 << 24) as f32;
        roll < self.config.pickup_probability
    }

    fn advance_rng(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        self.rng_state
    }
}
