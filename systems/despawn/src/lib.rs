#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timer-gated reclamation of vacated tiles and collected pickups.
//!
//! Tiles the player has left linger briefly before falling away, and
//! collected pickups fade out before returning to the pool. Both delays are
//! stopwatch-gated pending entries here rather than callbacks on the
//! instances themselves, so the system tolerates instances being reclaimed
//! out from under it by board resets.

use std::time::Duration;

use crystal_run_core::{Command, Event, PickupId, Stopwatch, TileId};
use thiserror::Error;

/// Reasons a despawn configuration is refused at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A zero linger would reclaim tiles the same frame they are vacated.
    #[error("tile linger must be non-zero")]
    ZeroTileLinger,
    /// A zero fade would reclaim pickups the same frame they are collected.
    #[error("pickup fade must be non-zero")]
    ZeroPickupFade,
}

/// Configuration parameters required to construct the despawn system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    tile_linger: Duration,
    pickup_fade: Duration,
}

impl Config {
    /// Creates a new configuration from the provided reclaim delays.
    #[must_use]
    pub const fn new(tile_linger: Duration, pickup_fade: Duration) -> Self {
        Self {
            tile_linger,
            pickup_fade,
        }
    }
}

/// Pure system that emits release commands once reclaim delays expire.
#[derive(Debug)]
pub struct Despawn {
    config: Config,
    clock: Duration,
    pending_tiles: Vec<(TileId, Stopwatch)>,
    pending_pickups: Vec<(PickupId, Stopwatch)>,
}

impl Despawn {
    /// Creates a new despawn system, refusing invalid configurations.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        if config.tile_linger.is_zero() {
            return Err(ConfigError::ZeroTileLinger);
        }
        if config.pickup_fade.is_zero() {
            return Err(ConfigError::ZeroPickupFade);
        }
        Ok(Self {
            config,
            clock: Duration::ZERO,
            pending_tiles: Vec::new(),
            pending_pickups: Vec::new(),
        })
    }

    /// Consumes world events and emits release commands for expired entries.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.clock = self.clock.saturating_add(*dt);
                }
                Event::TileVacated { tile } => {
                    let mut watch = Stopwatch::new(self.config.tile_linger);
                    watch.reset(self.clock);
                    self.pending_tiles.push((*tile, watch));
                }
                Event::PickupCollected { pickup, .. } => {
                    let mut watch = Stopwatch::new(self.config.pickup_fade);
                    watch.reset(self.clock);
                    self.pending_pickups.push((*pickup, watch));
                }
                Event::TileReleased { tile } => {
                    self.pending_tiles.retain(|(pending, _)| pending != tile);
                }
                Event::PickupReleased { pickup } => {
                    self.pending_pickups
                        .retain(|(pending, _)| pending != pickup);
                }
                Event::RunReset => {
                    self.pending_tiles.clear();
                    self.pending_pickups.clear();
                }
                _ => {}
            }
        }

        let clock = self.clock;
        self.pending_tiles.retain_mut(|(tile, watch)| {
            if watch.is_elapsed(clock) {
                out.push(Command::ReleaseTile { tile: *tile });
                false
            } else {
                true
            }
        });
        self.pending_pickups.retain_mut(|(pickup, watch)| {
            if watch.is_elapsed(clock) {
                out.push(Command::ReleasePickup { pickup: *pickup });
                false
            } else {
                true
            }
        });
    }

    /// Number of instances currently awaiting reclamation.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending_tiles.len() + self.pending_pickups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_zero_delays() {
        assert_eq!(
            Despawn::new(Config::new(Duration::ZERO, Duration::from_secs(1))).err(),
            Some(ConfigError::ZeroTileLinger)
        );
        assert_eq!(
            Despawn::new(Config::new(Duration::from_secs(1), Duration::ZERO)).err(),
            Some(ConfigError::ZeroPickupFade)
        );
    }
}
