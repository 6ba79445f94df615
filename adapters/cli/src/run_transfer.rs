#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use crystal_run_core::PathAnchor;
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "crystalrun";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "crystalrun:v1";
/// Delimiter used to separate the prefix, run dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of a finished run suitable for sharing and replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct RunSnapshot {
    /// Seed that drove the generator's direction and pickup rolls.
    pub seed: u64,
    /// Side length of a floor tile in world units.
    pub tile_length: f32,
    /// Anchors of every placed tile in placement order.
    pub tiles: Vec<PathAnchor>,
    /// Anchors that received a crystal pickup.
    pub pickups: Vec<PathAnchor>,
    /// Session score accumulated from collected pickups.
    pub score: u32,
}

impl RunSnapshot {
    /// Encodes the snapshot into a single-line string suitable for clipboard
    /// transfer.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let payload = SerializableSnapshot {
            seed: self.seed,
            tile_length: self.tile_length,
            tiles: self.tiles.clone(),
            pickups: self.pickups.clone(),
            score: self.score,
        };
        let json = serde_json::to_vec(&payload).expect("run snapshot serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.tiles.len(),
            self.pickups.len()
        )
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, RunTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RunTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(RunTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(RunTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(RunTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(RunTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(RunTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(RunTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (tile_count, pickup_count) = parse_dimensions(dimensions)?;

        let json = STANDARD_NO_PAD
            .decode(payload)
            .map_err(|_| RunTransferError::InvalidPayload)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&json).map_err(|_| RunTransferError::InvalidPayload)?;

        if decoded.tiles.len() != tile_count {
            return Err(RunTransferError::TileCountMismatch {
                expected: tile_count,
                found: decoded.tiles.len(),
            });
        }
        if decoded.pickups.len() != pickup_count {
            return Err(RunTransferError::PickupCountMismatch {
                expected: pickup_count,
                found: decoded.pickups.len(),
            });
        }

        Ok(Self {
            seed: decoded.seed,
            tile_length: decoded.tile_length,
            tiles: decoded.tiles,
            pickups: decoded.pickups,
            score: decoded.score,
        })
    }
}

fn parse_dimensions(value: &str) -> Result<(usize, usize), RunTransferError> {
    let invalid = || RunTransferError::InvalidDimensions(value.to_owned());
    let (tiles, pickups) = value.split_once('x').ok_or_else(invalid)?;
    let tiles = tiles.parse::<usize>().map_err(|_| invalid())?;
    let pickups = pickups.parse::<usize>().map_err(|_| invalid())?;
    Ok((tiles, pickups))
}

#[derive(Serialize, Deserialize)]
struct SerializableSnapshot {
    seed: u64,
    tile_length: f32,
    tiles: Vec<PathAnchor>,
    pickups: Vec<PathAnchor>,
    score: u32,
}

/// Failures that can occur while decoding a shared run snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RunTransferError {
    /// The provided string was empty or whitespace.
    EmptyPayload,
    /// The domain prefix was missing entirely.
    MissingPrefix,
    /// The version field was missing.
    MissingVersion,
    /// The run dimensions field was missing.
    MissingDimensions,
    /// The encoded payload was missing.
    MissingPayload,
    /// The domain prefix did not identify a run snapshot.
    InvalidPrefix(String),
    /// The snapshot was produced by an unsupported format version.
    UnsupportedVersion(String),
    /// The run dimensions field was not of the form `<tiles>x<pickups>`.
    InvalidDimensions(String),
    /// The payload was not valid base64-encoded JSON.
    InvalidPayload,
    /// The payload's tile count disagreed with the declared dimensions.
    TileCountMismatch {
        /// Count declared in the dimensions field.
        expected: usize,
        /// Count found in the decoded payload.
        found: usize,
    },
    /// The payload's pickup count disagreed with the declared dimensions.
    PickupCountMismatch {
        /// Count declared in the dimensions field.
        expected: usize,
        /// Count found in the decoded payload.
        found: usize,
    },
}

impl fmt::Display for RunTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "run snapshot is empty"),
            Self::MissingPrefix => write!(f, "run snapshot is missing its domain prefix"),
            Self::MissingVersion => write!(f, "run snapshot is missing its version"),
            Self::MissingDimensions => write!(f, "run snapshot is missing its dimensions"),
            Self::MissingPayload => write!(f, "run snapshot is missing its payload"),
            Self::InvalidPrefix(prefix) => {
                write!(f, "'{prefix}' does not identify a run snapshot")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported run snapshot version '{version}'")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "invalid run dimensions '{dimensions}'")
            }
            Self::InvalidPayload => write!(f, "run snapshot payload is not decodable"),
            Self::TileCountMismatch { expected, found } => {
                write!(f, "expected {expected} tiles but payload holds {found}")
            }
            Self::PickupCountMismatch { expected, found } => {
                write!(f, "expected {expected} pickups but payload holds {found}")
            }
        }
    }
}

impl Error for RunTransferError {}
