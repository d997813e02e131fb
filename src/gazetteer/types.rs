//! Core types for the gazetteer subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Feature class code GeoNames uses for populated places (cities, towns, villages).
pub const POPULATED_PLACE: char = 'P';

/// One row of the gazetteer. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRecord {
    pub geoname_id: String,
    pub name: String,
    pub ascii_name: String,
    pub alternate_names: Vec<String>,
    pub lat: f64,
    pub lng: f64,
    pub population: u64,
    pub feature_class: char,
}

impl PlaceRecord {
    pub fn is_populated_place(&self) -> bool {
        self.feature_class == POPULATED_PLACE
    }

    /// Raw name variants: primary, ASCII and alternates, deduplicated, empties removed.
    pub fn name_variants(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(2 + self.alternate_names.len());
        let all = [self.name.as_str(), self.ascii_name.as_str()]
            .into_iter()
            .chain(self.alternate_names.iter().map(String::as_str));
        for v in all {
            if !v.is_empty() && !out.contains(&v) {
                out.push(v);
            }
        }
        out
    }
}

/// Handle of a record inside the index arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u32);

impl RecordId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Case-folded, trimmed place name used as an index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub(crate) fn from_normalized(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A manually curated coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub lat: f64,
    pub lng: f64,
}

/// Where a successful resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Override,
    Gazetteer,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::Gazetteer => write!(f, "gazetteer"),
        }
    }
}

/// Why a name could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    NoMatchInIndex,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchInIndex => write!(f, "no_match_in_index"),
        }
    }
}

/// Outcome of resolving one city name.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved {
        lat: f64,
        lng: f64,
        source: MatchSource,
        /// Gazetteer record that won the tie-break (None for overrides).
        geoname_id: Option<String>,
    },
    Unresolved(UnresolvedReason),
}

impl Resolution {
    pub fn coords(&self) -> Option<(f64, f64)> {
        match self {
            Self::Resolved { lat, lng, .. } => Some((*lat, *lng)),
            Self::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Gazetteer errors. Per-request misses are not errors; see [`Resolution::Unresolved`].
#[derive(Debug, thiserror::Error)]
pub enum GazetteerError {
    #[error("dataset acquisition failed for {url}: {reason}")]
    Acquisition { url: String, reason: String },
    #[error("dataset archive error: {0}")]
    Archive(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("gazetteer arena is full: record #{0} does not fit a 32-bit record id")]
    Capacity(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = GazetteerError> = std::result::Result<T, E>;
