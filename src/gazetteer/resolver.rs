//! Match resolver: overrides first, then exact index lookup plus tie-break.
//!
//! Tie-break: populated places ('P') before any other feature class, then
//! highest population. Anything still tied goes to the earliest candidate in
//! dataset order. That last step is traversal order, not a ranking rule.

use super::index::GazetteerIndex;
use super::normalize::normalize;
use super::overrides::OverrideTable;
use super::types::{MatchSource, PlaceRecord, Resolution, UnresolvedReason};
use std::cmp::Reverse;
use std::sync::Arc;

/// Sort key for candidates; smaller is better.
fn rank_key(record: &PlaceRecord) -> (u8, Reverse<u64>) {
    let rank = if record.is_populated_place() { 0 } else { 1 };
    (rank, Reverse(record.population))
}

/// Pick the winning candidate. Returns the first one among equals.
pub fn best_match<'a>(candidates: &[&'a PlaceRecord]) -> Option<&'a PlaceRecord> {
    candidates.iter().copied().min_by_key(|r| rank_key(r))
}

/// Cheap to clone; the index and overrides are shared read-only.
#[derive(Debug, Clone)]
pub struct MatchResolver {
    index: Arc<GazetteerIndex>,
    overrides: Arc<OverrideTable>,
}

impl MatchResolver {
    pub fn new(index: Arc<GazetteerIndex>, overrides: Arc<OverrideTable>) -> Self {
        Self { index, overrides }
    }

    pub fn index(&self) -> &GazetteerIndex {
        &self.index
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Resolve one city name. Never fails; a miss is `Resolution::Unresolved`.
    pub fn resolve(&self, city: &str) -> Resolution {
        if let Some(o) = self.overrides.get(city) {
            return Resolution::Resolved {
                lat: o.lat,
                lng: o.lng,
                source: MatchSource::Override,
                geoname_id: None,
            };
        }

        let key = normalize(city);
        if key.is_empty() {
            return Resolution::Unresolved(UnresolvedReason::NoMatchInIndex);
        }

        let candidates = self.index.lookup(&key);
        match best_match(&candidates) {
            Some(r) => Resolution::Resolved {
                lat: r.lat,
                lng: r.lng,
                source: MatchSource::Gazetteer,
                geoname_id: Some(r.geoname_id.clone()),
            },
            None => Resolution::Unresolved(UnresolvedReason::NoMatchInIndex),
        }
    }

    /// All index candidates for `city`, best first (stable on ties).
    pub fn ranked_candidates(&self, city: &str) -> Vec<&PlaceRecord> {
        let mut candidates = self.index.lookup_name(city);
        candidates.sort_by_key(|r| rank_key(r));
        candidates
    }
}
