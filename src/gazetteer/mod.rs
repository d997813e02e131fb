//! Gazetteer subsystem for birthplace resolution.
//!
//! Builds an in-memory inverted index over the GeoNames dump, applies manual
//! overrides, and resolves place names by exact normalized match.

pub mod dataset;
pub mod index;
pub mod normalize;
pub mod overrides;
pub mod resolver;
pub mod types;

pub use dataset::DatasetProvider;
pub use index::{BuildStats, GazetteerIndex};
pub use normalize::normalize;
pub use overrides::OverrideTable;
pub use resolver::MatchResolver;
pub use types::{
    GazetteerError, MatchSource, NormalizedKey, OverrideEntry, PlaceRecord, RecordId, Resolution, Result,
    UnresolvedReason,
};
