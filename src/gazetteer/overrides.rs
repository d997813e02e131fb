//! Manual coordinate overrides for birthplaces the gazetteer cannot resolve.
//!
//! Keys are matched exactly, without normalization.

use super::types::{GazetteerError, OverrideEntry, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Curated Roman-era birthplaces missing from (or misplaced in) cities5000.
const BUILTIN_OVERRIDES: &[(&str, f64, f64)] = &[
    ("Antitum", 41.450367, 12.624779),
    ("Terentinum", 41.785000, 14.550600),
    ("Falacrine", 42.61825, 13.15968),
    ("Italica", 37.443901, -6.046795),
    ("Lanuvium", 41.6745, 12.6972),
    ("Leptis Magna", 32.636674, 14.291252),
    ("Arca Caesarea", 36.045833, 34.530556),
    ("Budalia", 44.966447, 19.610106),
    ("Interamna Nahars", 42.561442, 12.646998),
    ("Dardania", 42.0166, 21.392067),
    ("Romuliana", 43.899167, 22.185),
    ("Felix Romuliana", 43.899167, 22.185),
    ("Naissus", 43.316295, 21.893884),
    ("Cauca", 41.21767, -4.52145),
];

#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: HashMap<String, OverrideEntry>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let entries = BUILTIN_OVERRIDES
            .iter()
            .map(|&(city, lat, lng)| (city.to_string(), OverrideEntry { lat, lng }))
            .collect();
        Self { entries }
    }

    /// Load a JSON object of `{"City": {"lat": .., "lng": ..}}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<String, OverrideEntry> = serde_json::from_str(json)?;
        for (city, e) in &entries {
            validate(city, e)?;
        }
        Ok(Self { entries })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Merge `other` into this table; entries in `other` replace existing ones.
    pub fn extend(&mut self, other: OverrideTable) {
        self.entries.extend(other.entries);
    }

    pub fn insert(&mut self, city: impl Into<String>, entry: OverrideEntry) -> Result<()> {
        let city = city.into();
        validate(&city, &entry)?;
        self.entries.insert(city, entry);
        Ok(())
    }

    /// Exact, case-sensitive match on the raw city string.
    pub fn get(&self, city: &str) -> Option<&OverrideEntry> {
        self.entries.get(city)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate(city: &str, e: &OverrideEntry) -> Result<()> {
    if city.is_empty() {
        return Err(GazetteerError::Config("override with empty city name".into()));
    }
    if !(-90.0..=90.0).contains(&e.lat) || !(-180.0..=180.0).contains(&e.lng) {
        return Err(GazetteerError::Config(format!(
            "override '{}' has out-of-range coordinates ({}, {})",
            city, e.lat, e.lng
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_contains_naissus() {
        let table = OverrideTable::builtin();
        assert_eq!(table.len(), 14);
        let e = table.get("Naissus").unwrap();
        assert_relative_eq!(e.lat, 43.316295);
        assert_relative_eq!(e.lng, 21.893884);
    }

    #[test]
    fn test_exact_match_only() {
        let table = OverrideTable::builtin();
        assert!(table.get("naissus").is_none());
        assert!(table.get(" Naissus").is_none());
        assert!(table.get("Leptis Magna").is_some());
    }

    #[test]
    fn test_from_json_and_extend() {
        let mut table = OverrideTable::builtin();
        let extra = OverrideTable::from_json_str(
            r#"{"Sirmium": {"lat": 44.9667, "lng": 19.6106}, "Cauca": {"lat": 41.0, "lng": -4.0}}"#,
        )
        .unwrap();
        table.extend(extra);
        assert_eq!(table.len(), 15);
        assert_relative_eq!(table.get("Cauca").unwrap().lat, 41.0);
        assert!(table.get("Sirmium").is_some());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = OverrideTable::from_json_str(r#"{"Atlantis": {"lat": 123.0, "lng": 0.0}}"#).unwrap_err();
        assert!(matches!(err, GazetteerError::Config(_)));

        let mut table = OverrideTable::empty();
        assert!(table.insert("", OverrideEntry { lat: 0.0, lng: 0.0 }).is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.json");
        fs::write(&path, r#"{"Salona": {"lat": 43.5386, "lng": 16.4831}}"#).unwrap();
        let table = OverrideTable::from_path(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("Salona").is_some());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            OverrideTable::from_json_str("{not json"),
            Err(GazetteerError::Json(_))
        ));
    }
}
