//! Batch resolution of (identifier, city) requests into the two output artifacts:
//! the coordinate mapping and the missing-entries report.

use crate::config::ColumnConfig;
use crate::gazetteer::{GazetteerError, MatchResolver, MatchSource, Resolution, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

/// One row from the record source. Absent or empty fields mean "skip".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub identifier: Option<String>,
    pub city: Option<String>,
}

impl Request {
    pub fn new(identifier: &str, city: &str) -> Self {
        Self {
            identifier: Some(identifier.to_string()),
            city: Some(city.to_string()),
        }
    }

    fn fields(&self) -> Option<(&str, &str)> {
        let id = self.identifier.as_deref().filter(|s| !s.is_empty())?;
        let city = self.city.as_deref().filter(|s| !s.is_empty())?;
        Some((id, city))
    }
}

/// Read requests from a CSV file with a header row.
pub fn read_requests(path: &Path, columns: &ColumnConfig) -> Result<Vec<Request>> {
    let file = fs::File::open(path)?;
    read_requests_from(file, columns)
}

pub fn read_requests_from<R: Read>(reader: R, columns: &ColumnConfig) -> Result<Vec<Request>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| GazetteerError::Config(format!("CSV has no '{}' column", name)))
    };
    let id_col = position(&columns.identifier)?;
    let city_col = position(&columns.city)?;

    let mut out = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let field = |i: usize| row.get(i).filter(|s| !s.is_empty()).map(str::to_string);
        out.push(Request {
            identifier: field(id_col),
            city: field(city_col),
        });
    }
    Ok(out)
}

/// Success mapping value, consumed directly by the map renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedPlace {
    pub city: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEntry {
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub requested: usize,
    pub skipped: usize,
    pub resolved: usize,
    pub from_overrides: usize,
    pub missing: usize,
}

#[derive(Serialize)]
struct MissingReport<'a> {
    missing: &'a [MissingEntry],
}

#[derive(Debug, Default)]
pub struct ResolutionReport {
    /// Keyed by identifier. A repeated identifier keeps the last successful resolution.
    pub mapping: BTreeMap<String, MappedPlace>,
    /// In request order.
    pub missing: Vec<MissingEntry>,
    pub summary: ReportSummary,
}

impl ResolutionReport {
    /// Resolve every request. Lookups run in parallel; results are folded in input order.
    pub fn build(resolver: &MatchResolver, requests: &[Request]) -> Self {
        let outcomes: Vec<Option<Resolution>> = requests
            .par_iter()
            .map(|req| req.fields().map(|(_, city)| resolver.resolve(city)))
            .collect();

        let mut report = Self::default();
        report.summary.requested = requests.len();

        for (req, outcome) in requests.iter().zip(outcomes) {
            let (Some((id, city)), Some(resolution)) = (req.fields(), outcome) else {
                report.summary.skipped += 1;
                continue;
            };
            match resolution {
                Resolution::Resolved { lat, lng, source, .. } => {
                    tracing::debug!(id, city, lat, lng, %source, "resolved");
                    report.summary.resolved += 1;
                    if source == MatchSource::Override {
                        report.summary.from_overrides += 1;
                    }
                    report.mapping.insert(
                        id.to_string(),
                        MappedPlace { city: city.to_string(), lat, lng },
                    );
                }
                Resolution::Unresolved(reason) => {
                    tracing::debug!(id, city, %reason, "unresolved");
                    report.missing.push(MissingEntry {
                        name: id.to_string(),
                        city: city.to_string(),
                    });
                }
            }
        }
        report.summary.missing = report.missing.len();

        tracing::info!(
            requested = report.summary.requested,
            resolved = report.summary.resolved,
            overrides = report.summary.from_overrides,
            missing = report.summary.missing,
            skipped = report.summary.skipped,
            "resolution pass complete"
        );
        report
    }

    pub fn mapping_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.mapping)? + "\n")
    }

    pub fn missing_json(&self) -> Result<String> {
        let body = MissingReport { missing: &self.missing };
        Ok(serde_json::to_string_pretty(&body)? + "\n")
    }

    pub fn write_mapping(&self, path: &Path) -> Result<()> {
        write_file(path, &self.mapping_json()?)
    }

    pub fn write_missing(&self, path: &Path) -> Result<()> {
        write_file(path, &self.missing_json()?)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::{GazetteerIndex, OverrideTable, PlaceRecord};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn place(name: &str, alts: &[&str], class: char, population: u64, lat: f64, lng: f64) -> PlaceRecord {
        PlaceRecord {
            geoname_id: name.to_lowercase(),
            name: name.into(),
            ascii_name: name.into(),
            alternate_names: alts.iter().map(|s| s.to_string()).collect(),
            lat,
            lng,
            population,
            feature_class: class,
        }
    }

    fn resolver() -> MatchResolver {
        let index = GazetteerIndex::from_records(vec![
            place("Rome", &["Roma"], 'P', 2_318_895, 41.89193, 12.51133),
            place("Niš", &["Naissus", "Nish"], 'P', 260_237, 43.32472, 21.90333),
            place("Sremska Mitrovica", &["Sirmium"], 'P', 39_084, 44.97639, 19.61222),
        ]).unwrap();
        MatchResolver::new(Arc::new(index), Arc::new(OverrideTable::builtin()))
    }

    #[test]
    fn test_totality_and_partition() {
        let requests = vec![
            Request::new("Augustus", "Rome"),
            Request::new("Constantine I", "Naissus"),
            Request::new("Claudius II", "Sirmium"),
            Request::new("Nobody", "Unknown Village Xyz"),
            Request::new("Trajan", "Italica"),
        ];
        let report = ResolutionReport::build(&resolver(), &requests);

        for req in &requests {
            let id = req.identifier.as_deref().unwrap();
            let in_mapping = report.mapping.contains_key(id);
            let in_missing = report.missing.iter().any(|m| m.name == id);
            assert!(in_mapping ^ in_missing, "{} must appear exactly once", id);
        }
        assert_eq!(report.summary.resolved, 4);
        assert_eq!(report.summary.from_overrides, 2);
        assert_eq!(report.summary.missing, 1);
        assert_eq!(
            report.missing,
            vec![MissingEntry { name: "Nobody".into(), city: "Unknown Village Xyz".into() }]
        );
    }

    #[test]
    fn test_override_coordinates_are_exact() {
        let report = ResolutionReport::build(&resolver(), &[Request::new("Constantine I", "Naissus")]);
        let m = &report.mapping["Constantine I"];
        // Index has Niš under "naissus" too; the override must win.
        assert_eq!((m.lat, m.lng), (43.316295, 21.893884));
        assert_eq!(m.city, "Naissus");
    }

    #[test]
    fn test_skips_absent_fields() {
        let requests = vec![
            Request { identifier: Some("Galba".into()), city: None },
            Request { identifier: Some("Otho".into()), city: Some(String::new()) },
            Request { identifier: None, city: Some("Rome".into()) },
            Request::new("Nero", "Antium"),
        ];
        let report = ResolutionReport::build(&resolver(), &requests);
        assert_eq!(report.summary.skipped, 3);
        assert!(!report.mapping.contains_key("Galba"));
        assert!(!report.mapping.contains_key("Otho"));
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].name, "Nero");
    }

    #[test]
    fn test_duplicate_identifier_last_success_wins() {
        let requests = vec![Request::new("Nerva", "Rome"), Request::new("Nerva", "Sirmium")];
        let report = ResolutionReport::build(&resolver(), &requests);

        assert_eq!(report.summary.resolved, 2);
        assert_eq!(report.mapping.len(), 1);
        let m = &report.mapping["Nerva"];
        assert_eq!(m.city, "Sirmium");
        assert_eq!((m.lat, m.lng), (44.97639, 19.61222));
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_duplicate_identifier_miss_keeps_earlier_success() {
        let requests = vec![Request::new("Nerva", "Rome"), Request::new("Nerva", "Atlantis")];
        let report = ResolutionReport::build(&resolver(), &requests);

        assert_eq!(report.summary.resolved, 1);
        assert_eq!(report.summary.missing, 1);
        assert_eq!(report.mapping["Nerva"].city, "Rome");
        assert_eq!(
            report.missing,
            vec![MissingEntry { name: "Nerva".into(), city: "Atlantis".into() }]
        );
    }

    #[test]
    fn test_missing_order_follows_input() {
        let requests: Vec<Request> = (0..50)
            .map(|i| Request::new(&format!("id{:02}", i), &format!("Nowhere {}", i)))
            .collect();
        let report = ResolutionReport::build(&resolver(), &requests);
        let names: Vec<String> = report.missing.iter().map(|m| m.name.clone()).collect();
        let expected: Vec<String> = (0..50).map(|i| format!("id{:02}", i)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_json_shapes() {
        let requests = vec![Request::new("Augustus", "Roma"), Request::new("X", "Atlantis")];
        let report = ResolutionReport::build(&resolver(), &requests);

        let mapping: serde_json::Value = serde_json::from_str(&report.mapping_json().unwrap()).unwrap();
        assert_eq!(mapping["Augustus"]["city"], "Roma");
        assert_eq!(mapping["Augustus"]["lat"], 41.89193);
        assert_eq!(mapping["Augustus"]["lng"], 12.51133);

        let missing_json = report.missing_json().unwrap();
        assert!(missing_json.ends_with("}\n"));
        let missing: serde_json::Value = serde_json::from_str(&missing_json).unwrap();
        assert_eq!(missing["missing"][0]["name"], "X");
        assert_eq!(missing["missing"][0]["city"], "Atlantis");
    }

    #[test]
    fn test_json_keeps_unicode() {
        let report = ResolutionReport::build(&resolver(), &[Request::new("Constantius", "Niš")]);
        assert!(report.mapping_json().unwrap().contains("\"city\": \"Niš\""));
    }

    #[test]
    fn test_read_requests_csv() {
        let csv = "name,birth.cty,reign.start\nAugustus,Rome,0026-01-16\nGalba,,0068-06-08\nNero,Antium\n";
        let requests = read_requests_from(csv.as_bytes(), &ColumnConfig::default()).unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0], Request::new("Augustus", "Rome"));
        assert_eq!(requests[1].city, None);
        assert_eq!(requests[2].city.as_deref(), Some("Antium"));
    }

    #[test]
    fn test_read_requests_missing_column() {
        let err = read_requests_from("name,city\nA,B\n".as_bytes(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, GazetteerError::Config(_)));
    }

    #[test]
    fn test_write_files() {
        let dir = TempDir::new().unwrap();
        let report = ResolutionReport::build(&resolver(), &[Request::new("Augustus", "Rome")]);
        let out = dir.path().join("data").join("birthplace_coords.json");
        let rep = dir.path().join("report.json");
        report.write_mapping(&out).unwrap();
        report.write_missing(&rep).unwrap();
        assert!(fs::read_to_string(out).unwrap().contains("Augustus"));
        assert_eq!(fs::read_to_string(rep).unwrap(), "{\n  \"missing\": []\n}\n");
    }
}
