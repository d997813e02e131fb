//! In-memory inverted index over the GeoNames dump.
//!
//! Records live once in an arena; every normalized name variant maps to a
//! posting list of [`RecordId`]s in dataset file order.
//!
//! Row policies for the noisy dump:
//! - fewer than [`MIN_FIELDS`] tab-separated fields: row skipped
//! - empty or non-numeric population: kept with population 0
//! - latitude/longitude not parseable: row skipped
//! - invalid UTF-8 bytes: dropped from the line, the rest is parsed

use super::normalize::normalize;
use super::types::{GazetteerError, NormalizedKey, PlaceRecord, RecordId, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Minimum number of tab-separated fields in a usable dump line.
pub const MIN_FIELDS: usize = 15;

// Column positions in the GeoNames "geoname" table.
const COL_ID: usize = 0;
const COL_NAME: usize = 1;
const COL_ASCII_NAME: usize = 2;
const COL_ALTERNATE_NAMES: usize = 3;
const COL_LAT: usize = 4;
const COL_LNG: usize = 5;
const COL_FEATURE_CLASS: usize = 6;
const COL_POPULATION: usize = 14;

/// Result of parsing one dump line.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Record {
        record: PlaceRecord,
        /// Population field was present but not a non-negative integer.
        population_defaulted: bool,
    },
    TooFewFields,
    BadCoordinates,
}

/// Counters collected while building the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub lines: usize,
    pub records: usize,
    pub skipped_short: usize,
    pub skipped_coords: usize,
    pub defaulted_population: usize,
    pub keys: usize,
}

/// Population policy: `None` for empty or unparseable values, callers default to 0.
pub fn parse_population(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse::<u64>().ok()
}

/// Parse one line of the dump (without its trailing newline).
pub fn parse_row(line: &str) -> RowOutcome {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return RowOutcome::TooFewFields;
    }

    let (lat, lng) = match (
        fields[COL_LAT].trim().parse::<f64>(),
        fields[COL_LNG].trim().parse::<f64>(),
    ) {
        (Ok(lat), Ok(lng)) => (lat, lng),
        _ => return RowOutcome::BadCoordinates,
    };

    let raw_pop = fields[COL_POPULATION];
    let population = parse_population(raw_pop);
    let population_defaulted = population.is_none() && !raw_pop.trim().is_empty();

    let alternate_names = if fields[COL_ALTERNATE_NAMES].is_empty() {
        Vec::new()
    } else {
        fields[COL_ALTERNATE_NAMES].split(',').map(str::to_string).collect()
    };

    RowOutcome::Record {
        record: PlaceRecord {
            geoname_id: fields[COL_ID].to_string(),
            name: fields[COL_NAME].to_string(),
            ascii_name: fields[COL_ASCII_NAME].to_string(),
            alternate_names,
            lat,
            lng,
            population: population.unwrap_or(0),
            feature_class: fields[COL_FEATURE_CLASS].chars().next().unwrap_or(' '),
        },
        population_defaulted,
    }
}

/// Decode a raw line, silently dropping invalid UTF-8 sequences. Valid text,
/// including any literal U+FFFD, is kept as is.
fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()),
    }
}

/// Arena handles are 32-bit; the record at position `len` must fit one.
fn next_record_id(len: usize) -> Result<RecordId> {
    u32::try_from(len)
        .map(RecordId)
        .map_err(|_| GazetteerError::Capacity(len))
}

/// Read-only after build; safe to share across threads.
#[derive(Debug, Default)]
pub struct GazetteerIndex {
    records: Vec<PlaceRecord>,
    postings: HashMap<NormalizedKey, Vec<RecordId>>,
}

impl GazetteerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any iterator of records (used by tests and callers with pre-parsed data).
    pub fn from_records<I: IntoIterator<Item = PlaceRecord>>(records: I) -> Result<Self> {
        let mut index = Self::new();
        for r in records {
            index.insert(r)?;
        }
        Ok(index)
    }

    /// Build from a GeoNames dump on disk.
    pub fn from_path(path: &Path) -> Result<(Self, BuildStats)> {
        let file = File::open(path)?;
        let (index, stats) = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            records = stats.records,
            keys = stats.keys,
            "gazetteer index built"
        );
        Ok((index, stats))
    }

    /// Build from a GeoNames dump stream. Only I/O failures are errors; bad rows are counted.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<(Self, BuildStats)> {
        let mut index = Self::new();
        let mut stats = BuildStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            stats.lines += 1;
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            let line = decode_line(&buf);
            match parse_row(&line) {
                RowOutcome::Record { record, population_defaulted } => {
                    if population_defaulted {
                        stats.defaulted_population += 1;
                    }
                    index.insert(record)?;
                    stats.records += 1;
                }
                RowOutcome::TooFewFields => stats.skipped_short += 1,
                RowOutcome::BadCoordinates => stats.skipped_coords += 1,
            }
        }

        stats.keys = index.key_count();
        if stats.skipped_short + stats.skipped_coords > 0 {
            tracing::warn!(
                short = stats.skipped_short,
                bad_coords = stats.skipped_coords,
                "skipped malformed gazetteer rows"
            );
        }
        Ok((index, stats))
    }

    /// Add a record to the arena and post it under each of its normalized variants.
    /// Fails with [`GazetteerError::Capacity`] once the arena outgrows 32-bit ids.
    pub fn insert(&mut self, record: PlaceRecord) -> Result<RecordId> {
        let id = next_record_id(self.records.len())?;
        for variant in record.name_variants() {
            let key = normalize(variant);
            if key.is_empty() {
                continue;
            }
            let posting = self.postings.entry(key).or_default();
            // Several raw variants may fold to one key; list the record once.
            if posting.last() != Some(&id) {
                posting.push(id);
            }
        }
        self.records.push(record);
        Ok(id)
    }

    /// Exact lookup of a normalized key. Candidates come back in dataset order.
    pub fn lookup(&self, key: &NormalizedKey) -> Vec<&PlaceRecord> {
        self.postings
            .get(key)
            .map(|ids| ids.iter().map(|id| &self.records[id.index()]).collect())
            .unwrap_or_default()
    }

    /// Normalize then look up. The empty key never matches.
    pub fn lookup_name(&self, name: &str) -> Vec<&PlaceRecord> {
        let key = normalize(name);
        if key.is_empty() {
            return Vec::new();
        }
        self.lookup(&key)
    }

    pub fn record(&self, id: RecordId) -> Option<&PlaceRecord> {
        self.records.get(id.index())
    }

    /// Number of records in the arena.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct normalized keys.
    pub fn key_count(&self) -> usize {
        self.postings.len()
    }
}
