//! Place-name normalization.
//!
//! Trim + per-character lowercase only. Diacritics, punctuation and internal
//! spacing are kept: the gazetteer's own variants go through the same function,
//! so both sides agree. Lowercasing is context-free, so a capital sigma always
//! becomes `σ`, never the word-final `ς`.

use super::types::NormalizedKey;

pub fn normalize(name: &str) -> NormalizedKey {
    NormalizedKey::from_normalized(name.trim().chars().flat_map(char::to_lowercase).collect())
}
