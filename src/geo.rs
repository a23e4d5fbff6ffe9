//! Normalization of administrative region names to boundary-file slugs.
//!
//! Survey region names and geojson boundary filenames diverge in punctuation,
//! legacy naming (Orissa vs Odisha) and synonyms, so the join runs over a
//! canonical key plus a hand-maintained alias table.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Known NFHS naming variants, keyed by normalized survey name, mapping to
/// the normalized geojson slug key. Hand-maintained, never inferred.
static SLUG_ALIASES: &[(&str, &str)] = &[
    ("nctofdelhi", "delhi"),
    ("jammuandkashmir", "jammuandkashmir"),
    ("dadraandnagarhaveli", "dnhanddd"),
    ("damananddiu", "dnhanddd"),
    ("dadraandnagarhavelianddamananddiu", "dnhanddd"),
    ("orissa", "odisha"),
    ("pondicherry", "puducherry"),
];

/// Canonicalizes free-text region names into a join key: lower-cased,
/// quote/whitespace trimmed, `&` expanded to `and`, all non-alphanumerics
/// stripped.
pub fn norm_key(text: &str) -> String {
    text.trim()
        .trim_matches('"')
        .to_lowercase()
        .replace('&', " and ")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Lookup from normalized region key to boundary-file slug, built from the
/// filenames in a geojson boundary directory. File contents are never read.
pub struct GeoLookup {
    slugs: HashMap<String, String>,
}

impl GeoLookup {
    /// Scans `dir` for `*.geojson` files in sorted filename order and indexes
    /// each stem under its normalized key.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut stems = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("reading boundary directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("geojson") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();

        let mut slugs = HashMap::new();
        for stem in stems {
            slugs.insert(norm_key(&stem), stem);
        }

        debug!(boundaries = slugs.len(), dir = %dir.display(), "Boundary slug lookup built");
        Ok(Self { slugs })
    }

    /// Resolves a survey region name to its boundary slug. `None` means the
    /// region has no matching boundary file; callers report it, never abort.
    pub fn resolve(&self, region_name: &str) -> Option<&str> {
        let key = norm_key(region_name);
        let key = SLUG_ALIASES
            .iter()
            .find(|(from, _)| *from == key)
            .map_or(key.as_str(), |(_, to)| *to);
        self.slugs.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}
