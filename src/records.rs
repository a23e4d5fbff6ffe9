//! Header-driven access to survey CSV rows.
//!
//! NFHS exports are column-presence tolerant: the same logical field can
//! appear under several column names (merge suffixes like `State.x`), values
//! may carry stray quotes, and indicator columns may be absent entirely.
//! Everything here degrades instead of erroring.

use csv::StringRecord;
use std::collections::HashMap;

/// A tracked vaccine and the individual-data columns that carry its status.
pub struct Vaccine {
    pub name: &'static str,
    pub card_col: &'static str,
    pub recall_col: &'static str,
}

/// Fixed list of tracked vaccines, in output order.
pub const VACCINES: &[Vaccine] = &[
    Vaccine {
        name: "MCV1",
        card_col: "Vaccinated_MCV1_card",
        recall_col: "Vaccinated_MCV1_recall",
    },
    Vaccine {
        name: "BCG",
        card_col: "Vaccinated_BCG_card",
        recall_col: "Vaccinated_BCG_recall",
    },
    Vaccine {
        name: "DPT3",
        card_col: "Vaccinated_DPT3_card",
        recall_col: "Vaccinated_DPT3_recall",
    },
];

/// Region-name columns tried in priority order; first non-empty wins.
pub const REGION_COLUMNS: &[&str] = &["State", "State.x", "State.y"];

/// Strips surrounding whitespace and stray double quotes from a raw field.
pub fn clean_text(value: &str) -> &str {
    value.trim().trim_matches('"').trim()
}

/// Parses a possibly-quoted numeric field. `None` on anything unparseable.
pub fn as_float(value: Option<&str>) -> Option<f64> {
    clean_text(value?).parse::<f64>().ok()
}

/// Collapses a vaccination indicator to 0/1: any strictly positive numeric
/// value counts as vaccinated, everything else (including garbage and
/// missing columns) counts as not.
pub fn as_binary(value: Option<&str>) -> u64 {
    match as_float(value) {
        Some(num) if num > 0.0 => 1,
        _ => 0,
    }
}

/// Column-name -> index map built from a CSV header row.
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (clean_text(name).to_string(), idx))
            .collect();
        Self { columns }
    }

    /// Returns the cleaned value of `column` in `record`, or `None` when the
    /// column is absent from the file.
    pub fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        let idx = *self.columns.get(column)?;
        record.get(idx).map(clean_text)
    }

    /// Tries `columns` in order, returning the first non-empty value.
    pub fn first_non_empty<'r>(
        &self,
        record: &'r StringRecord,
        columns: &[&str],
    ) -> Option<&'r str> {
        columns
            .iter()
            .filter_map(|col| self.get(record, col))
            .find(|value| !value.is_empty())
    }
}
