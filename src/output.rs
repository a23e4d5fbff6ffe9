//! Export of the summary document and the end-of-run report.

use crate::summary::SummaryDocument;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Serializes the full document as compact JSON (no extraneous whitespace)
/// to `path`, creating parent directories as needed. Returns the number of
/// bytes written.
///
/// All maps in the document are ordered, so repeat runs over unchanged
/// inputs produce byte-identical files.
pub fn write_summary(path: &Path, doc: &SummaryDocument) -> Result<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }

    let bytes = serde_json::to_vec(doc)?;
    std::fs::write(path, &bytes)
        .with_context(|| format!("writing summary to {}", path.display()))?;

    info!(path = %path.display(), bytes = bytes.len(), "Summary written");
    Ok(bytes.len() as u64)
}

/// Logs per-survey region and cluster counts, warning on regions whose
/// boundary slug could not be resolved.
pub fn report(doc: &SummaryDocument) {
    for (survey_name, survey) in &doc.surveys {
        let total_clusters: usize = survey.states.values().map(|s| s.clusters.len()).sum();
        let missing_geo: Vec<&str> = survey
            .states
            .iter()
            .filter(|(_, s)| s.geo_slug.is_none())
            .map(|(name, _)| name.as_str())
            .collect();

        info!(
            survey = %survey_name,
            states = survey.states.len(),
            clusters = total_clusters,
            missing_geo_slugs = missing_geo.len(),
            "Survey summary"
        );

        if !missing_geo.is_empty() {
            warn!(
                survey = %survey_name,
                regions = %missing_geo.join(", "),
                "Regions without a resolved boundary slug"
            );
        }
    }
}
