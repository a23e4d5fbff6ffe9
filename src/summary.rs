//! Finalization of accumulated cluster counts into the serializable
//! survey summary consumed by the map front end.

use crate::aggregate::{ClusterAccumulator, RegionClusters};
use crate::geo::GeoLookup;
use crate::records::VACCINES;
use serde::Serialize;
use std::collections::BTreeMap;

/// Surveyed age bracket for the birth-recode pipeline inputs.
pub const AGE_GROUP: &str = "12-23 months";

/// Sample size, positive/negative counts and rate for one vaccine under one
/// measurement rule.
#[derive(Debug, Default, Serialize)]
pub struct RuleTotals {
    pub n: u64,
    pub ones: u64,
    pub zeros: u64,
    pub rate: f64,
}

/// Region-level rollup for one vaccine: card-only (`mr0`) and
/// card-or-recall (`mr1`).
#[derive(Debug, Default, Serialize)]
pub struct VaccineTotals {
    pub mr0: RuleTotals,
    pub mr1: RuleTotals,
}

/// Finalized per-cluster summary. Count and rate maps are keyed by vaccine
/// name; rates and coordinates are rounded to 6 decimals.
#[derive(Debug, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: String,
    pub lon: f64,
    pub lat: f64,
    pub n: u64,
    pub ones_mr0: BTreeMap<String, u64>,
    pub ones_mr1: BTreeMap<String, u64>,
    pub zeros_mr0: BTreeMap<String, u64>,
    pub zeros_mr1: BTreeMap<String, u64>,
    pub rate_mr0: BTreeMap<String, f64>,
    pub rate_mr1: BTreeMap<String, f64>,
}

/// Per-region output: resolved boundary slug (null when normalization
/// fails), clusters sorted by numeric id, and summed totals.
#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub geo_slug: Option<String>,
    pub clusters: Vec<ClusterSummary>,
    pub totals: BTreeMap<String, VaccineTotals>,
}

/// One survey round of the export document.
#[derive(Debug, Serialize)]
pub struct SurveySummary {
    pub source_individual: String,
    pub source_cluster: String,
    pub age_group: String,
    pub states: BTreeMap<String, RegionSummary>,
    pub vaccines: Vec<String>,
}

/// Rounds to 6 decimal places for output stability.
pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn rate(ones: u64, n: u64) -> f64 {
    if n == 0 {
        0.0
    } else {
        round6(ones as f64 / n as f64)
    }
}

fn vaccine_names() -> Vec<String> {
    VACCINES.iter().map(|v| v.name.to_string()).collect()
}

fn finalize_cluster(acc: &ClusterAccumulator, totals: &mut BTreeMap<String, VaccineTotals>) -> ClusterSummary {
    // coord_n >= 1 for any accumulator that exists; the floor is a guard.
    let coord_n = acc.coord_n.max(1) as f64;

    let mut summary = ClusterSummary {
        cluster_id: acc.cluster_id.clone(),
        lon: round6(acc.lon_sum / coord_n),
        lat: round6(acc.lat_sum / coord_n),
        n: acc.n,
        ones_mr0: BTreeMap::new(),
        ones_mr1: BTreeMap::new(),
        zeros_mr0: BTreeMap::new(),
        zeros_mr1: BTreeMap::new(),
        rate_mr0: BTreeMap::new(),
        rate_mr1: BTreeMap::new(),
    };

    for (slot, vaccine) in VACCINES.iter().enumerate() {
        let ones0 = acc.ones_mr0[slot];
        let ones1 = acc.ones_mr1[slot];
        let zeros0 = acc.n.saturating_sub(ones0);
        let zeros1 = acc.n.saturating_sub(ones1);

        summary.ones_mr0.insert(vaccine.name.to_string(), ones0);
        summary.ones_mr1.insert(vaccine.name.to_string(), ones1);
        summary.zeros_mr0.insert(vaccine.name.to_string(), zeros0);
        summary.zeros_mr1.insert(vaccine.name.to_string(), zeros1);
        summary.rate_mr0.insert(vaccine.name.to_string(), rate(ones0, acc.n));
        summary.rate_mr1.insert(vaccine.name.to_string(), rate(ones1, acc.n));

        // Region totals only ever accumulate cluster contributions.
        let total = totals.entry(vaccine.name.to_string()).or_default();
        total.mr0.n += acc.n;
        total.mr0.ones += ones0;
        total.mr0.zeros += zeros0;
        total.mr1.n += acc.n;
        total.mr1.ones += ones1;
        total.mr1.zeros += zeros1;
    }

    summary
}

/// Orders cluster ids numerically; non-numeric ids (never produced by the
/// survey exports) sort after numeric ones, by string, for determinism.
fn cluster_sort_key(cluster_id: &str) -> (u8, i64, String) {
    match cluster_id.parse::<i64>() {
        Ok(num) => (0, num, String::new()),
        Err(_) => (1, 0, cluster_id.to_string()),
    }
}

/// Converts the accumulated region buckets into the final survey summary:
/// rounded rates, summed region totals, numerically sorted cluster lists,
/// and resolved boundary slugs.
pub fn finalize_survey(
    regions: RegionClusters,
    geo: &GeoLookup,
    source_individual: &str,
    source_cluster: &str,
) -> SurveySummary {
    let mut states = BTreeMap::new();

    for (region, clusters) in regions {
        let mut totals: BTreeMap<String, VaccineTotals> = BTreeMap::new();
        let mut summaries: Vec<ClusterSummary> = clusters
            .values()
            .map(|acc| finalize_cluster(acc, &mut totals))
            .collect();
        summaries.sort_by_key(|c| cluster_sort_key(&c.cluster_id));

        for total in totals.values_mut() {
            total.mr0.rate = rate(total.mr0.ones, total.mr0.n);
            total.mr1.rate = rate(total.mr1.ones, total.mr1.n);
        }

        states.insert(
            region.clone(),
            RegionSummary {
                geo_slug: geo.resolve(&region).map(str::to_string),
                clusters: summaries,
                totals,
            },
        );
    }

    SurveySummary {
        source_individual: source_individual.to_string(),
        source_cluster: source_cluster.to_string(),
        age_group: AGE_GROUP.to_string(),
        states,
        vaccines: vaccine_names(),
    }
}

/// Full export document covering every survey round in one invocation.
#[derive(Debug, Serialize)]
pub struct SummaryDocument {
    pub pipeline: String,
    pub description: String,
    pub vaccines: Vec<String>,
    pub surveys: BTreeMap<String, SurveySummary>,
}

impl SummaryDocument {
    pub fn new(surveys: BTreeMap<String, SurveySummary>) -> Self {
        Self {
            pipeline: "DHS birth-recode + cluster GPS join".to_string(),
            description: "Built from NFHS*_IndividualData.csv and Cluster_data.csv generated by \
                          the NFHS4/NFHS5 vaccine scripts (card and maternal recall indicators)."
                .to_string(),
            vaccines: vaccine_names(),
            surveys,
        }
    }
}
