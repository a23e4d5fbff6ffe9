//! Streaming aggregation of individual vaccination records into per-cluster
//! running counts, joined against the cluster coordinate table.

use crate::coords::load_cluster_coords;
use crate::geo::GeoLookup;
use crate::records::{HeaderIndex, REGION_COLUMNS, VACCINES, as_binary};
use crate::summary::{SurveySummary, finalize_survey};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Policy for how a cluster's output coordinate is averaged.
///
/// The original pipeline re-adds the cluster coordinate for every individual
/// record joined to it, so clusters surveyed more heavily weigh their (single)
/// coordinate more; with one coordinate per cluster id both policies produce
/// the same point, but the observation counts differ and the policy is kept
/// explicit rather than silently normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordWeighting {
    /// One coordinate observation per individual record (original behavior).
    #[default]
    RecordWeighted,
    /// One coordinate observation per cluster, taken at creation.
    PerCluster,
}

impl std::str::FromStr for CoordWeighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "record-weighted" => Ok(Self::RecordWeighted),
            "per-cluster" => Ok(Self::PerCluster),
            other => Err(format!(
                "unknown coordinate weighting '{other}' (expected 'record-weighted' or 'per-cluster')"
            )),
        }
    }
}

/// Running counts for one (region, cluster) pair. Created on the first
/// individual record seen for the cluster, mutated by every later one.
pub struct ClusterAccumulator {
    pub cluster_id: String,
    pub lon_sum: f64,
    pub lat_sum: f64,
    pub coord_n: u64,
    pub n: u64,
    /// Card-only positives, indexed in [`VACCINES`] order.
    pub ones_mr0: Vec<u64>,
    /// Card-or-recall positives, indexed in [`VACCINES`] order.
    pub ones_mr1: Vec<u64>,
}

impl ClusterAccumulator {
    fn new(cluster_id: &str, lon: f64, lat: f64) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            lon_sum: lon,
            lat_sum: lat,
            coord_n: 1,
            n: 0,
            ones_mr0: vec![0; VACCINES.len()],
            ones_mr1: vec![0; VACCINES.len()],
        }
    }
}

/// Per-region accumulator buckets, keyed region name -> cluster id.
pub type RegionClusters = BTreeMap<String, BTreeMap<String, ClusterAccumulator>>;

/// Builds the summary for one survey round: loads cluster coordinates,
/// streams the individual CSV, joins and accumulates, then finalizes.
///
/// Records with an empty region name, an empty cluster id, or a cluster id
/// absent from the coordinate table are silently excluded.
pub fn build_survey(
    individual_csv: &Path,
    cluster_csv: &Path,
    geo: &GeoLookup,
    weighting: CoordWeighting,
) -> Result<SurveySummary> {
    let coords = load_cluster_coords(cluster_csv)?;

    let file = File::open(individual_csv)
        .with_context(|| format!("opening individual data file {}", individual_csv.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let index = HeaderIndex::from_headers(reader.headers()?);

    let mut regions = RegionClusters::new();
    let mut rows = 0usize;
    let mut dropped = 0usize;

    for result in reader.records() {
        let record = result?;
        rows += 1;

        let Some(region) = index.first_non_empty(&record, REGION_COLUMNS) else {
            dropped += 1;
            continue;
        };

        let cluster_id = match index.get(&record, "ClusterID") {
            Some(id) if !id.is_empty() => id,
            _ => {
                dropped += 1;
                continue;
            }
        };

        // No known coordinate means the cluster cannot be mapped; drop the
        // record rather than defaulting a location.
        let Some(&(lon, lat)) = coords.get(cluster_id) else {
            dropped += 1;
            continue;
        };

        let cluster = regions
            .entry(region.to_string())
            .or_default()
            .entry(cluster_id.to_string())
            .or_insert_with(|| ClusterAccumulator::new(cluster_id, lon, lat));

        if cluster.n > 0 && weighting == CoordWeighting::RecordWeighted {
            cluster.lon_sum += lon;
            cluster.lat_sum += lat;
            cluster.coord_n += 1;
        }

        cluster.n += 1;

        for (slot, vaccine) in VACCINES.iter().enumerate() {
            let card = as_binary(index.get(&record, vaccine.card_col));
            let recall = as_binary(index.get(&record, vaccine.recall_col));

            cluster.ones_mr0[slot] += card;
            cluster.ones_mr1[slot] += if card > 0 || recall > 0 { 1 } else { 0 };
        }
    }

    let region_count = regions.len();
    let cluster_count: usize = regions.values().map(BTreeMap::len).sum();
    info!(
        rows,
        dropped,
        regions = region_count,
        clusters = cluster_count,
        source = %individual_csv.display(),
        "Survey aggregated"
    );

    Ok(finalize_survey(
        regions,
        geo,
        &individual_csv.display().to_string(),
        &cluster_csv.display().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoLookup;
    use std::fs;
    use std::path::PathBuf;

    const INDIV_HEADER: &str = "State,ClusterID,Vaccinated_MCV1_card,Vaccinated_MCV1_recall,\
        Vaccinated_BCG_card,Vaccinated_BCG_recall,Vaccinated_DPT3_card,Vaccinated_DPT3_recall\n";

    fn setup(name: &str, indiv_rows: &str, cluster_rows: &str) -> (PathBuf, PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let indiv = dir.join("individual.csv");
        fs::write(&indiv, format!("{INDIV_HEADER}{indiv_rows}")).unwrap();

        let cluster = dir.join("cluster.csv");
        fs::write(
            &cluster,
            format!("ClusterID,Longitude,Latitude\n{cluster_rows}"),
        )
        .unwrap();

        let geo = dir.join("geo");
        fs::create_dir_all(&geo).unwrap();
        fs::write(geo.join("bihar.geojson"), "{}").unwrap();

        (dir, indiv, cluster)
    }

    #[test]
    fn test_card_and_recall_rules() {
        let (dir, indiv, cluster) = setup(
            "cvs_agg_rules",
            "Bihar,1,1,0,0,0,0,0\nBihar,1,0,1,0,0,0,0\n",
            "1,85.0,25.0\n",
        );
        let geo = GeoLookup::from_dir(&dir.join("geo")).unwrap();

        let survey =
            build_survey(&indiv, &cluster, &geo, CoordWeighting::RecordWeighted).unwrap();
        let region = survey.states.get("Bihar").unwrap();
        assert_eq!(region.clusters.len(), 1);

        let c = &region.clusters[0];
        assert_eq!(c.n, 2);
        assert_eq!(c.lon, 85.0);
        assert_eq!(c.lat, 25.0);
        assert_eq!(c.ones_mr0["MCV1"], 1);
        assert_eq!(c.ones_mr1["MCV1"], 2);
        assert_eq!(c.rate_mr0["MCV1"], 0.5);
        assert_eq!(c.rate_mr1["MCV1"], 1.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cluster_without_coordinate_dropped() {
        let (dir, indiv, cluster) = setup(
            "cvs_agg_nocoord",
            "Bihar,1,1,0,0,0,0,0\nBihar,7,1,0,0,0,0,0\n",
            "1,85.0,25.0\n",
        );
        let geo = GeoLookup::from_dir(&dir.join("geo")).unwrap();

        let survey =
            build_survey(&indiv, &cluster, &geo, CoordWeighting::RecordWeighted).unwrap();
        let region = survey.states.get("Bihar").unwrap();
        assert_eq!(region.clusters.len(), 1);
        assert!(region.clusters.iter().all(|c| c.cluster_id != "7"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_region_or_cluster_excluded() {
        let (dir, indiv, cluster) = setup(
            "cvs_agg_missing",
            ",1,1,0,0,0,0,0\nBihar,,1,0,0,0,0,0\nBihar,1,1,0,0,0,0,0\n",
            "1,85.0,25.0\n",
        );
        let geo = GeoLookup::from_dir(&dir.join("geo")).unwrap();

        let survey =
            build_survey(&indiv, &cluster, &geo, CoordWeighting::RecordWeighted).unwrap();
        assert_eq!(survey.states.len(), 1);
        assert_eq!(survey.states.get("Bihar").unwrap().clusters[0].n, 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_region_fallback_column() {
        let dir = std::env::temp_dir().join("cvs_agg_fallback");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let indiv = dir.join("individual.csv");
        fs::write(
            &indiv,
            "State.x,ClusterID,Vaccinated_MCV1_card,Vaccinated_MCV1_recall\nBihar,1,1,0\n",
        )
        .unwrap();
        let cluster = dir.join("cluster.csv");
        fs::write(&cluster, "ClusterID,Longitude,Latitude\n1,85.0,25.0\n").unwrap();
        let geo_dir = dir.join("geo");
        fs::create_dir_all(&geo_dir).unwrap();
        let geo = GeoLookup::from_dir(&geo_dir).unwrap();

        let survey =
            build_survey(&indiv, &cluster, &geo, CoordWeighting::RecordWeighted).unwrap();
        assert!(survey.states.contains_key("Bihar"));
        // BCG/DPT3 columns are absent entirely; indicators degrade to 0.
        let c = &survey.states.get("Bihar").unwrap().clusters[0];
        assert_eq!(c.ones_mr0["BCG"], 0);
        assert_eq!(c.ones_mr0["MCV1"], 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_coord_weighting_policies() {
        // Two clusters merged under one id cannot happen (first write wins),
        // so both policies yield the same point; the observation counts are
        // what differ.
        let (dir, indiv, cluster) = setup(
            "cvs_agg_weighting",
            "Bihar,1,1,0,0,0,0,0\nBihar,1,0,0,0,0,0,0\nBihar,1,0,0,0,0,0,0\n",
            "1,85.0,25.0\n",
        );
        let geo = GeoLookup::from_dir(&dir.join("geo")).unwrap();

        for weighting in [CoordWeighting::RecordWeighted, CoordWeighting::PerCluster] {
            let survey = build_survey(&indiv, &cluster, &geo, weighting).unwrap();
            let c = &survey.states.get("Bihar").unwrap().clusters[0];
            assert_eq!(c.n, 3);
            assert_eq!(c.lon, 85.0);
            assert_eq!(c.lat, 25.0);
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_coord_weighting_parse() {
        assert_eq!(
            "record-weighted".parse::<CoordWeighting>().unwrap(),
            CoordWeighting::RecordWeighted
        );
        assert_eq!(
            "per-cluster".parse::<CoordWeighting>().unwrap(),
            CoordWeighting::PerCluster
        );
        assert!("weighted".parse::<CoordWeighting>().is_err());
    }
}
