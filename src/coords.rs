//! Cluster GPS coordinate loading.

use crate::records::{HeaderIndex, as_float};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Reads the cluster coordinate CSV (`ClusterID`, `Longitude`, `Latitude`)
/// into a `cluster_id -> (lon, lat)` map.
///
/// First valid coordinate per cluster id wins; later duplicates are ignored.
/// Rows with a missing id or an unparseable coordinate are skipped without
/// error. A cluster id absent from the returned map means "no known
/// coordinate" and downstream drops its records entirely.
pub fn load_cluster_coords(path: &Path) -> Result<HashMap<String, (f64, f64)>> {
    let file = File::open(path)
        .with_context(|| format!("opening cluster coordinate file {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let index = HeaderIndex::from_headers(reader.headers()?);

    let mut coords = HashMap::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result?;

        let cluster_id = match index.get(&record, "ClusterID") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => continue,
        };

        let lon = as_float(index.get(&record, "Longitude"));
        let lat = as_float(index.get(&record, "Latitude"));
        let (Some(lon), Some(lat)) = (lon, lat) else {
            skipped += 1;
            continue;
        };

        coords.entry(cluster_id).or_insert((lon, lat));
    }

    debug!(
        clusters = coords.len(),
        skipped,
        path = %path.display(),
        "Cluster coordinates loaded"
    );
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_first_valid_coordinate_wins() {
        let path = temp_csv(
            "cvs_coords_first.csv",
            "ClusterID,Longitude,Latitude\n1,85.0,25.0\n1,99.0,99.0\n2,77.5,12.9\n",
        );

        let coords = load_cluster_coords(&path).unwrap();
        assert_eq!(coords.get("1"), Some(&(85.0, 25.0)));
        assert_eq!(coords.get("2"), Some(&(77.5, 12.9)));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unparseable_rows_skipped() {
        let path = temp_csv(
            "cvs_coords_bad.csv",
            "ClusterID,Longitude,Latitude\n1,not-a-number,25.0\n2,77.5,\n,80.0,15.0\n3,\"70.1\",\"20.2\"\n",
        );

        let coords = load_cluster_coords(&path).unwrap();
        assert_eq!(coords.len(), 1);
        assert_eq!(coords.get("3"), Some(&(70.1, 20.2)));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = std::env::temp_dir().join("cvs_coords_nope.csv");
        assert!(load_cluster_coords(&path).is_err());
    }
}
