//! CLI entry point for the cluster vaccination summary builder.
//!
//! Joins NFHS4/NFHS5 individual vaccination records with cluster GPS
//! coordinates and exports survey/state-wise cluster summaries as compact
//! JSON for the interactive map front end.

use anyhow::{Result, bail};
use clap::Parser;
use cluster_vax_summary::aggregate::{CoordWeighting, build_survey};
use cluster_vax_summary::geo::GeoLookup;
use cluster_vax_summary::output::{report, write_summary};
use cluster_vax_summary::summary::SummaryDocument;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cluster_vax_summary")]
#[command(about = "Builds NFHS cluster vaccination summaries for map visualization", long_about = None)]
struct Cli {
    /// NFHS4 individual vaccination status CSV
    #[arg(long, default_value = "data/NFHS4_12_to_23/NFHS4_IndividualData.csv")]
    nfhs4_individual: PathBuf,

    /// NFHS4 cluster GPS coordinate CSV
    #[arg(long, default_value = "data/NFHS4_12_to_23/Cluster_data.csv")]
    nfhs4_cluster: PathBuf,

    /// NFHS5 individual vaccination status CSV
    #[arg(long, default_value = "data/NFHS5_12_to_23/NFHS5_IndividualData.csv")]
    nfhs5_individual: PathBuf,

    /// NFHS5 cluster GPS coordinate CSV
    #[arg(long, default_value = "data/NFHS5_12_to_23/Cluster_data.csv")]
    nfhs5_cluster: PathBuf,

    /// Directory of per-state geojson boundary files (filenames only)
    #[arg(long, default_value = "data/india-states")]
    geo_dir: PathBuf,

    /// Output JSON path
    #[arg(short, long, default_value = "data/cluster-vax-summary.json")]
    out: PathBuf,

    /// Coordinate averaging policy: "record-weighted" or "per-cluster"
    #[arg(long, default_value = "record-weighted")]
    coord_weighting: CoordWeighting,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/cluster_vax_summary.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cluster_vax_summary.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    // All inputs are checked up front so that nothing is written on a
    // missing path.
    for path in [
        &cli.nfhs4_individual,
        &cli.nfhs4_cluster,
        &cli.nfhs5_individual,
        &cli.nfhs5_cluster,
        &cli.geo_dir,
    ] {
        ensure_exists(path)?;
    }

    let geo = GeoLookup::from_dir(&cli.geo_dir)?;
    info!(boundaries = geo.len(), "Boundary lookup ready");

    let mut surveys = BTreeMap::new();
    surveys.insert(
        "NFHS4".to_string(),
        build_survey(
            &cli.nfhs4_individual,
            &cli.nfhs4_cluster,
            &geo,
            cli.coord_weighting,
        )?,
    );
    surveys.insert(
        "NFHS5".to_string(),
        build_survey(
            &cli.nfhs5_individual,
            &cli.nfhs5_cluster,
            &geo,
            cli.coord_weighting,
        )?,
    );

    let doc = SummaryDocument::new(surveys);
    write_summary(&cli.out, &doc)?;
    report(&doc);

    Ok(())
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Missing required input: {}", path.display());
    }
    Ok(())
}
