//! Command-line runner for drought indicator products.
//!
//! Resolves a product name through the registry, drives the indicator's
//! download and processing steps, and prints the artifact path.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use drought_common::Region;
use drought_indices::{AnalysisArgs, Config, Product, Registry};
use output_formats::ArtifactFormat;

#[derive(Parser, Debug)]
#[command(name = "drought-cli")]
#[command(about = "Compute drought indicators for a region and date range")]
struct Args {
    /// Latitude(s): one value for a point, two for a box, three or more
    /// for a polygon ring
    #[arg(short = 'y', long = "latitude", num_args = 1.., value_delimiter = ',', required = true)]
    latitude: Vec<f64>,

    /// Longitude(s), paired with the latitudes
    #[arg(short = 'x', long = "longitude", num_args = 1.., value_delimiter = ',', required = true)]
    longitude: Vec<f64>,

    /// Product name: SPI, SPI_GDO, SMA_ECMWF, SMA_GDO, FAPAR_GDO or CDI
    #[arg(short, long)]
    product: String,

    /// Start date as YYYYMMDD
    #[arg(short = 's', long = "sdate")]
    start_date: String,

    /// End date as YYYYMMDD
    #[arg(short = 'e', long = "edate")]
    end_date: String,

    /// Output format: geojson or csv
    #[arg(short, long, default_value = "geojson")]
    format: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input data folder (overrides the configuration)
    #[arg(short, long)]
    indir: Option<PathBuf>,

    /// Output data folder (overrides the configuration)
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Add extra information to logs
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(indir) = args.indir {
        config.input_dir = indir;
    }
    if let Some(outdir) = args.outdir {
        config.output_dir = outdir;
    }

    if args.latitude.len() != args.longitude.len() {
        bail!(
            "latitude and longitude counts differ ({} vs {})",
            args.latitude.len(),
            args.longitude.len()
        );
    }
    let pairs: Vec<(f64, f64)> = args
        .latitude
        .iter()
        .copied()
        .zip(args.longitude.iter().copied())
        .collect();
    let region = Region::from_coords(&pairs)?;

    let analysis = AnalysisArgs::new(
        region,
        parse_date(&args.start_date)?,
        parse_date(&args.end_date)?,
        Product::parse(&args.product)?,
        ArtifactFormat::parse(&args.format)?,
    )?;

    info!(product = %args.product, start = %args.start_date, end = %args.end_date, "starting drought analysis");

    let registry = Registry::new(config);
    let mut indicator = registry.create(analysis)?;
    indicator.download().context("acquisition failed")?;
    let path = indicator.process().context("processing failed")?;

    info!(path = %path.display(), "processing complete");
    println!("{}", path.display());
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .with_context(|| format!("invalid date '{}', expected YYYYMMDD", s))
}
