//! POI extraction CLI.
//!
//! Reads a local OSM PBF extract when one is given (falling back to Overpass
//! otherwise) and writes the long-format POI table as CSV.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use isopoi::config::Config;
use isopoi::fetch::{build_table, FeatureSource};
use isopoi::http::ReqwestClient;
use isopoi::output::{write_table, write_table_to_path};
use isopoi::overpass::OverpassClient;
use isopoi::{BoundingBox, TagQuerySpec};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "pois")]
#[command(about = "Extract OSM points of interest into a long-format table")]
struct Args {
    /// Bounding box as west,south,east,north
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    bbox: Vec<f64>,

    /// Tag rule: key, key=value or key=a,b (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    /// Tag rules as a JSON object, e.g. '{"amenity": ["school"]}'
    #[arg(long)]
    tags_json: Option<String>,

    /// Output CRS (defaults to the config file, then EPSG:3857)
    #[arg(long)]
    crs: Option<String>,

    /// Local OSM PBF extract
    #[arg(long)]
    pbf: Option<PathBuf>,

    /// Overpass interpreter URL
    #[arg(long)]
    overpass_url: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV output path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load config file")?;
    let crs = args.crs.unwrap_or(config.output.crs);
    let overpass_url = args.overpass_url.unwrap_or(config.overpass.url);

    let bbox = BoundingBox::from_slice(&args.bbox)?;
    let spec = TagQuerySpec::from_args(args.tags_json.as_deref(), &args.tags)
        .context("Failed to parse tag rules")?;
    if spec.is_empty() {
        warn!("No tag rules given; every object in the bounding box will match");
    }

    info!("isopoi POI extraction");
    info!(
        "Bounding box: {},{},{},{}",
        bbox.west, bbox.south, bbox.east, bbox.north
    );

    let http = ReqwestClient::new().context("Failed to build HTTP client")?;
    let remote = OverpassClient::new(http, overpass_url);
    let source = FeatureSource::choose(args.pbf.as_deref(), &remote);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} objects ({per_sec})")?,
    );

    let features = source
        .fetch(&bbox, &spec, || pb.inc(1))
        .context("Failed to fetch features")?;
    pb.finish_with_message("Extraction complete");

    let table = build_table(&features, &crs, &spec);
    for warning in &table.warnings {
        warn!("{}", warning);
    }

    match &args.output {
        Some(path) => {
            write_table_to_path(path, &table.rows)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} rows to {}", table.len(), path.display());
        }
        None => write_table(io::stdout().lock(), &table.rows)?,
    }

    Ok(())
}
