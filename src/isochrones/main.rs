//! Isochrone CLI.
//!
//! Requests cumulative isochrones from an OpenTripPlanner-style router,
//! optionally converts them into disjoint rings, and either writes them as
//! GeoJSON or joins them against POIs from a bounding box.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use isopoi::config::Config;
use isopoi::fetch::{build_table, FeatureSource};
use isopoi::http::ReqwestClient;
use isopoi::isochrone::{
    bands_to_geojson, difference_rings, intersect, IsochroneRequest, RoutingClient,
};
use isopoi::output::write_joined;
use isopoi::overpass::OverpassClient;
use isopoi::{BoundingBox, Crs, IsochroneBand, TagQuerySpec};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "isochrones")]
#[command(about = "Compute travel-time isochrones and join them with POIs")]
struct Args {
    /// Origin latitude
    #[arg(long, allow_hyphen_values = true, required_unless_present = "list_modes")]
    lat: Option<f64>,

    /// Origin longitude
    #[arg(long, allow_hyphen_values = true, required_unless_present = "list_modes")]
    lon: Option<f64>,

    /// Cutoff in seconds (repeatable or comma-separated)
    #[arg(long = "cutoff", value_delimiter = ',')]
    cutoffs: Vec<u32>,

    /// Departure time, e.g. 2024-03-05T08:30:00 (defaults to now)
    #[arg(long)]
    date_time: Option<NaiveDateTime>,

    /// Travel mode label as advertised by the router, e.g. Walk
    #[arg(long, required_unless_present = "list_modes")]
    mode: Option<String>,

    /// Cycling speed in km/h (cycling modes only)
    #[arg(long)]
    bike_speed: Option<f64>,

    /// Router base URL, e.g. http://localhost:8080/otp
    #[arg(long)]
    base_url: Option<String>,

    /// Router id
    #[arg(long)]
    router: Option<String>,

    /// API key sent as x-api-key
    #[arg(long)]
    api_key: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Convert cumulative isochrones into disjoint rings
    #[arg(long)]
    rings: bool,

    /// Print the router's travel modes and exit
    #[arg(long)]
    list_modes: bool,

    /// Join POIs inside west,south,east,north against the isochrones
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    bbox: Vec<f64>,

    /// Tag rule for the POI join: key, key=value or key=a,b (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    /// Local OSM PBF extract for the POI join
    #[arg(long)]
    pbf: Option<PathBuf>,

    /// Output path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
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

    // Validate the POI join before any request goes out.
    let join = if args.bbox.is_empty() {
        None
    } else {
        let bbox = BoundingBox::from_slice(&args.bbox)?;
        let spec = TagQuerySpec::from_args(None, &args.tags).context("Failed to parse tag rules")?;
        Some((bbox, spec))
    };

    let Some(base_url) = args.base_url.clone().or(config.routing.base_url.clone()) else {
        bail!("No router URL: pass --base-url or set [routing] base_url in the config file");
    };
    let router = args.router.clone().unwrap_or(config.routing.router.clone());
    let api_key = args.api_key.clone().or(config.routing.api_key.clone());

    let http = ReqwestClient::new().context("Failed to build HTTP client")?;
    let client = RoutingClient::new(&http, &base_url)?
        .with_router(router)
        .with_api_key(api_key);

    if args.list_modes {
        let mut out = open_output(args.output.as_ref())?;
        for option in client.available_modes()? {
            writeln!(out, "{}\t{}", option.name, option.value)?;
        }
        out.flush()?;
        return Ok(());
    }

    let (Some(lat), Some(lon), Some(mode)) = (args.lat, args.lon, args.mode.clone()) else {
        bail!("--lat, --lon and --mode are required");
    };
    let date_time = args.date_time.unwrap_or_else(|| Local::now().naive_local());
    let mut request = IsochroneRequest::new(lat, lon, args.cutoffs.clone(), date_time, mode);
    if let Some(kmh) = args.bike_speed {
        request = request.with_bike_speed(kmh);
    }

    let isochrones = client
        .calculate_isochrones(&request)
        .context("Failed to calculate isochrones")?;
    info!("Received {} isochrones", isochrones.len());

    let bands: Vec<IsochroneBand> = if args.rings {
        difference_rings(&isochrones)
    } else {
        isochrones.into_iter().map(IsochroneBand::from).collect()
    };

    let mut out = open_output(args.output.as_ref())?;

    let Some((bbox, spec)) = join else {
        serde_json::to_writer_pretty(&mut out, &bands_to_geojson(&bands))?;
        writeln!(out)?;
        out.flush()?;
        return Ok(());
    };

    let remote = OverpassClient::new(&http, config.overpass.url.clone());
    let features = FeatureSource::choose(args.pbf.as_deref(), &remote)
        .fetch(&bbox, &spec, || {})
        .context("Failed to fetch features")?;

    // Router polygons are geographic, so the POIs stay in EPSG:4326 for the join.
    let table = build_table(&features, &Crs::Wgs84.code(), &spec);
    for warning in &table.warnings {
        warn!("{}", warning);
    }

    let joined = intersect(&table.rows, &bands);
    write_joined(&mut out, &joined)?;
    out.flush()?;
    Ok(())
}
