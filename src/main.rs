//! CLI entry point for the AQI tile tool.
//!
//! Converts PM10 readings to AQI, annotates existing vector tiles with AQI
//! properties, renders reading CSVs as point tiles or GeoJSON, and summarizes
//! readings.

use anyhow::Result;
use aqi_tiles::aqi::{AqiCategory, AqiConverter, AqiResult, UpperBoundPolicy};
use aqi_tiles::config::Settings;
use aqi_tiles::fetch::{HttpClient, client_from_settings, load_source};
use aqi_tiles::geo::TileId;
use aqi_tiles::output::{append_records, print_json, to_geojson, write_file};
use aqi_tiles::reading::{
    AnnotatedReading, Concentration, Pollutant, SiteReading, annotate_readings, read_readings,
};
use aqi_tiles::stats::AqiSummary;
use aqi_tiles::tile::{
    AnnotateOptions, RenderOptions, annotate_tile, decode_tile, encode_tile, render_points,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aqi_tiles")]
#[command(about = "Annotate map tiles with a PM10 Air Quality Index", long_about = None)]
struct Cli {
    /// What to do above the highest breakpoint (overrides AQI_UPPER_BOUND)
    #[arg(long, global = true, value_name = "clamp|reject")]
    upper_bound: Option<UpperBoundPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single concentration to AQI
    Convert {
        /// Concentration in µg/m³
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Pollutant of the reading: pm10 or pm25
        #[arg(short, long, default_value = "pm10")]
        pollutant: Pollutant,
    },
    /// Attach AQI properties to the features of a vector tile
    Annotate {
        /// Path to tile file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Where to write the annotated tile
        #[arg(short, long)]
        out: PathBuf,

        /// Feature property holding pm10 (overrides AQI_SOURCE_PROPERTY)
        #[arg(long)]
        property: Option<String>,

        /// Only annotate this layer
        #[arg(long)]
        layer: Option<String>,

        /// Fail on the first feature without a valid value
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Gzip compress the written tile
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Render a readings CSV as a point layer for one z/x/y tile
    Render {
        /// Readings CSV (latitude,longitude,pm10[,time]) path or URL
        #[arg(value_name = "FILE_OR_URL")]
        readings: String,

        /// Tile address, e.g. 6/36/31
        #[arg(short, long)]
        tile: TileId,

        /// Where to write the tile
        #[arg(short, long)]
        out: PathBuf,

        /// Name of the generated layer
        #[arg(long, default_value = "aqi")]
        layer: String,

        /// Buffer around the tile in tile units
        #[arg(long, default_value_t = 64)]
        buffer: u32,

        /// Fail on the first reading without a valid value
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Gzip compress the written tile
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Print readings with their AQI as GeoJSON point data
    Points {
        /// Readings CSV path or URL
        #[arg(value_name = "FILE_OR_URL")]
        readings: String,

        /// Write GeoJSON to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also append the annotated rows to this CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Summarize the AQI distribution of a readings CSV
    Summary {
        /// Readings CSV path or URL
        #[arg(value_name = "FILE_OR_URL")]
        readings: String,
    },
}

#[derive(Serialize)]
struct ConvertOutput {
    pollutant: Pollutant,
    concentration: Concentration,
    aqi: u16,
    category: AqiCategory,
    color: &'static str,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let settings = Settings::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&settings.log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&settings.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aqi_tiles.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let policy = cli.upper_bound.unwrap_or(settings.upper_bound);

    match cli.command {
        Commands::Convert { value, pollutant } => {
            let concentration = Concentration::parse(&value)?;
            let result = AqiConverter::for_pollutant(pollutant)
                .with_policy(policy)
                .convert_concentration(concentration)?;

            print_json(&ConvertOutput {
                pollutant,
                concentration,
                aqi: result.aqi,
                category: result.category,
                color: result.color(),
            })?;
        }
        Commands::Annotate {
            source,
            out,
            property,
            layer,
            strict,
            gzip,
        } => {
            let client = client_from_settings(&settings)?;
            let bytes = load_source(client.as_ref(), &source).await?;
            let mut tile = decode_tile(&bytes)?;

            let options = AnnotateOptions {
                source_property: property.unwrap_or_else(|| settings.source_property.clone()),
                layer,
                strict,
            };
            let converter = AqiConverter::pm10().with_policy(policy);
            let report = annotate_tile(&mut tile, &converter, &options)?;
            if report.annotated == 0 {
                warn!(
                    property = %options.source_property,
                    "No feature carried a convertible value"
                );
            }

            write_file(&out, &encode_tile(&tile, gzip)?)?;
            print_json(&report)?;
        }
        Commands::Render {
            readings,
            tile,
            out,
            layer,
            buffer,
            strict,
            gzip,
        } => {
            let client = client_from_settings(&settings)?;
            let rows = load_readings_from(client.as_ref(), &readings).await?;

            let options = RenderOptions {
                layer_name: layer,
                buffer,
                strict,
                ..Default::default()
            };
            let converter = AqiConverter::pm10().with_policy(policy);
            let (rendered, report) = render_points(&rows, tile, &converter, &options)?;

            write_file(&out, &encode_tile(&rendered, gzip)?)?;
            print_json(&report)?;
        }
        Commands::Points { readings, out, csv } => {
            let client = client_from_settings(&settings)?;
            let rows = load_readings_from(client.as_ref(), &readings).await?;
            let converter = AqiConverter::pm10().with_policy(policy);
            let annotated = annotate_readings(&rows, &converter);

            if let Some(path) = csv {
                append_records(&path, &annotated)?;
            }

            let geojson = to_geojson(&annotated);
            match out {
                Some(path) => write_file(&path, &serde_json::to_vec_pretty(&geojson)?)?,
                None => print_json(&geojson)?,
            }
        }
        Commands::Summary { readings } => {
            let client = client_from_settings(&settings)?;
            let rows = load_readings_from(client.as_ref(), &readings).await?;
            let converter = AqiConverter::pm10().with_policy(policy);
            let results: Vec<AqiResult> = annotate_readings(&rows, &converter)
                .iter()
                .map(AnnotatedReading::result)
                .collect();

            print_json(&AqiSummary::from_results(&results))?;
        }
    }

    Ok(())
}

/// Loads a readings CSV from a local path or URL.
async fn load_readings_from(client: &dyn HttpClient, source: &str) -> Result<Vec<SiteReading>> {
    let bytes = load_source(client, source).await?;
    let rows = read_readings(bytes.as_slice())?;
    info!(rows = rows.len(), "Readings ready");
    Ok(rows)
}
