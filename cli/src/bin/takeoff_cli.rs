use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

use takeoff::{
    AreaScale, MarkupRenderer, Region, RenderableDetection, TakeoffCommand, TakeoffConfig,
    TakeoffManager, command::BuildingInput, detections_from_geojson_str, detections_to_geojson,
    ImageSource, Detection,
};
use takeoff_cli::{TakeoffJob, load_config, parse_region, run_job, select_detections, write_json};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TakeoffConfig file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw detector JSON into canonical detections
    Normalize {
        /// Detector output file
        input: PathBuf,
        /// Class for segmentation output, which has none of its own
        #[arg(long, default_value = "object")]
        class: String,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit a GeoJSON FeatureCollection
        #[arg(long)]
        geojson: bool,
    },
    /// Keep predictions whose center lies inside a region
    Filter {
        /// Detector output file with center-box predictions
        input: PathBuf,
        /// Region as x,y,width,height
        #[arg(long, value_parser = parse_region, allow_hyphen_values = true)]
        region: Region,
        #[arg(long, default_value = "0.3")]
        threshold: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Net siding area for buildings with assigned openings
    Siding {
        /// JSON array of buildings: exterior, openings, building_sf, roof_sf
        input: PathBuf,
        #[arg(long, default_value = "1.0")]
        pixels_per_foot: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Draw detections over a photo and export a PNG markup
    Render {
        /// Base photo
        #[arg(short, long)]
        image: PathBuf,
        /// Canonical detections as JSON or GeoJSON
        #[arg(short, long)]
        detections: PathBuf,
        #[arg(long)]
        header: Option<String>,
        /// Directory for the PNG
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Run a full takeoff job file (.toml or .json)
    Run {
        job: PathBuf,
    },
    /// Execute a JSON-encoded TakeoffCommand
    Exec {
        /// Command file
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print JSON schemas for commands, configuration or job files
    Schema {
        #[arg(value_enum, default_value = "command")]
        kind: SchemaKind,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SchemaKind {
    Command,
    Config,
    Job,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).wrap_err("Failed to load configuration")?;

    match &cli.command {
        Commands::Normalize { input, class, output, geojson } => {
            let detections = select_detections(&config, &read_json(input)?, class, None, 0.0)?;
            info!("Normalized {} detections", detections.len());
            if *geojson {
                write_json(&detections_to_geojson(&detections), output.as_deref())?;
            } else {
                write_json(&detections, output.as_deref())?;
            }
        }
        Commands::Filter { input, region, threshold, output } => {
            let detections = select_detections(&config, &read_json(input)?, "object", Some(region), *threshold)?;
            info!("{} detections inside the region", detections.len());
            write_json(&detections, output.as_deref())?;
        }
        Commands::Siding { input, pixels_per_foot, output } => {
            let buildings: Vec<BuildingInput> = serde_json::from_value(read_json(input)?)?;
            let command = TakeoffCommand::SummarizeSiding {
                buildings,
                scale: AreaScale::new(*pixels_per_foot)?,
            };
            let result = TakeoffManager::from_config(&config).execute(command)?;
            write_json(&result, output.as_deref())?;
        }
        Commands::Render { image, detections, header, output_dir } => {
            render(&config, image, detections, header.as_deref(), output_dir).await?;
        }
        Commands::Run { job } => {
            let job = TakeoffJob::from_file(job).wrap_err_with(|| format!("Failed to load job {job:?}"))?;
            let report = run_job(&job, &config).await?;
            info!(
                "✅ {} buildings, {:.1} sf net siding",
                report.buildings, report.page.total_net_siding_sf
            );
            write_json(&report, None)?;
        }
        Commands::Exec { input, output } => {
            let command = tokio::fs::read_to_string(input).await?;
            let result = TakeoffManager::from_config(&config).execute_json(&command)?;
            write_json(&result, output.as_deref())?;
        }
        Commands::Schema { kind } => {
            match kind {
                SchemaKind::Command => write_json(&TakeoffCommand::schema(), None)?,
                SchemaKind::Config => write_json(&schemars::schema_for!(TakeoffConfig), None)?,
                SchemaKind::Job => write_json(&schemars::schema_for!(TakeoffJob), None)?,
            }
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {path:?}"))?;
    Ok(serde_json::from_str(&content)?)
}

async fn render(
    config: &TakeoffConfig,
    image: &Path,
    detections_path: &Path,
    header: Option<&str>,
    output_dir: &Path,
) -> Result<()> {
    let content = tokio::fs::read_to_string(detections_path).await?;
    let detections: Vec<Detection> = match detections_path.extension().and_then(|ext| ext.to_str()) {
        Some("geojson") => detections_from_geojson_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    let renderable: Vec<RenderableDetection> = detections.iter().map(RenderableDetection::from).collect();

    let renderer = MarkupRenderer::from_config(&config.renderer)?;
    let export = renderer
        .export(&ImageSource::Path(image.to_path_buf()), &renderable, header)
        .await
        .wrap_err_with(|| format!("Failed to render markup for {image:?}"))?;

    tokio::fs::create_dir_all(output_dir).await?;
    let path = export.save(output_dir).await?;
    info!("Saved {} ({})", path.display(), export.mime_type);
    Ok(())
}
