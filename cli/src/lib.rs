use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use takeoff::{
    AreaScale, Detection, DetectorOutput, ImageSource, MarkupRenderer, Normalizer,
    PageSidingSummary, Polygon, Region, RegionFilter, RenderableDetection, SidingPolygon,
    TakeoffConfig, TakeoffError, assign_openings, detections_to_geojson,
    openings_from_detections, siding_to_geojson, summarize_page,
};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Takeoff(#[from] TakeoffError),
    #[error("Region must be given as x,y,width,height, got '{0}'")]
    InvalidRegion(String),
    #[error("Region selection needs center-box predictions")]
    RegionNeedsPredictions,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Parse a region written as `x,y,width,height`
pub fn parse_region(value: &str) -> Result<Region, CliError> {
    let numbers: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| CliError::InvalidRegion(value.to_string()))?;

    match numbers.as_slice() {
        [x, y, width, height] => Ok(Region::new(*x, *y, *width, *height)),
        _ => Err(CliError::InvalidRegion(value.to_string())),
    }
}

fn default_class() -> String {
    "object".to_string()
}

fn default_threshold() -> f64 {
    0.3
}

fn default_exterior_classes() -> Vec<String> {
    vec!["siding".to_string(), "exterior_wall".to_string(), "building".to_string()]
}

fn default_opening_classes() -> Vec<String> {
    vec!["window".to_string(), "door".to_string(), "garage_door".to_string()]
}

/// One elevation page to take off: detector output plus the photo it came from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TakeoffJob {
    /// Raw detector JSON
    pub detections: PathBuf,
    /// Base photo for the markup; no markup is rendered without it
    #[serde(default)]
    pub image: Option<PathBuf>,
    /// Label for segmentation output, which carries no class of its own
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default)]
    pub header: Option<String>,
    /// Restrict the page to a user-drawn selection
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub scale: AreaScale,
    #[serde(default = "default_exterior_classes")]
    pub exterior_classes: Vec<String>,
    #[serde(default = "default_opening_classes")]
    pub opening_classes: Vec<String>,
    pub output_dir: PathBuf,
}

impl TakeoffJob {
    /// Load a job from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a job from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load the job
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JobReport {
    pub detections: usize,
    pub buildings: usize,
    pub unassigned_openings: usize,
    pub page: PageSidingSummary,
    pub markup: Option<PathBuf>,
}

/// Load a `TakeoffConfig`, or the defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<TakeoffConfig, CliError> {
    match path {
        Some(path) => Ok(TakeoffConfig::from_path(path)?),
        None => Ok(TakeoffConfig::default()),
    }
}

/// Canonical detections from raw detector JSON, restricted to `region` when given.
pub fn select_detections(
    config: &TakeoffConfig,
    output: &Value,
    class: &str,
    region: Option<&Region>,
    confidence_threshold: f64,
) -> Result<Vec<Detection>, CliError> {
    match region {
        Some(region) => {
            let DetectorOutput::CenterBox(response) = DetectorOutput::from_json(output) else {
                return Err(CliError::RegionNeedsPredictions);
            };
            let filter = RegionFilter::new(config.region.clone());
            Ok(filter.filter(&response.predictions, region, confidence_threshold)?)
        }
        None => Ok(Normalizer::new(config.normalizer.clone())
            .normalize_json(output, class)
            .into_iter()
            .filter(|detection| detection.confidence >= confidence_threshold)
            .collect()),
    }
}

fn outlines(detections: &[Detection], classes: &[String]) -> Vec<Polygon> {
    detections
        .iter()
        .filter(|detection| classes.contains(&detection.class))
        .map(Detection::outline)
        .collect()
}

/// Write `value` as pretty JSON to `path`, or to stdout without one
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Normalize, select, measure and render one page, writing every artifact to
/// the job's output directory.
pub async fn run_job(job: &TakeoffJob, config: &TakeoffConfig) -> Result<JobReport, CliError> {
    job.scale.validate()?;
    let raw = tokio::fs::read_to_string(&job.detections).await?;
    let output: Value = serde_json::from_str(&raw)?;

    let detections = select_detections(
        config,
        &output,
        &job.class,
        job.region.as_ref(),
        job.confidence_threshold,
    )?;
    tracing::info!(count = detections.len(), "selected detections");

    let exteriors = outlines(&detections, &job.exterior_classes);
    let opening_classes: Vec<&str> = job.opening_classes.iter().map(String::as_str).collect();
    let assignment = assign_openings(&exteriors, openings_from_detections(&detections, &opening_classes));
    if !assignment.unassigned.is_empty() {
        tracing::warn!(count = assignment.unassigned.len(), "openings outside every building exterior");
    }

    let buildings: Vec<SidingPolygon> = exteriors
        .into_iter()
        .zip(assignment.per_building)
        .map(|(exterior, openings)| SidingPolygon::build(exterior, openings, job.scale))
        .collect::<takeoff::Result<_>>()?;
    let page = summarize_page(&buildings);

    tokio::fs::create_dir_all(&job.output_dir).await?;
    write_json(&detections, Some(&job.output_dir.join("detections.json")))?;
    write_json(&detections_to_geojson(&detections), Some(&job.output_dir.join("detections.geojson")))?;
    write_json(&siding_to_geojson(&buildings), Some(&job.output_dir.join("siding.geojson")))?;
    write_json(&page, Some(&job.output_dir.join("summary.json")))?;

    let markup = match &job.image {
        Some(image) => {
            let renderer = MarkupRenderer::from_config(&config.renderer)?;
            let renderable: Vec<RenderableDetection> = detections.iter().map(RenderableDetection::from).collect();
            let export = renderer
                .export(&ImageSource::Path(image.clone()), &renderable, job.header.as_deref())
                .await?;
            let path = export.save(&job.output_dir).await?;
            tracing::info!(path = %path.display(), "saved markup");
            Some(path)
        }
        None => None,
    };

    Ok(JobReport {
        detections: detections.len(),
        buildings: buildings.len(),
        unassigned_openings: assignment.unassigned.len(),
        page,
        markup,
    })
}
