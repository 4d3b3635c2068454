use serde::{Deserialize, Serialize};
use serde_json::Value;
use schemars::JsonSchema;
use strum::{Display, IntoStaticStr, VariantNames};

use crate::{
    algorithms::{assign_openings, openings_from_detections, summarize_page, Normalizer, RegionFilter},
    config::TakeoffConfig,
    detector::RawPrediction,
    error::Result,
    types::{AreaScale, Detection, Opening, PageSidingSummary, Polygon, Region, SidingPolygon},
};

/// One building facade with openings already attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BuildingInput {
    pub exterior: Polygon,
    #[serde(default)]
    pub openings: Vec<Opening>,
    #[serde(default)]
    pub building_sf: Option<f64>,
    #[serde(default)]
    pub roof_sf: Option<f64>,
}

fn default_opening_classes() -> Vec<String> {
    vec!["window".to_string(), "door".to_string(), "garage_door".to_string()]
}

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TakeoffCommand {
    /// Normalize center-box predictions
    NormalizePredictions { predictions: Vec<RawPrediction> },

    /// Normalize any detector JSON, sniffing its shape
    NormalizeOutput {
        output: Value,
        #[schemars(length(min = 1, max = 64))]
        class: String,
    },

    /// Select predictions inside a user-drawn region
    FilterRegion {
        predictions: Vec<RawPrediction>,
        region: Region,
        #[schemars(range(min = 0.0, max = 1.0))]
        confidence_threshold: f64,
    },

    /// Net siding area for buildings whose openings are already assigned
    SummarizeSiding {
        buildings: Vec<BuildingInput>,
        #[serde(default)]
        scale: AreaScale,
    },

    /// Assign opening detections to exteriors, then summarize the page
    SummarizePage {
        exteriors: Vec<Polygon>,
        detections: Vec<Detection>,
        #[serde(default = "default_opening_classes")]
        opening_classes: Vec<String>,
        #[serde(default)]
        scale: AreaScale,
    },
}

impl TakeoffCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TakeoffCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NormalizePredictions { .. } => "Normalize center-box detector predictions into canonical detections",
            Self::NormalizeOutput { .. } => "Normalize detector JSON of any supported shape into canonical detections",
            Self::FilterRegion { .. } => "Keep predictions above a confidence threshold whose center lies in a region",
            Self::SummarizeSiding { .. } => "Compute gross, opening and net siding area per building",
            Self::SummarizePage { .. } => "Attribute openings to buildings by containment and summarize the page",
        }
    }
}

/// Result of executing a [`TakeoffCommand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum CommandOutput {
    Detections(Vec<Detection>),
    Siding {
        buildings: Vec<SidingPolygon>,
        page: PageSidingSummary,
        /// Openings no exterior contained
        #[serde(default)]
        unassigned: Vec<Opening>,
    },
}

/// Runs commands against a normalizer and region filter built from one config.
pub struct TakeoffManager {
    normalizer: Normalizer,
    region_filter: RegionFilter,
}

impl TakeoffManager {
    pub fn new() -> Self {
        Self::from_config(&TakeoffConfig::default())
    }

    pub fn from_config(config: &TakeoffConfig) -> Self {
        Self {
            normalizer: Normalizer::new(config.normalizer.clone()),
            region_filter: RegionFilter::new(config.region.clone()),
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Parse a JSON command and execute it
    pub fn execute_json(&self, command: &str) -> Result<CommandOutput> {
        let command: TakeoffCommand = serde_json::from_str(command)?;
        self.execute(command)
    }

    pub fn execute(&self, command: TakeoffCommand) -> Result<CommandOutput> {
        tracing::debug!(command = %command, "executing takeoff command");

        match command {
            TakeoffCommand::NormalizePredictions { predictions } => {
                Ok(CommandOutput::Detections(self.normalizer.normalize_predictions(&predictions)))
            }
            TakeoffCommand::NormalizeOutput { output, class } => {
                Ok(CommandOutput::Detections(self.normalizer.normalize_json(&output, &class)))
            }
            TakeoffCommand::FilterRegion { predictions, region, confidence_threshold } => {
                let detections = self.region_filter.filter(&predictions, &region, confidence_threshold)?;
                Ok(CommandOutput::Detections(detections))
            }
            TakeoffCommand::SummarizeSiding { buildings, scale } => {
                let buildings = buildings
                    .into_iter()
                    .map(|input| {
                        let mut building = SidingPolygon::build(input.exterior, input.openings, scale)?;
                        building.summary = building.summary.with_footprint(input.building_sf, input.roof_sf);
                        Ok(building)
                    })
                    .collect::<Result<Vec<SidingPolygon>>>()?;
                Ok(siding_output(buildings, Vec::new()))
            }
            TakeoffCommand::SummarizePage { exteriors, detections, opening_classes, scale } => {
                scale.validate()?;
                let classes: Vec<&str> = opening_classes.iter().map(String::as_str).collect();
                let openings = openings_from_detections(&detections, &classes);
                let assignment = assign_openings(&exteriors, openings);

                let buildings = exteriors
                    .into_iter()
                    .zip(assignment.per_building)
                    .map(|(exterior, openings)| SidingPolygon::build(exterior, openings, scale))
                    .collect::<Result<Vec<SidingPolygon>>>()?;
                Ok(siding_output(buildings, assignment.unassigned))
            }
        }
    }
}

fn siding_output(buildings: Vec<SidingPolygon>, unassigned: Vec<Opening>) -> CommandOutput {
    let page = summarize_page(&buildings);
    if !unassigned.is_empty() {
        tracing::warn!(count = unassigned.len(), "openings outside every building exterior");
    }
    CommandOutput::Siding { buildings, page, unassigned }
}

impl Default for TakeoffManager {
    fn default() -> Self {
        Self::new()
    }
}
