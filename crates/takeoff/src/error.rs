use thiserror::Error;

#[derive(Error, Debug)]
pub enum TakeoffError {
    #[error("Region {width}x{height} is smaller than the {min_width}x{min_height} minimum")]
    RegionTooSmall {
        width: f64,
        height: f64,
        min_width: f64,
        min_height: f64,
    },

    #[error("Confidence threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("Scale must be a positive, finite pixels-per-foot value, got {0}")]
    InvalidScale(f64),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Failed to decode mask: {0}")]
    MaskDecode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

pub type Result<T> = std::result::Result<T, TakeoffError>;
