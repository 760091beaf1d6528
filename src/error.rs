//! Error types for the sprite conversion pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the pipeline.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Errors raised by pipeline stages and the persistence layer.
///
/// All of these are deterministic input or configuration problems; nothing
/// in the pipeline retries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Source bitmap is missing or cannot be decoded
    #[error("Cannot read input image '{}': {source}", path.display())]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Source dimensions don't fit the configured grid
    #[error("Image {width}x{height} cannot be split into a {rows}x{columns} grid: {reason}")]
    InvalidGridGeometry { width: u32, height: u32, rows: u32, columns: u32, reason: String },

    /// Palette name is not one of the canonical palettes
    #[error("Unknown palette '{name}' (expected one of: warm, cool, tech, rainbow, shiba)")]
    UnknownPalette { name: String },

    /// Sheet assembly precondition failed
    #[error("Direction set is incomplete: {reason}")]
    DirectionSetIncomplete { reason: String },

    /// Another alignment pass holds the character directory
    #[error("Directory '{}' is locked by another alignment pass", path.display())]
    DirectoryLocked { path: PathBuf },

    /// Failure while processing a named character
    #[error("Character '{name}': {source}")]
    Character {
        name: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Attach a character name to this error.
    pub fn for_character(self, name: &str) -> Self {
        match self {
            already @ PipelineError::Character { .. } => already,
            other => PipelineError::Character { name: name.to_string(), source: Box::new(other) },
        }
    }

    /// Whether this error stems from bad user input rather than a processing failure.
    pub fn is_input_error(&self) -> bool {
        match self {
            PipelineError::InputNotFound { .. } | PipelineError::UnknownPalette { .. } => true,
            PipelineError::Character { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}
