//! Configuration schema types for `pxw.toml`
//!
//! Every section is optional; missing values fall back to 32x48 frames,
//! 4 frames per direction and 2x3 grids.

use serde::{Deserialize, Serialize};

use crate::grid::GridShape;
use crate::palette::{PaletteName, SampleOptions, DEFAULT_DOMINANT_COLORS, DEFAULT_SAMPLE_SIZE};
use crate::pose::{FrameSize, GaitKind, DEFAULT_FRAMES_PER_DIRECTION};

/// Frame geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_frame_width")]
    pub width: u32,
    #[serde(default = "default_frame_height")]
    pub height: u32,
    #[serde(default = "default_frames_per_direction")]
    pub frames_per_direction: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: default_frame_width(),
            height: default_frame_height(),
            frames_per_direction: default_frames_per_direction(),
        }
    }
}

impl FrameConfig {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

fn default_frame_width() -> u32 {
    FrameSize::default().width
}

fn default_frame_height() -> u32 {
    FrameSize::default().height
}

fn default_frames_per_direction() -> usize {
    DEFAULT_FRAMES_PER_DIRECTION
}

/// Composite grid layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Discard right/bottom remainder pixels instead of failing
    #[serde(default)]
    pub allow_remainder: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { rows: default_rows(), columns: default_columns(), allow_remainder: false }
    }
}

impl GridConfig {
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.rows, self.columns)
    }
}

fn default_rows() -> u32 {
    GridShape::default().rows
}

fn default_columns() -> u32 {
    GridShape::default().columns
}

/// Palette selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Fixed palette name; absent means auto-select per character.
    /// Kept as a string so a bad name surfaces as a validation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,
    #[serde(default = "default_dominant_colors")]
    pub dominant_colors: usize,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            name: None,
            sample_size: default_sample_size(),
            dominant_colors: default_dominant_colors(),
        }
    }
}

impl PaletteConfig {
    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions { sample_size: self.sample_size, dominant_colors: self.dominant_colors }
    }
}

fn default_sample_size() -> u32 {
    DEFAULT_SAMPLE_SIZE
}

fn default_dominant_colors() -> usize {
    DEFAULT_DOMINANT_COLORS
}

/// Walk cycle synthesis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkConfig {
    #[serde(default)]
    pub gait: GaitKind,
    /// Align baselines in memory before writing
    #[serde(default)]
    pub align: bool,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print JSON sidecars
    #[serde(default = "default_true")]
    pub pretty: bool,
    /// Integer scale for an extra `{character}-preview.png`; 1 disables it
    #[serde(default = "default_preview_scale")]
    pub preview_scale: u32,
    /// Worker threads for grid runs; 0 uses available parallelism
    #[serde(default)]
    pub jobs: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true, preview_scale: default_preview_scale(), jobs: 0 }
    }
}

fn default_true() -> bool {
    true
}

fn default_preview_scale() -> u32 {
    1
}

/// Complete `pxw.toml` configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PxwConfig {
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "frame.width")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pxw.toml: '{}' {}", self.field, self.message)
    }
}

impl PxwConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut positive = |field: &str, value: u64| {
            if value == 0 {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be a positive integer".to_string(),
                });
            }
        };

        positive("frame.width", self.frame.width as u64);
        positive("frame.height", self.frame.height as u64);
        positive("frame.frames_per_direction", self.frame.frames_per_direction as u64);
        positive("grid.rows", self.grid.rows as u64);
        positive("grid.columns", self.grid.columns as u64);
        positive("palette.sample_size", self.palette.sample_size as u64);
        positive("palette.dominant_colors", self.palette.dominant_colors as u64);
        positive("output.preview_scale", self.output.preview_scale as u64);

        if let Some(name) = &self.palette.name {
            if name.parse::<PaletteName>().is_err() {
                errors.push(ConfigValidationError {
                    field: "palette.name".to_string(),
                    message: format!(
                        "unknown palette '{}' (expected one of: {})",
                        name,
                        PaletteName::ALL.map(PaletteName::as_str).join(", ")
                    ),
                });
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
