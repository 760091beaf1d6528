//! Configuration loading and discovery for `pxw.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::PxwConfig;
use crate::grid::GridShape;
use crate::palette::PaletteName;
use crate::pipeline::PipelineOptions;
use crate::pose::GaitKind;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up in the working tree
pub const CONFIG_FILE_NAME: &str = "pxw.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse pxw.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override palette (disables auto-selection)
    pub palette: Option<PaletteName>,
    /// Override frames per direction
    pub frames: Option<usize>,
    /// Override gait strategy
    pub gait: Option<GaitKind>,
    /// Override grid rows
    pub rows: Option<u32>,
    /// Override grid columns
    pub columns: Option<u32>,
    /// Allow grid remainder pixels
    pub allow_remainder: Option<bool>,
    /// Align baselines before writing
    pub align: Option<bool>,
    /// Preview upscale factor
    pub preview_scale: Option<u32>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// Nearest `pxw.toml` in the working tree, else the user config directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(|cwd| find_config_from(&cwd)).or_else(find_xdg_config)
}

/// `$XDG_CONFIG_HOME/pixelwalk/pxw.toml`, with `~/.config` standing in for an
/// unset `XDG_CONFIG_HOME`.
pub fn find_xdg_config() -> Option<PathBuf> {
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("pixelwalk").join(CONFIG_FILE_NAME)).filter(|path| path.is_file())
}

pub fn find_config_from(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|path| path.is_file())
}

/// Load configuration from a pxw.toml file.
///
/// An explicit path is read as given; otherwise [`find_config`] locates one
/// and a missing file means defaults.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("sprites/pxw.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<PxwConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading config");
            load_config_file(&p)
        }
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<PxwConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: PxwConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no pxw.toml is found.
pub fn default_config() -> PxwConfig {
    PxwConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut PxwConfig, overrides: &CliOverrides) {
    if let Some(palette) = overrides.palette {
        config.palette.name = Some(palette.as_str().to_string());
    }
    if let Some(frames) = overrides.frames {
        config.frame.frames_per_direction = frames;
    }
    if let Some(gait) = overrides.gait {
        config.walk.gait = gait;
    }
    if let Some(rows) = overrides.rows {
        config.grid.rows = rows;
    }
    if let Some(columns) = overrides.columns {
        config.grid.columns = columns;
    }
    if let Some(allow_remainder) = overrides.allow_remainder {
        config.grid.allow_remainder = allow_remainder;
    }
    if let Some(align) = overrides.align {
        config.walk.align = align;
    }
    if let Some(scale) = overrides.preview_scale {
        config.output.preview_scale = scale;
    }
    if let Some(jobs) = overrides.jobs {
        config.output.jobs = jobs;
    }
}

/// Turn a validated configuration into pipeline options.
///
/// Fails with the validation messages when overrides left the config
/// invalid.
pub fn pipeline_options(config: &PxwConfig) -> Result<PipelineOptions, ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    let palette = match &config.palette.name {
        Some(name) => Some(
            name.parse::<PaletteName>()
                .map_err(|e| ConfigError::Validation(vec![e.to_string()]))?,
        ),
        None => None,
    };

    Ok(PipelineOptions {
        frame: config.frame.size(),
        frames_per_direction: config.frame.frames_per_direction,
        gait: config.walk.gait,
        palette,
        sample: config.palette.sample_options(),
        grid: GridShape::new(config.grid.rows, config.grid.columns),
        allow_remainder: config.grid.allow_remainder,
        align: config.walk.align,
        pretty: config.output.pretty,
        preview_scale: config.output.preview_scale,
        jobs: config.output.jobs,
    })
}
