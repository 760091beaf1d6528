//! Pixelwalk - Library for turning character portraits into walk-cycle sprites
//!
//! This library provides functionality to:
//! - Split composite grid images into per-character tiles
//! - Quantize characters to a small set of canonical palettes
//! - Outline, pose and animate a base pose into four walking directions
//! - Assemble sprite sheets with slicing metadata
//! - Correct baseline drift in persisted frames

pub mod align;
pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub mod outline;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod pose;
pub mod sheet;

pub use error::{PipelineError, Result};
