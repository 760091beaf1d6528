//! Conversion pipeline - source image to persisted walk frames and sheet
//!
//! Stage order per character: frame fit, palette quantization, outline,
//! walk cycle synthesis, sheet assembly, persistence. Fitting comes first so
//! the outline is drawn at frame resolution.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use rayon::prelude::*;

use crate::align::{align_direction_set, AlignmentReport};
use crate::error::{PipelineError, Result};
use crate::grid::{self, GridShape};
use crate::outline::outline;
use crate::output::{self, WrittenFiles};
use crate::palette::{self, Palette, PaletteName, PaletteReason, SampleOptions};
use crate::pose::{self, DirectionSet, FrameSize, GaitKind, DEFAULT_FRAMES_PER_DIRECTION};
use crate::sheet::{self, SpriteSheet};

/// Everything a conversion run can be tuned with.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub frame: FrameSize,
    pub frames_per_direction: usize,
    pub gait: GaitKind,
    /// Fixed palette; `None` auto-selects per character
    pub palette: Option<PaletteName>,
    pub sample: SampleOptions,
    pub grid: GridShape,
    pub allow_remainder: bool,
    /// Align baselines in memory before writing
    pub align: bool,
    pub pretty: bool,
    /// Preview upscale factor; 1 writes no preview
    pub preview_scale: u32,
    /// Worker threads for grid runs; 0 uses the global pool
    pub jobs: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            frame: FrameSize::default(),
            frames_per_direction: DEFAULT_FRAMES_PER_DIRECTION,
            gait: GaitKind::default(),
            palette: None,
            sample: SampleOptions::default(),
            grid: GridShape::default(),
            allow_remainder: false,
            align: false,
            pretty: true,
            preview_scale: 1,
            jobs: 0,
        }
    }
}

/// In-memory result of converting one character.
#[derive(Debug, Clone)]
pub struct Character {
    pub palette: PaletteName,
    /// Why the palette was chosen; `None` when it was fixed by the caller
    pub reason: Option<PaletteReason>,
    pub directions: DirectionSet,
    pub sheet: SpriteSheet,
    pub alignment: Option<AlignmentReport>,
}

/// Summary of one persisted character.
#[derive(Debug, Clone)]
pub struct CharacterReport {
    pub name: String,
    pub dir: PathBuf,
    pub palette: PaletteName,
    pub reason: Option<PaletteReason>,
    pub files: WrittenFiles,
    pub alignment: Option<AlignmentReport>,
}

/// Outcome of a grid run; one entry per tile in row-major order.
#[derive(Debug)]
pub struct GridReport {
    pub results: Vec<(String, Result<CharacterReport>)>,
}

impl GridReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &CharacterReport> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.results.iter().filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Decode `path` into RGBA.
pub fn load_source(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .map_err(|source| PipelineError::InputNotFound { path: path.to_path_buf(), source })?;
    Ok(image.to_rgba8())
}

fn choose_palette(
    tile: &RgbaImage,
    options: &PipelineOptions,
) -> (&'static Palette, Option<PaletteReason>) {
    match options.palette {
        Some(name) => (name.palette(), None),
        None => {
            let classification = palette::classify(tile, options.sample);
            (classification.palette, Some(classification.reason))
        }
    }
}

/// Run every in-memory stage over one character tile.
pub fn build_character(tile: &RgbaImage, options: &PipelineOptions) -> Result<Character> {
    // Classification looks at the whole tile, background included
    let (palette, reason) = choose_palette(tile, options);

    let fitted = pose::fit_to_frame(tile, options.frame);
    let quantized = palette::quantize(&fitted, palette);
    let base = outline(&quantized);

    let strategy = options.gait.strategy();
    let mut directions =
        pose::generate(&base, options.frame, options.frames_per_direction, strategy.as_ref());

    let alignment = if options.align {
        let (aligned, report) = align_direction_set(&directions);
        directions = aligned;
        Some(report)
    } else {
        None
    };

    let sheet = sheet::assemble(&directions)?;

    Ok(Character { palette: palette.name, reason, directions, sheet, alignment })
}

/// Convert an already decoded tile and persist it under `out_root/name/`.
pub fn convert_image(
    tile: &RgbaImage,
    out_root: &Path,
    name: &str,
    options: &PipelineOptions,
) -> Result<CharacterReport> {
    let run = || -> Result<CharacterReport> {
        let character = build_character(tile, options)?;
        let dir = out_root.join(name);
        let files = output::write_character(
            &dir,
            name,
            &character.directions,
            &character.sheet,
            options.pretty,
            options.preview_scale,
        )?;

        match character.reason {
            Some(reason) => tracing::info!(
                character = name,
                palette = %character.palette,
                %reason,
                frames = files.frames.len(),
                "converted"
            ),
            None => tracing::info!(
                character = name,
                palette = %character.palette,
                frames = files.frames.len(),
                "converted with fixed palette"
            ),
        }

        Ok(CharacterReport {
            name: name.to_string(),
            dir,
            palette: character.palette,
            reason: character.reason,
            files,
            alignment: character.alignment,
        })
    };

    run().map_err(|e| e.for_character(name))
}

/// Convert a single-character source image.
///
/// `name` defaults to the input file stem.
pub fn convert_character(
    input: &Path,
    out_root: &Path,
    name: Option<&str>,
    options: &PipelineOptions,
) -> Result<CharacterReport> {
    let source = load_source(input)?;
    let name = match name {
        Some(n) => n.to_string(),
        None => input
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.replace(' ', "-"))
            .unwrap_or_else(|| "character".to_string()),
    };
    convert_image(&source, out_root, &name, options)
}

/// Split a composite source into tiles and convert each one.
///
/// Loading and segmentation failures abort the run. Per-character failures
/// are collected in the report and never stop the other characters.
pub fn convert_grid(input: &Path, out_root: &Path, options: &PipelineOptions) -> Result<GridReport> {
    let source = load_source(input)?;
    let tiles = grid::segment(&source, options.grid, options.allow_remainder)?;
    tracing::info!(
        input = %input.display(),
        tiles = tiles.len(),
        "split {}x{} grid",
        options.grid.rows,
        options.grid.columns
    );

    let jobs: Vec<(String, &RgbaImage)> = tiles
        .iter()
        .enumerate()
        .map(|(i, tile)| (grid::character_name(input, i), &tile.image))
        .collect();

    let convert_all = || -> Vec<(String, Result<CharacterReport>)> {
        jobs.par_iter()
            .map(|(name, tile)| (name.clone(), convert_image(tile, out_root, name, options)))
            .collect()
    };

    let results = if options.jobs > 0 {
        match rayon::ThreadPoolBuilder::new().num_threads(options.jobs).build() {
            Ok(pool) => pool.install(convert_all),
            Err(e) => {
                tracing::warn!("cannot build {}-thread pool ({}), using the global pool", options.jobs, e);
                convert_all()
            }
        }
    } else {
        convert_all()
    };

    for (name, result) in &results {
        if let Err(e) = result {
            tracing::warn!(character = name.as_str(), "conversion failed: {}", e);
        }
    }

    Ok(GridReport { results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Direction;
    use image::Rgba;
    use tempfile::TempDir;

    fn blob(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if x >= w / 4 && x < w * 3 / 4 && y >= h / 8 && y < h * 7 / 8 {
                color
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_build_character_frame_sizes() {
        let options = PipelineOptions::default();
        let character = build_character(&blob(20, 20, Rgba([200, 120, 40, 255])), &options).unwrap();
        for (_, frames) in character.directions.iter() {
            assert_eq!(frames.len(), 4);
            for frame in frames {
                assert_eq!(frame.dimensions(), (32, 48));
            }
        }
        assert_eq!(character.sheet.image.dimensions(), (128, 192));
    }

    #[test]
    fn test_fixed_palette_has_no_reason() {
        let options = PipelineOptions { palette: Some(PaletteName::Tech), ..Default::default() };
        let character = build_character(&blob(16, 16, Rgba([10, 200, 30, 255])), &options).unwrap();
        assert_eq!(character.palette, PaletteName::Tech);
        assert!(character.reason.is_none());
    }

    #[test]
    fn test_auto_palette_reports_reason() {
        let character =
            build_character(&blob(16, 16, Rgba([200, 120, 40, 255])), &PipelineOptions::default())
                .unwrap();
        assert!(character.reason.is_some());
    }

    #[test]
    fn test_outline_is_present_in_frames() {
        let options = PipelineOptions { gait: GaitKind::Static, ..Default::default() };
        let character = build_character(&blob(16, 16, Rgba([250, 250, 250, 255])), &options).unwrap();
        let down = &character.directions.get(Direction::Down).unwrap()[0];
        assert!(down.pixels().any(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_right_mirrors_left() {
        let character =
            build_character(&blob(12, 20, Rgba([90, 60, 200, 255])), &PipelineOptions::default())
                .unwrap();
        let left = character.directions.get(Direction::Left).unwrap();
        let right = character.directions.get(Direction::Right).unwrap();
        for (l, r) in left.iter().zip(right) {
            assert_eq!(image::imageops::flip_horizontal(l), *r);
        }
    }

    #[test]
    fn test_convert_character_writes_outputs() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("hero one.png");
        blob(24, 24, Rgba([200, 90, 50, 255])).save(&input).unwrap();

        let out = temp.path().join("out");
        let report = convert_character(&input, &out, None, &PipelineOptions::default()).unwrap();
        assert_eq!(report.name, "hero-one");
        assert_eq!(report.files.frames.len(), 16);
        assert!(out.join("hero-one/down-walk-0.png").exists());
        assert!(out.join("hero-one/right-walk-3.png").exists());
        assert!(out.join("hero-one/hero-one-sheet.png").exists());
        assert!(out.join("hero-one/hero-one-sheet.json").exists());
        assert!(report.files.preview.is_none());
    }

    #[test]
    fn test_convert_character_missing_input() {
        let temp = TempDir::new().unwrap();
        let err = convert_character(
            &temp.path().join("missing.png"),
            temp.path(),
            None,
            &PipelineOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound { .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_convert_grid_row_major_names() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("party.png");
        RgbaImage::from_fn(96, 64, |x, y| {
            let cell = (y / 32) * 3 + x / 32;
            Rgba([(cell * 40) as u8, 100, 150, 255])
        })
        .save(&input)
        .unwrap();

        let out = temp.path().join("out");
        let options = PipelineOptions { jobs: 2, ..Default::default() };
        let report = convert_grid(&input, &out, &options).unwrap();
        let names: Vec<&str> = report.results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            ["party-char1", "party-char2", "party-char3", "party-char4", "party-char5", "party-char6"]
        );
        assert!(report.all_succeeded());
        assert_eq!(report.succeeded().count(), 6);
        assert!(out.join("party-char6/party-char6-sheet.json").exists());
    }

    #[test]
    fn test_convert_grid_bad_geometry() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("odd.png");
        RgbaImage::new(97, 64).save(&input).unwrap();
        let err = convert_grid(&input, temp.path(), &PipelineOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidGridGeometry { .. }));
    }

    #[test]
    fn test_convert_grid_isolates_failures() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("pair.png");
        RgbaImage::from_pixel(64, 32, Rgba([120, 40, 30, 255])).save(&input).unwrap();

        let out = temp.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        // A plain file where the second character's directory should go
        std::fs::write(out.join("pair-char2"), b"occupied").unwrap();

        let options = PipelineOptions { grid: GridShape::new(1, 2), ..Default::default() };
        let report = convert_grid(&input, &out, &options).unwrap();
        assert!(!report.all_succeeded());
        assert!(report.results[0].1.is_ok());
        let failed: Vec<&str> = report.failed().map(|(n, _)| n).collect();
        assert_eq!(failed, ["pair-char2"]);
        assert!(out.join("pair-char1/pair-char1-sheet.png").exists());
    }

    #[test]
    fn test_align_option_produces_report() {
        let options = PipelineOptions { align: true, ..Default::default() };
        let character = build_character(&blob(16, 16, Rgba([80, 80, 200, 255])), &options).unwrap();
        let report = character.alignment.unwrap();
        assert_eq!(report.shifted_frames(), 0);
    }
}
