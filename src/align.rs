//! Baseline alignment - moves frames down so a direction's feet share one row.
//!
//! For each direction the lowest content row of every frame is measured; the
//! bottom-most one becomes the baseline and every other frame is shifted down
//! to meet it. Frames with no content are left alone and reported.
//!
//! The on-disk pass locks the character directory, rewrites only the frames
//! that moved, then regenerates the sheet from the corrected set. Running it
//! again is a no-op.

use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::output::{self, DirLock};
use crate::pose::{Direction, DirectionSet, TRANSPARENT};
use crate::sheet::assemble;

/// How a pixel is recognised as content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// Any nonzero alpha
    Alpha,
    /// Any non-black pixel; for frames stored without an alpha channel
    NonBlack,
}

impl ContentRule {
    pub fn for_frame(has_alpha: bool) -> Self {
        if has_alpha {
            ContentRule::Alpha
        } else {
            ContentRule::NonBlack
        }
    }

    fn is_content(self, pixel: &Rgba<u8>) -> bool {
        match self {
            ContentRule::Alpha => pixel[3] > 0,
            ContentRule::NonBlack => pixel[0] != 0 || pixel[1] != 0 || pixel[2] != 0,
        }
    }

    /// Background used for rows vacated by a shift.
    fn fill(self) -> Rgba<u8> {
        match self {
            ContentRule::Alpha => TRANSPARENT,
            ContentRule::NonBlack => Rgba([0, 0, 0, 255]),
        }
    }
}

/// Bottom-most row holding content, scanning upward and stopping at the
/// first hit. `None` for a frame with no content at all.
pub fn lowest_opaque_row(image: &RgbaImage, rule: ContentRule) -> Option<u32> {
    let (w, h) = image.dimensions();
    (0..h).rev().find(|&y| (0..w).any(|x| rule.is_content(image.get_pixel(x, y))))
}

/// Copy of `image` moved down by `rows`, on a fresh canvas of the same size.
/// Content pushed past the bottom edge is lost.
pub fn shift_down(image: &RgbaImage, rows: u32, fill: Rgba<u8>) -> RgbaImage {
    let (w, h) = image.dimensions();
    let mut result = RgbaImage::from_pixel(w, h, fill);
    for y in 0..h.saturating_sub(rows) {
        for x in 0..w {
            result.put_pixel(x, y + rows, *image.get_pixel(x, y));
        }
    }
    result
}

/// Measurements and result of aligning one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedDirection {
    pub frames: Vec<RgbaImage>,
    pub lowest_rows: Vec<Option<u32>>,
    /// Common row after alignment; `None` when every frame is empty
    pub baseline: Option<u32>,
    /// Rows each frame was moved down
    pub shifts: Vec<u32>,
}

impl AlignedDirection {
    pub fn is_noop(&self) -> bool {
        self.shifts.iter().all(|&s| s == 0)
    }

    /// Indices of frames that had no content.
    pub fn empty_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.lowest_rows.iter().enumerate().filter(|(_, r)| r.is_none()).map(|(i, _)| i)
    }
}

fn align_with_rules(frames: &[RgbaImage], rules: &[ContentRule]) -> AlignedDirection {
    let lowest_rows: Vec<Option<u32>> =
        frames.iter().zip(rules).map(|(f, &rule)| lowest_opaque_row(f, rule)).collect();
    let baseline = lowest_rows.iter().flatten().copied().max();

    let mut aligned = Vec::with_capacity(frames.len());
    let mut shifts = Vec::with_capacity(frames.len());
    for ((frame, lowest), rule) in frames.iter().zip(&lowest_rows).zip(rules) {
        let shift = match (lowest, baseline) {
            (Some(row), Some(base)) => base - row,
            _ => 0,
        };
        aligned.push(if shift == 0 { frame.clone() } else { shift_down(frame, shift, rule.fill()) });
        shifts.push(shift);
    }

    AlignedDirection { frames: aligned, lowest_rows, baseline, shifts }
}

/// Align one direction's frames (alpha-bearing) to a common baseline.
pub fn align_frames(frames: &[RgbaImage]) -> AlignedDirection {
    align_with_rules(frames, &vec![ContentRule::Alpha; frames.len()])
}

/// A frame with no content; most likely an upstream defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentWarning {
    pub direction: Direction,
    pub index: usize,
    pub path: Option<PathBuf>,
}

impl std::fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} frame {} has no opaque pixels", self.direction, self.index)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        Ok(())
    }
}

/// Outcome of aligning a whole character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentReport {
    pub character: String,
    pub baselines: BTreeMap<Direction, u32>,
    /// Rows moved per frame, per direction
    pub shifts: BTreeMap<Direction, Vec<u32>>,
    pub warnings: Vec<AlignmentWarning>,
    /// Files rewritten (empty on a dry run or when nothing moved)
    pub rewritten: Vec<PathBuf>,
}

impl AlignmentReport {
    pub fn shifted_frames(&self) -> usize {
        self.shifts.values().flatten().filter(|&&s| s > 0).count()
    }

    pub fn is_noop(&self) -> bool {
        self.shifted_frames() == 0
    }

    fn record(&mut self, direction: Direction, aligned: &AlignedDirection, paths: Option<&[PathBuf]>) {
        if let Some(baseline) = aligned.baseline {
            self.baselines.insert(direction, baseline);
        }
        self.shifts.insert(direction, aligned.shifts.clone());
        for index in aligned.empty_frames() {
            let warning = AlignmentWarning {
                direction,
                index,
                path: paths.and_then(|p| p.get(index)).cloned(),
            };
            tracing::warn!(character = %self.character, "alignment scan empty: {}", warning);
            self.warnings.push(warning);
        }
    }
}

/// Align every direction of an in-memory set.
pub fn align_direction_set(set: &DirectionSet) -> (DirectionSet, AlignmentReport) {
    let mut corrected = DirectionSet::new();
    let mut report = AlignmentReport::default();
    for (direction, frames) in set.iter() {
        let aligned = align_frames(frames);
        report.record(direction, &aligned, None);
        corrected.insert(direction, aligned.frames);
    }
    (corrected, report)
}

/// Options for the on-disk correction pass.
#[derive(Debug, Clone, Copy)]
pub struct AlignOptions {
    /// Measure and report without writing anything
    pub dry_run: bool,
    /// Pretty-print the regenerated JSON sidecar
    pub pretty: bool,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self { dry_run: false, pretty: true }
    }
}

/// Run the correction pass over one character directory.
///
/// The directory name is the character name. The directory is locked for
/// the duration of the pass.
pub fn correct_character_dir(dir: &Path, options: AlignOptions) -> Result<AlignmentReport> {
    let character = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "character".to_string());

    correct_locked(dir, &character, options).map_err(|e| e.for_character(&character))
}

fn correct_locked(dir: &Path, character: &str, options: AlignOptions) -> Result<AlignmentReport> {
    let _lock = DirLock::acquire(dir)?;

    let mut report = AlignmentReport { character: character.to_string(), ..Default::default() };
    let mut corrected = DirectionSet::new();
    // (frame, path, shift, has_alpha)
    let mut pending: Vec<(RgbaImage, PathBuf, u32, bool)> = Vec::new();

    for direction in Direction::ALL {
        let loaded = output::load_frames(dir, direction)?;
        if loaded.is_empty() {
            tracing::debug!(%direction, "no frames on disk");
            continue;
        }

        let images: Vec<RgbaImage> = loaded.iter().map(|f| f.image.clone()).collect();
        let rules: Vec<ContentRule> =
            loaded.iter().map(|f| ContentRule::for_frame(f.has_alpha)).collect();
        let alpha: Vec<bool> = loaded.iter().map(|f| f.has_alpha).collect();
        let paths: Vec<PathBuf> = loaded.into_iter().map(|f| f.path).collect();

        let aligned = align_with_rules(&images, &rules);
        tracing::debug!(
            %direction,
            lowest = ?aligned.lowest_rows,
            baseline = ?aligned.baseline,
            "measured frames"
        );
        report.record(direction, &aligned, Some(paths.as_slice()));

        let shifted = aligned.frames.iter().zip(paths).zip(&aligned.shifts).zip(alpha);
        for (((frame, path), &shift), has_alpha) in shifted {
            if shift > 0 {
                pending.push((frame.clone(), path, shift, has_alpha));
            }
        }
        corrected.insert(direction, aligned.frames);
    }

    if options.dry_run {
        return Ok(report);
    }

    // Validate the corrected set before touching any file
    let sheet = assemble(&corrected)?;

    for (frame, path, shift, has_alpha) in pending {
        // Keep the color type so the next pass measures with the same rule
        output::save_frame(&frame, &path, has_alpha)?;
        tracing::info!("shifted {} down by {}px", path.display(), shift);
        report.rewritten.push(path);
    }

    let sheet_path = output::sheet_path(dir, character);

    let preview = output::preview_path(dir, character);
    let preview_scale = match image::image_dimensions(&preview) {
        Ok((w, _)) if sheet.image.width() > 0 => w / sheet.image.width(),
        _ => 0,
    };

    output::save_png(&sheet.image, &sheet_path)?;
    output::write_metadata(&sheet.metadata, &output::metadata_path(dir, character), options.pretty)?;
    if preview_scale > 1 {
        output::save_png(&output::scale_image(&sheet.image, preview_scale), &preview)?;
    }

    tracing::info!(
        character,
        shifted = report.shifted_frames(),
        warnings = report.warnings.len(),
        "regenerated {}",
        sheet_path.display()
    );
    Ok(report)
}

/// Run the correction pass over every character directory below `root`.
///
/// Directories are processed independently; one failure doesn't stop the rest.
pub fn correct_all(root: &Path, options: AlignOptions) -> Result<Vec<(PathBuf, Result<AlignmentReport>)>> {
    let dirs = output::find_character_dirs(root)?;
    if dirs.is_empty() {
        tracing::warn!("no character directories found under {}", root.display());
    }

    let results = dirs
        .into_iter()
        .map(|dir| {
            let result = correct_character_dir(&dir, options);
            if let Err(e) = &result {
                tracing::error!("{}", e);
            }
            (dir, result)
        })
        .collect();
    Ok(results)
}

/// Error for a directory that has no frames at all.
pub fn ensure_has_frames(dir: &Path) -> Result<()> {
    let any = Direction::ALL
        .iter()
        .map(|&d| output::load_frames(dir, d).map(|f| !f.is_empty()))
        .collect::<Result<Vec<bool>>>()?
        .into_iter()
        .any(|b| b);
    if any {
        Ok(())
    } else {
        Err(PipelineError::DirectionSetIncomplete {
            reason: format!("no walk frames found in '{}'", dir.display()),
        })
    }
}
