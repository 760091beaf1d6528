//! Persistence: file naming, atomic PNG/JSON writes, frame loading, and the
//! per-directory lock used by alignment passes.

use fs2::FileExt;
use image::imageops::FilterType;
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::pose::{Direction, DirectionSet};
use crate::sheet::{SheetMetadata, SpriteSheet};

/// Name of the lock file an alignment pass holds in a character directory.
pub const LOCK_FILE_NAME: &str = ".pxw-align.lock";

/// `{direction}-walk-{index}.png`
pub fn frame_file_name(direction: Direction, index: usize) -> String {
    format!("{}-walk-{}.png", direction, index)
}

/// `{dir}/{character}-sheet.png`
pub fn sheet_path(dir: &Path, character: &str) -> PathBuf {
    dir.join(format!("{}-sheet.png", character))
}

/// JSON sidecar next to a sheet: same basename, `.json` extension.
pub fn metadata_path(dir: &Path, character: &str) -> PathBuf {
    sheet_path(dir, character).with_extension("json")
}

/// `{dir}/{character}-preview.png`
pub fn preview_path(dir: &Path, character: &str) -> PathBuf {
    dir.join(format!("{}-preview.png", character))
}

/// Temporary sibling used while writing `path`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `path` through a temporary sibling so readers never see a partial file.
fn write_atomic(path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);
    write(&tmp)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Save an RGBA image as PNG, replacing `path` only once the new file is
/// completely written.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    write_atomic(path, |tmp| Ok(image.save_with_format(tmp, ImageFormat::Png)?))
}

/// Save a frame as PNG in its original color type.
///
/// Frames without alpha are written as RGB so a later load still sees an
/// alpha-less image.
pub fn save_frame(image: &RgbaImage, path: &Path, has_alpha: bool) -> Result<()> {
    if has_alpha {
        return save_png(image, path);
    }
    let rgb = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Rgb([p[0], p[1], p[2]])
    });
    write_atomic(path, |tmp| Ok(rgb.save_with_format(tmp, ImageFormat::Png)?))
}

/// Write sheet metadata as JSON, atomically like [`save_png`].
pub fn write_metadata(metadata: &SheetMetadata, path: &Path, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(metadata)?
    } else {
        serde_json::to_string(metadata)?
    };

    write_atomic(path, |tmp| {
        let mut file = File::create(tmp)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        Ok(())
    })
}

/// Read sheet metadata back from its JSON sidecar.
pub fn read_metadata(path: &Path) -> Result<SheetMetadata> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Scale image by integer factor using nearest-neighbor interpolation.
///
/// This preserves crisp pixel edges for pixel art.
pub fn scale_image(image: &RgbaImage, factor: u32) -> RgbaImage {
    if factor <= 1 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    image::imageops::resize(image, w * factor, h * factor, FilterType::Nearest)
}

/// Paths written for one character.
#[derive(Debug, Clone, Default)]
pub struct WrittenFiles {
    pub frames: Vec<PathBuf>,
    pub sheet: PathBuf,
    pub metadata: PathBuf,
    pub preview: Option<PathBuf>,
}

/// Persist every frame, the sheet, its metadata, and an optional scaled
/// preview into `dir`.
pub fn write_character(
    dir: &Path,
    character: &str,
    set: &DirectionSet,
    sheet: &SpriteSheet,
    pretty: bool,
    preview_scale: u32,
) -> Result<WrittenFiles> {
    fs::create_dir_all(dir)?;

    let mut written = WrittenFiles::default();
    written.frames = write_frames(dir, set)?;

    written.sheet = sheet_path(dir, character);
    save_png(&sheet.image, &written.sheet)?;

    written.metadata = metadata_path(dir, character);
    write_metadata(&sheet.metadata, &written.metadata, pretty)?;

    if preview_scale > 1 {
        let path = preview_path(dir, character);
        save_png(&scale_image(&sheet.image, preview_scale), &path)?;
        written.preview = Some(path);
    }

    Ok(written)
}

/// Persist every frame of `set` into `dir` under its canonical name.
pub fn write_frames(dir: &Path, set: &DirectionSet) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(set.frame_count());
    for (direction, frames) in set.iter() {
        for (i, frame) in frames.iter().enumerate() {
            let path = dir.join(frame_file_name(direction, i));
            save_png(frame, &path)?;
            paths.push(path);
        }
    }
    Ok(paths)
}

/// A frame read back from disk.
#[derive(Debug, Clone)]
pub struct LoadedFrame {
    pub path: PathBuf,
    pub index: usize,
    pub image: RgbaImage,
    /// Whether the file carried an alpha channel
    pub has_alpha: bool,
}

fn glob_error(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Io(io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
}

fn escaped_dir(dir: &Path) -> Result<String> {
    let dir = dir.to_str().ok_or_else(|| glob_error(format!("non UTF-8 path: {}", dir.display())))?;
    Ok(glob::Pattern::escape(dir))
}

/// Parse the frame index out of `{direction}-walk-{index}.png`.
fn frame_index(path: &Path, direction: Direction) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(direction.as_str())?.strip_prefix("-walk-")?.parse().ok()
}

/// Load the persisted frames of one direction, ordered by frame index.
pub fn load_frames(dir: &Path, direction: Direction) -> Result<Vec<LoadedFrame>> {
    let pattern = format!("{}/{}-walk-*.png", escaped_dir(dir)?, direction);

    let mut frames = Vec::new();
    for entry in glob::glob(&pattern).map_err(glob_error)? {
        let path = entry.map_err(glob_error)?;
        let Some(index) = frame_index(&path, direction) else {
            continue;
        };
        let decoded = image::open(&path)
            .map_err(|source| PipelineError::InputNotFound { path: path.clone(), source })?;
        let has_alpha = decoded.color().has_alpha();
        frames.push(LoadedFrame { path, index, image: decoded.to_rgba8(), has_alpha });
    }
    frames.sort_by_key(|f| f.index);
    Ok(frames)
}

/// Directories below `root` that contain persisted walk frames.
pub fn find_character_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*/{}", escaped_dir(root)?, frame_file_name(Direction::Down, 0));
    let mut dirs = Vec::new();
    for entry in glob::glob(&pattern).map_err(glob_error)? {
        let path = entry.map_err(glob_error)?;
        if let Some(parent) = path.parent() {
            dirs.push(parent.to_path_buf());
        }
    }
    dirs.sort();
    dirs.dedup();
    Ok(dirs)
}

/// Exclusive hold on a character directory.
///
/// An advisory lock on [`LOCK_FILE_NAME`]; the OS releases it when the handle
/// closes, including when the process is killed, so a stale lock file never
/// blocks a later pass. The file itself is left in place.
#[derive(Debug)]
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Lock `dir`; fails with [`PipelineError::DirectoryLocked`] if another
    /// pass already holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        let mut file =
            OpenOptions::new().read(true).write(true).create(true).truncate(false).open(&path)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == io::ErrorKind::WouldBlock
                || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
            {
                return Err(PipelineError::DirectoryLocked { path: dir.to_path_buf() });
            }
            return Err(e.into());
        }

        // Holder pid, for humans inspecting the directory
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { _file: file })
    }
}
