//! Pose synthesis - frame fitting, walk cycles, and the four-direction set.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Transparent fill for fresh canvases
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Default frames per direction in a walk cycle.
pub const DEFAULT_FRAMES_PER_DIRECTION: usize = 4;

/// Size of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self { width: 32, height: 48 }
    }
}

/// Facing direction. Declaration order is the sheet row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Down,
    Up,
    Left,
    Right,
}

impl Direction {
    /// All directions in sheet row order.
    pub const ALL: [Direction; 4] = [Direction::Down, Direction::Up, Direction::Left, Direction::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Row of this direction in the sprite sheet.
    pub fn row(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered frame sequences keyed by direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionSet {
    frames: BTreeMap<Direction, Vec<RgbaImage>>,
}

impl DirectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frames for a direction, replacing any previous ones.
    pub fn insert(&mut self, direction: Direction, frames: Vec<RgbaImage>) {
        self.frames.insert(direction, frames);
    }

    pub fn get(&self, direction: Direction) -> Option<&[RgbaImage]> {
        self.frames.get(&direction).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, direction: Direction) -> Option<&mut Vec<RgbaImage>> {
        self.frames.get_mut(&direction)
    }

    /// Directions present, in sheet row order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &[RgbaImage])> {
        self.frames.iter().map(|(d, f)| (*d, f.as_slice()))
    }

    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        self.frames.keys().copied()
    }

    /// All four directions present with the same, nonzero frame count.
    pub fn is_complete(&self) -> bool {
        let counts: Vec<usize> =
            Direction::ALL.iter().filter_map(|d| self.frames.get(d).map(Vec::len)).collect();
        counts.len() == Direction::ALL.len()
            && counts[0] > 0
            && counts.iter().all(|&c| c == counts[0])
    }

    /// Total number of frames across all directions.
    pub fn frame_count(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }
}

/// Tight bounding box `(x, y, width, height)` of pixels with alpha > 0.
pub fn opaque_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Crop to the opaque content, scale it to fit `frame` without smoothing,
/// and center it on a transparent canvas of exactly `frame` size.
pub fn fit_to_frame(image: &RgbaImage, frame: FrameSize) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(frame.width, frame.height, TRANSPARENT);

    let cropped = match opaque_bounds(image) {
        Some((x, y, w, h)) => imageops::crop_imm(image, x, y, w, h).to_image(),
        None => image.clone(),
    };
    let (w, h) = cropped.dimensions();
    if w == 0 || h == 0 || frame.width == 0 || frame.height == 0 {
        return canvas;
    }

    let scale = f64::min(frame.width as f64 / w as f64, frame.height as f64 / h as f64);
    let new_w = ((w as f64 * scale) as u32).clamp(1, frame.width);
    let new_h = ((h as f64 * scale) as u32).clamp(1, frame.height);

    let resized = imageops::resize(&cropped, new_w, new_h, FilterType::Nearest);
    let x = (frame.width - new_w) / 2;
    let y = (frame.height - new_h) / 2;
    imageops::replace(&mut canvas, &resized, x as i64, y as i64);
    canvas
}

/// Produces the frame for one phase of a walk cycle from a base pose.
///
/// Swap implementations to change how walking looks without touching the
/// rest of the pipeline.
pub trait GaitStrategy: Send + Sync {
    fn apply(&self, base: &RgbaImage, phase: usize) -> RgbaImage;

    fn name(&self) -> &'static str;
}

/// Nudges the bottom quarter of the frame sideways by one pixel.
///
/// Phases: left foot forward, neutral, right foot forward, neutral. This is a
/// cosmetic placeholder, not limb animation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegShift;

impl LegShift {
    fn offset(phase: usize) -> i32 {
        match phase % 4 {
            0 => 1,
            2 => -1,
            _ => 0,
        }
    }
}

impl GaitStrategy for LegShift {
    fn apply(&self, base: &RgbaImage, phase: usize) -> RgbaImage {
        let dx = Self::offset(phase);
        if dx == 0 {
            return base.clone();
        }
        let leg_start = base.height() * 3 / 4;
        shift_rows_horizontally(base, leg_start, dx)
    }

    fn name(&self) -> &'static str {
        "leg-shift"
    }
}

/// Every phase is the base pose.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stationary;

impl GaitStrategy for Stationary {
    fn apply(&self, base: &RgbaImage, _phase: usize) -> RgbaImage {
        base.clone()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Selectable gait strategies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum GaitKind {
    #[default]
    LegShift,
    Static,
}

impl GaitKind {
    pub fn strategy(self) -> Box<dyn GaitStrategy> {
        match self {
            GaitKind::LegShift => Box::new(LegShift),
            GaitKind::Static => Box::new(Stationary),
        }
    }
}

/// Shift rows `start_row..height` by `dx` pixels; vacated pixels become
/// transparent and pixels pushed past the edge are dropped.
fn shift_rows_horizontally(image: &RgbaImage, start_row: u32, dx: i32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let mut result = image.clone();
    for y in start_row..h {
        for x in 0..w {
            result.put_pixel(x, y, TRANSPARENT);
        }
        for x in 0..w {
            let new_x = x as i64 + dx as i64;
            if new_x >= 0 && new_x < w as i64 {
                result.put_pixel(new_x as u32, y, *image.get_pixel(x, y));
            }
        }
    }
    result
}

/// `count` frames of a walk cycle, phase 0 first.
pub fn walk_cycle(base: &RgbaImage, count: usize, gait: &dyn GaitStrategy) -> Vec<RgbaImage> {
    (0..count).map(|phase| gait.apply(base, phase)).collect()
}

/// Build the full direction set from one base pose.
///
/// A base that isn't already `frame`-sized is fitted first. Down, up and left
/// share the same walk cycle; right is the mirror image of left.
pub fn generate(
    base: &RgbaImage,
    frame: FrameSize,
    frames_per_direction: usize,
    gait: &dyn GaitStrategy,
) -> DirectionSet {
    let fitted = if base.dimensions() == frame.dimensions() {
        base.clone()
    } else {
        fit_to_frame(base, frame)
    };

    let cycle = walk_cycle(&fitted, frames_per_direction, gait);
    let mirrored: Vec<RgbaImage> = cycle.iter().map(imageops::flip_horizontal).collect();

    let mut set = DirectionSet::new();
    set.insert(Direction::Down, cycle.clone());
    set.insert(Direction::Up, cycle.clone());
    set.insert(Direction::Left, cycle);
    set.insert(Direction::Right, mirrored);

    tracing::debug!(
        gait = gait.name(),
        frames_per_direction,
        "generated {}x{} direction set",
        frame.width,
        frame.height
    );
    set
}
