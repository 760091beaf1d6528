//! Stylized palettes, palette auto-selection, and nearest-color quantization.
//!
//! The five canonical palettes are read-only statics. Selection is a fixed,
//! ordered chain of predicates over a tile's dominant colors; the first
//! predicate that matches wins. Thresholds are empirical and kept as-is.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Side length of the square sample used for dominant-color analysis.
pub const DEFAULT_SAMPLE_SIZE: u32 = 50;

/// Number of dominant colors the classifier looks at.
pub const DEFAULT_DOMINANT_COLORS: usize = 5;

/// Mean `r + g + b` below which a character counts as dark (128 per channel).
const DARK_SUM_THRESHOLD: u32 = 128 * 3;

/// More distinct dominant colors than this counts as high variance.
const HIGH_VARIANCE_DISTINCT: usize = 4;

/// Canonical palette identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteName {
    Warm,
    Cool,
    Tech,
    Rainbow,
    Shiba,
}

impl PaletteName {
    pub const ALL: [PaletteName; 5] =
        [PaletteName::Warm, PaletteName::Cool, PaletteName::Tech, PaletteName::Rainbow, PaletteName::Shiba];

    pub fn as_str(self) -> &'static str {
        match self {
            PaletteName::Warm => "warm",
            PaletteName::Cool => "cool",
            PaletteName::Tech => "tech",
            PaletteName::Rainbow => "rainbow",
            PaletteName::Shiba => "shiba",
        }
    }

    /// The palette this name refers to.
    pub fn palette(self) -> &'static Palette {
        match self {
            PaletteName::Warm => &WARM,
            PaletteName::Cool => &COOL,
            PaletteName::Tech => &TECH,
            PaletteName::Rainbow => &RAINBOW,
            PaletteName::Shiba => &SHIBA,
        }
    }
}

impl fmt::Display for PaletteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaletteName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaletteName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| PipelineError::UnknownPalette { name: s.to_string() })
    }
}

/// A named, ordered list of RGB colors.
///
/// Order does not affect the nearest-color result except for breaking ties.
#[derive(Debug, PartialEq, Eq)]
pub struct Palette {
    pub name: PaletteName,
    pub colors: &'static [Rgb<u8>],
}

impl Palette {
    /// Look up a canonical palette by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use pixelwalk::palette::Palette;
    ///
    /// assert_eq!(Palette::by_name("tech").unwrap().colors.len(), 14);
    /// assert!(Palette::by_name("neon").is_err());
    /// ```
    pub fn by_name(name: &str) -> Result<&'static Palette, PipelineError> {
        Ok(name.parse::<PaletteName>()?.palette())
    }

    pub fn contains(&self, color: Rgb<u8>) -> bool {
        self.colors.contains(&color)
    }

    /// Colors as `#RRGGBB` strings, for listings.
    pub fn hex_colors(&self) -> Vec<String> {
        self.colors.iter().map(|c| format!("#{:02X}{:02X}{:02X}", c[0], c[1], c[2])).collect()
    }
}

/// All canonical palettes in display order.
pub static PALETTES: [&Palette; 5] = [&WARM, &COOL, &TECH, &RAINBOW, &SHIBA];

/// Browns, oranges and gold.
pub static WARM: Palette = Palette {
    name: PaletteName::Warm,
    colors: &[
        Rgb([139, 69, 19]),   // dark brown
        Rgb([184, 105, 43]),  // medium brown
        Rgb([217, 132, 61]),  // light brown
        Rgb([240, 161, 85]),  // bright orange
        Rgb([255, 181, 112]), // highlight orange
        Rgb([184, 134, 11]),  // dark gold
        Rgb([255, 215, 0]),   // gold
        Rgb([255, 237, 78]),  // bright gold
        Rgb([62, 39, 35]),    // shadow
        Rgb([255, 255, 255]),
        Rgb([224, 224, 224]),
        Rgb([0, 0, 0]),
        Rgb([33, 33, 33]),
        Rgb([255, 107, 157]), // pink accent
    ],
};

/// Purples with gold and glow-green accents.
pub static COOL: Palette = Palette {
    name: PaletteName::Cool,
    colors: &[
        Rgb([74, 20, 140]),
        Rgb([106, 27, 154]),
        Rgb([142, 36, 170]),
        Rgb([171, 71, 188]),
        Rgb([224, 224, 224]),
        Rgb([255, 255, 255]),
        Rgb([184, 134, 11]),
        Rgb([255, 215, 0]),
        Rgb([255, 237, 78]),
        Rgb([0, 230, 118]),   // glow green
        Rgb([105, 240, 174]), // bright glow
        Rgb([0, 0, 0]),
        Rgb([26, 26, 26]),
        Rgb([232, 220, 199]), // bone
    ],
};

/// Gray ramp with neon accents.
pub static TECH: Palette = Palette {
    name: PaletteName::Tech,
    colors: &[
        Rgb([0, 0, 0]),
        Rgb([26, 26, 26]),
        Rgb([44, 44, 44]),
        Rgb([61, 61, 61]),
        Rgb([66, 66, 66]),
        Rgb([97, 97, 97]),
        Rgb([117, 117, 117]),
        Rgb([0, 229, 255]),   // cyan neon
        Rgb([29, 233, 182]),  // green neon
        Rgb([255, 110, 64]),  // orange neon
        Rgb([255, 87, 34]),   // red eyes
        Rgb([255, 112, 67]),  // light eyes
        Rgb([255, 215, 0]),
        Rgb([255, 255, 255]),
    ],
};

pub static RAINBOW: Palette = Palette {
    name: PaletteName::Rainbow,
    colors: &[
        Rgb([255, 23, 68]),
        Rgb([255, 111, 0]),
        Rgb([255, 235, 59]),
        Rgb([0, 230, 118]),
        Rgb([41, 121, 255]),
        Rgb([156, 39, 176]),
        Rgb([0, 0, 0]),
        Rgb([255, 255, 255]),
        Rgb([224, 224, 224]),
        Rgb([255, 215, 0]),
        Rgb([33, 33, 33]),
    ],
};

/// Cream and tan fur, leather, red and silver.
pub static SHIBA: Palette = Palette {
    name: PaletteName::Shiba,
    colors: &[
        Rgb([245, 222, 179]), // cream
        Rgb([222, 184, 135]), // tan
        Rgb([210, 105, 30]),  // dark tan
        Rgb([139, 69, 19]),
        Rgb([0, 0, 0]),
        Rgb([26, 26, 26]),
        Rgb([44, 44, 44]), // leather
        Rgb([139, 0, 0]),
        Rgb([178, 34, 34]),
        Rgb([220, 20, 60]),
        Rgb([192, 192, 192]), // silver
        Rgb([232, 232, 232]),
        Rgb([255, 255, 255]),
    ],
};

/// Which predicate of the selection chain picked the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteReason {
    Dark,
    Purple,
    HighVariance,
    Orange,
    Fallback,
}

impl fmt::Display for PaletteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaletteReason::Dark => "dark character",
            PaletteReason::Purple => "purple dominant color",
            PaletteReason::HighVariance => "high color variance",
            PaletteReason::Orange => "orange dominant color",
            PaletteReason::Fallback => "default",
        };
        f.write_str(s)
    }
}

/// Result of palette auto-selection.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub palette: &'static Palette,
    pub reason: PaletteReason,
}

/// Sampling knobs for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    pub sample_size: u32,
    pub dominant_colors: usize,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self { sample_size: DEFAULT_SAMPLE_SIZE, dominant_colors: DEFAULT_DOMINANT_COLORS }
    }
}

/// Most frequent colors of `image`, most common first.
///
/// Alpha is dropped first, then the RGB image is resampled to `sample_size` x
/// `sample_size` with a bicubic (Catmull-Rom) filter, so soft edges contribute
/// blended colors. Equal counts keep first-seen order.
pub fn dominant_colors(image: &RgbaImage, options: SampleOptions) -> Vec<Rgb<u8>> {
    if image.width() == 0 || image.height() == 0 || options.sample_size == 0 {
        return Vec::new();
    }

    let rgb = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Rgb([p[0], p[1], p[2]])
    });
    let size = options.sample_size;
    let sample = if rgb.dimensions() == (size, size) {
        rgb
    } else {
        imageops::resize(&rgb, size, size, FilterType::CatmullRom)
    };

    // color -> (count, first index)
    let mut counts: HashMap<[u8; 3], (u32, usize)> = HashMap::new();
    for (index, pixel) in sample.pixels().enumerate() {
        let rgb = [pixel[0], pixel[1], pixel[2]];
        counts.entry(rgb).or_insert((0, index)).0 += 1;
    }

    let mut ranked: Vec<([u8; 3], u32, usize)> =
        counts.into_iter().map(|(rgb, (count, first))| (rgb, count, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked.into_iter().take(options.dominant_colors).map(|(rgb, _, _)| Rgb(rgb)).collect()
}

fn is_purple(c: &Rgb<u8>) -> bool {
    c[2] > c[0] && c[2] > c[1]
}

fn is_orange(c: &Rgb<u8>) -> bool {
    c[0] > 150 && c[1] > 80 && c[2] < 100
}

/// Run the ordered selection chain over a set of dominant colors.
pub fn classify_colors(dominant: &[Rgb<u8>]) -> Classification {
    let pick = |name: PaletteName, reason| Classification { palette: name.palette(), reason };

    if dominant.is_empty() {
        return pick(PaletteName::Warm, PaletteReason::Fallback);
    }

    let total: u32 = dominant.iter().map(|c| c[0] as u32 + c[1] as u32 + c[2] as u32).sum();
    let is_dark = total < DARK_SUM_THRESHOLD * dominant.len() as u32;

    let mut distinct = dominant.to_vec();
    distinct.sort_by_key(|c| c.0);
    distinct.dedup();

    if is_dark {
        pick(PaletteName::Tech, PaletteReason::Dark)
    } else if dominant.iter().any(is_purple) {
        pick(PaletteName::Cool, PaletteReason::Purple)
    } else if distinct.len() > HIGH_VARIANCE_DISTINCT {
        pick(PaletteName::Rainbow, PaletteReason::HighVariance)
    } else if dominant.iter().any(is_orange) {
        pick(PaletteName::Warm, PaletteReason::Orange)
    } else {
        pick(PaletteName::Warm, PaletteReason::Fallback)
    }
}

/// Classify a tile and report which rule fired.
pub fn classify(image: &RgbaImage, options: SampleOptions) -> Classification {
    classify_colors(&dominant_colors(image, options))
}

/// Pick the best canonical palette for a tile.
pub fn select_palette(image: &RgbaImage) -> &'static Palette {
    classify(image, SampleOptions::default()).palette
}

/// Palette entry with the smallest squared RGB distance; first entry wins ties.
pub fn nearest_color(color: Rgb<u8>, palette: &Palette) -> Rgb<u8> {
    let mut best = palette.colors[0];
    let mut best_dist = u32::MAX;
    for &candidate in palette.colors {
        let dist = squared_distance(color, candidate);
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    best
}

fn squared_distance(a: Rgb<u8>, b: Rgb<u8>) -> u32 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// Snap every non-transparent pixel to its nearest palette color.
///
/// Fully transparent pixels are left untouched and alpha is preserved.
pub fn quantize(image: &RgbaImage, palette: &Palette) -> RgbaImage {
    let mut result = image.clone();
    // Small palettes and sprite-sized images: a cache keeps repeated colors cheap
    let mut cache: HashMap<[u8; 3], Rgb<u8>> = HashMap::new();

    for pixel in result.pixels_mut() {
        if pixel[3] == 0 {
            continue;
        }
        let rgb = [pixel[0], pixel[1], pixel[2]];
        let snapped = *cache.entry(rgb).or_insert_with(|| nearest_color(Rgb(rgb), palette));
        pixel[0] = snapped[0];
        pixel[1] = snapped[1];
        pixel[2] = snapped[2];
    }

    result
}
