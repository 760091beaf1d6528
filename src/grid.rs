//! Grid segmentation - splits a composite source image into character tiles

use image::{imageops, RgbaImage};
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Shape of a composite character grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: u32,
    pub columns: u32,
}

impl GridShape {
    pub fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> u32 {
        self.rows * self.columns
    }
}

impl Default for GridShape {
    /// The supported composite inputs are 2 rows x 3 columns.
    fn default() -> Self {
        Self { rows: 2, columns: 3 }
    }
}

/// One character cropped out of a composite source.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Column index in the grid
    pub column: u32,
    /// Row index in the grid
    pub row: u32,
    /// Cropped pixels
    pub image: RgbaImage,
}

impl Tile {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel offset of this tile's top-left corner in the source image.
    pub fn origin(&self) -> (u32, u32) {
        (self.column * self.width(), self.row * self.height())
    }
}

/// Split `source` into `rows * columns` tiles in row-major order.
///
/// Cell size is `width / columns` by `height / rows`. When a dimension is not
/// evenly divisible the call fails with [`PipelineError::InvalidGridGeometry`],
/// unless `allow_remainder` is set, in which case the right and bottom
/// remainder pixels are discarded (and logged).
///
/// # Examples
///
/// ```
/// use image::RgbaImage;
/// use pixelwalk::grid::{segment, GridShape};
///
/// let source = RgbaImage::new(96, 64);
/// let tiles = segment(&source, GridShape::new(2, 3), false).unwrap();
/// assert_eq!(tiles.len(), 6);
/// assert_eq!(tiles[0].width(), 32);
/// ```
pub fn segment(source: &RgbaImage, shape: GridShape, allow_remainder: bool) -> Result<Vec<Tile>> {
    let (width, height) = source.dimensions();
    let geometry_error = |reason: String| PipelineError::InvalidGridGeometry {
        width,
        height,
        rows: shape.rows,
        columns: shape.columns,
        reason,
    };

    if shape.rows == 0 || shape.columns == 0 {
        return Err(geometry_error("grid must have at least one row and column".to_string()));
    }

    let cell_width = width / shape.columns;
    let cell_height = height / shape.rows;
    if cell_width == 0 || cell_height == 0 {
        return Err(geometry_error("grid cells would be empty".to_string()));
    }

    let rem_x = width % shape.columns;
    let rem_y = height % shape.rows;
    if rem_x != 0 || rem_y != 0 {
        if !allow_remainder {
            let reason = if rem_x != 0 {
                format!("width {} is not divisible by {} columns", width, shape.columns)
            } else {
                format!("height {} is not divisible by {} rows", height, shape.rows)
            };
            return Err(geometry_error(reason));
        }
        tracing::warn!(
            remainder_x = rem_x,
            remainder_y = rem_y,
            "discarding grid remainder: {}px on the right, {}px at the bottom",
            rem_x,
            rem_y
        );
    }

    let mut tiles = Vec::with_capacity(shape.cell_count() as usize);
    for row in 0..shape.rows {
        for column in 0..shape.columns {
            let x = column * cell_width;
            let y = row * cell_height;
            let image = imageops::crop_imm(source, x, y, cell_width, cell_height).to_image();
            tiles.push(Tile { column, row, image });
        }
    }

    tracing::debug!(
        tiles = tiles.len(),
        cell_width,
        cell_height,
        "segmented {}x{} source",
        width,
        height
    );
    Ok(tiles)
}

/// Name for the `index`-th (zero-based, row-major) character of a grid source.
///
/// Spaces in the file stem become dashes: `set 1.png` → `set-1-char1`.
pub fn character_name(source: &Path, index: usize) -> String {
    let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("grid").replace(' ', "-");
    format!("{}-char{}", stem, index + 1)
}
