//! Sprite sheet assembly - lays a direction set out as one grid image

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pose::{Direction, DirectionSet, TRANSPARENT};

/// Slicing metadata written next to every sheet.
///
/// Field names follow the camelCase convention game engines expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMetadata {
    pub frame_width: u32,
    pub frame_height: u32,
    pub start_frame: u32,
    pub end_frame: u32,
    pub margin: u32,
    pub spacing: u32,
}

impl SheetMetadata {
    pub fn new(frame_width: u32, frame_height: u32, frames_per_direction: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            start_frame: 0,
            end_frame: frames_per_direction * Direction::ALL.len() as u32 - 1,
            margin: 0,
            spacing: 0,
        }
    }
}

/// An assembled sheet and its metadata.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub image: RgbaImage,
    pub metadata: SheetMetadata,
}

/// Assemble `set` into a sheet: one row per direction (down, up, left,
/// right), frames left to right.
///
/// Every direction must be present with the same number of frames, and all
/// frames must share one size; nothing is padded.
///
/// # Examples
///
/// ```
/// use image::RgbaImage;
/// use pixelwalk::pose::{Direction, DirectionSet};
/// use pixelwalk::sheet::assemble;
///
/// let mut set = DirectionSet::new();
/// for d in Direction::ALL {
///     set.insert(d, vec![RgbaImage::new(32, 48); 4]);
/// }
/// let sheet = assemble(&set).unwrap();
/// assert_eq!(sheet.image.dimensions(), (128, 192));
/// assert_eq!(sheet.metadata.end_frame, 15);
/// ```
pub fn assemble(set: &DirectionSet) -> Result<SpriteSheet> {
    let incomplete = |reason: String| PipelineError::DirectionSetIncomplete { reason };

    let mut rows: Vec<&[RgbaImage]> = Vec::with_capacity(Direction::ALL.len());
    for direction in Direction::ALL {
        let frames =
            set.get(direction).ok_or_else(|| incomplete(format!("missing direction '{}'", direction)))?;
        rows.push(frames);
    }

    let frames_per_direction = rows[0].len();
    if frames_per_direction == 0 {
        return Err(incomplete("directions have no frames".to_string()));
    }
    for (direction, frames) in Direction::ALL.iter().zip(&rows) {
        if frames.len() != frames_per_direction {
            return Err(incomplete(format!(
                "direction '{}' has {} frames, expected {}",
                direction,
                frames.len(),
                frames_per_direction
            )));
        }
    }

    let (frame_width, frame_height) = rows[0][0].dimensions();
    for (direction, frames) in Direction::ALL.iter().zip(&rows) {
        if let Some((i, frame)) =
            frames.iter().enumerate().find(|(_, f)| f.dimensions() != (frame_width, frame_height))
        {
            return Err(incomplete(format!(
                "frame {} of '{}' is {}x{}, expected {}x{}",
                i,
                direction,
                frame.width(),
                frame.height(),
                frame_width,
                frame_height
            )));
        }
    }

    let columns = frames_per_direction as u32;
    let mut image = RgbaImage::from_pixel(
        frame_width * columns,
        frame_height * Direction::ALL.len() as u32,
        TRANSPARENT,
    );

    for (direction, frames) in Direction::ALL.iter().zip(&rows) {
        let y = direction.row() * frame_height;
        for (i, frame) in frames.iter().enumerate() {
            let x = i as u32 * frame_width;
            imageops::replace(&mut image, frame, x as i64, y as i64);
        }
    }

    Ok(SpriteSheet { image, metadata: SheetMetadata::new(frame_width, frame_height, columns) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Frame filled with a color unique to its (direction, index).
    fn tagged_frame(direction: Direction, index: usize, w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([direction.row() as u8 * 50, index as u8 * 40, ((x + y) % 256) as u8, 255])
        })
    }

    fn tagged_set(frames: usize, w: u32, h: u32) -> DirectionSet {
        let mut set = DirectionSet::new();
        for d in Direction::ALL {
            set.insert(d, (0..frames).map(|i| tagged_frame(d, i, w, h)).collect());
        }
        set
    }

    #[test]
    fn test_metadata_fields() {
        let meta = SheetMetadata::new(32, 48, 4);
        assert_eq!(meta.start_frame, 0);
        assert_eq!(meta.end_frame, 15);
        assert_eq!(meta.margin, 0);
        assert_eq!(meta.spacing, 0);
    }

    #[test]
    fn test_metadata_json_keys() {
        let json = serde_json::to_value(SheetMetadata::new(32, 48, 4)).unwrap();
        assert_eq!(json["frameWidth"], 32);
        assert_eq!(json["frameHeight"], 48);
        assert_eq!(json["startFrame"], 0);
        assert_eq!(json["endFrame"], 15);
        assert_eq!(json["margin"], 0);
        assert_eq!(json["spacing"], 0);
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_layout_blocks_match_frames() {
        let set = tagged_set(3, 5, 7);
        let sheet = assemble(&set).unwrap();
        assert_eq!(sheet.image.dimensions(), (15, 28));

        for (direction, frames) in set.iter() {
            for (i, frame) in frames.iter().enumerate() {
                let block = imageops::crop_imm(
                    &sheet.image,
                    i as u32 * 5,
                    direction.row() * 7,
                    5,
                    7,
                )
                .to_image();
                assert_eq!(block, *frame, "block for {} frame {}", direction, i);
            }
        }
        assert_eq!(sheet.metadata.end_frame, 11);
    }

    #[test]
    fn test_missing_direction_is_error() {
        let mut set = tagged_set(2, 4, 4);
        let mut partial = DirectionSet::new();
        for d in [Direction::Down, Direction::Up, Direction::Left] {
            partial.insert(d, set.get_mut(d).unwrap().clone());
        }
        let err = assemble(&partial).unwrap_err();
        assert!(err.to_string().contains("right"));
    }

    #[test]
    fn test_unequal_frame_counts_is_error() {
        let mut set = tagged_set(4, 4, 4);
        set.get_mut(Direction::Up).unwrap().pop();
        assert!(matches!(assemble(&set), Err(PipelineError::DirectionSetIncomplete { .. })));
    }

    #[test]
    fn test_mismatched_frame_size_is_error() {
        let mut set = tagged_set(2, 4, 4);
        set.get_mut(Direction::Left).unwrap()[1] = RgbaImage::new(5, 4);
        let err = assemble(&set).unwrap_err();
        assert!(err.to_string().contains("5x4"));
    }

    #[test]
    fn test_empty_directions_is_error() {
        let set = tagged_set(0, 4, 4);
        assert!(assemble(&set).is_err());
    }
}
