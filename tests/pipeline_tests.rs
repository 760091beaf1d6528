//! Library-level tests for the conversion pipeline and alignment pass
//!
//! These run the full stage chain against generated sources and check the
//! properties every output must hold.

use std::fs;
use std::path::Path;

use image::{imageops, Rgb, Rgba, RgbaImage};
use pixelwalk::align::{correct_character_dir, lowest_opaque_row, AlignOptions, ContentRule};
use pixelwalk::grid::GridShape;
use pixelwalk::outline::OUTLINE_COLOR;
use pixelwalk::output::{frame_file_name, metadata_path, read_metadata, save_png, sheet_path};
use pixelwalk::palette::{PaletteName, PALETTES};
use pixelwalk::pipeline::{build_character, convert_character, convert_grid, PipelineOptions};
use pixelwalk::pose::{Direction, FrameSize, GaitKind};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn hash_file(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fs::read(path).expect("output file should exist"));
    format!("{:x}", hasher.finalize())
}

/// Portrait-shaped character: colorful gradient body on transparency.
fn character(width: u32, height: u32, tint: u8) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let inside = x >= width / 4 && x < width * 3 / 4 && y >= height / 6 && y < height * 5 / 6;
        if inside {
            Rgba([tint.wrapping_add((x * 7) as u8), (y * 5) as u8, 255 - (x * 3) as u8, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn opaque_rgb(image: &RgbaImage) -> impl Iterator<Item = Rgb<u8>> + '_ {
    image.pixels().filter(|p| p[3] > 0).map(|p| Rgb([p[0], p[1], p[2]]))
}

// ============================================================================
// Pipeline properties
// ============================================================================

#[test]
fn test_identical_inputs_produce_identical_outputs() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("knight.png");
    character(40, 60, 30).save(&input).unwrap();

    let options = PipelineOptions::default();
    convert_character(&input, &temp.path().join("a"), None, &options).unwrap();
    convert_character(&input, &temp.path().join("b"), None, &options).unwrap();

    let mut names = vec!["knight-sheet.png".to_string(), "knight-sheet.json".to_string()];
    for direction in Direction::ALL {
        for i in 0..4 {
            names.push(frame_file_name(direction, i));
        }
    }
    for name in names {
        assert_eq!(
            hash_file(&temp.path().join("a/knight").join(&name)),
            hash_file(&temp.path().join("b/knight").join(&name)),
            "{} differs between runs",
            name
        );
    }
}

#[test]
fn test_every_opaque_pixel_is_palette_or_outline() {
    for name in PaletteName::ALL {
        let options = PipelineOptions { palette: Some(name), ..Default::default() };
        let result = build_character(&character(50, 50, 90), &options).unwrap();
        let palette = name.palette();
        let outline = Rgb([OUTLINE_COLOR[0], OUTLINE_COLOR[1], OUTLINE_COLOR[2]]);

        for (direction, frames) in result.directions.iter() {
            for frame in frames {
                for color in opaque_rgb(frame) {
                    assert!(
                        palette.contains(color) || color == outline,
                        "{:?} in {} frame is not in {}",
                        color,
                        direction,
                        name
                    );
                }
            }
        }
    }
}

#[test]
fn test_auto_selected_palette_is_canonical() {
    let result = build_character(&character(30, 45, 200), &PipelineOptions::default()).unwrap();
    assert!(PALETTES.iter().any(|p| p.name == result.palette));
    assert!(result.reason.is_some());
}

#[test]
fn test_every_frame_has_configured_size() {
    let options = PipelineOptions {
        frame: FrameSize::new(24, 40),
        frames_per_direction: 6,
        ..Default::default()
    };
    let result = build_character(&character(100, 70, 10), &options).unwrap();
    for direction in Direction::ALL {
        let frames = result.directions.get(direction).unwrap();
        assert_eq!(frames.len(), 6);
        assert!(frames.iter().all(|f| f.dimensions() == (24, 40)));
    }
    assert_eq!(result.sheet.image.dimensions(), (24 * 6, 40 * 4));
    assert_eq!(result.sheet.metadata.end_frame, 23);
}

#[test]
fn test_right_is_mirror_of_left() {
    for gait in [GaitKind::LegShift, GaitKind::Static] {
        let options = PipelineOptions { gait, ..Default::default() };
        let result = build_character(&character(33, 51, 60), &options).unwrap();
        let left = result.directions.get(Direction::Left).unwrap();
        let right = result.directions.get(Direction::Right).unwrap();
        assert_eq!(left.len(), right.len());
        for (l, r) in left.iter().zip(right) {
            assert_eq!(imageops::flip_horizontal(l), *r);
        }
    }
}

#[test]
fn test_sheet_blocks_match_frames() {
    let result = build_character(&character(48, 48, 120), &PipelineOptions::default()).unwrap();
    let FrameSize { width, height } = FrameSize::default();
    for (direction, frames) in result.directions.iter() {
        for (i, frame) in frames.iter().enumerate() {
            let block = imageops::crop_imm(
                &result.sheet.image,
                i as u32 * width,
                direction.row() * height,
                width,
                height,
            )
            .to_image();
            assert_eq!(block, *frame, "{} frame {}", direction, i);
        }
    }
}

#[test]
fn test_written_metadata_matches_sheet() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("mage.png");
    character(32, 32, 0).save(&input).unwrap();

    let report = convert_character(&input, temp.path(), Some("mage"), &PipelineOptions::default())
        .unwrap();
    let meta = read_metadata(&metadata_path(&report.dir, "mage")).unwrap();
    assert_eq!((meta.frame_width, meta.frame_height), (32, 48));
    assert_eq!((meta.start_frame, meta.end_frame), (0, 15));
    assert_eq!((meta.margin, meta.spacing), (0, 0));

    let sheet = image::open(sheet_path(&report.dir, "mage")).unwrap();
    assert_eq!((sheet.width(), sheet.height()), (128, 192));
}

#[test]
fn test_preview_is_scaled_sheet() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("rogue.png");
    character(32, 32, 50).save(&input).unwrap();

    let options = PipelineOptions { preview_scale: 3, ..Default::default() };
    let report = convert_character(&input, temp.path(), None, &options).unwrap();
    let preview = report.files.preview.expect("preview should be written");
    assert_eq!(image::image_dimensions(preview).unwrap(), (384, 576));
}

#[test]
fn test_grid_run_writes_each_character() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("my party.png");
    let mut source = RgbaImage::new(96, 64);
    for row in 0..2u32 {
        for column in 0..3u32 {
            let tile = character(32, 32, (row * 3 + column) as u8 * 40);
            imageops::replace(&mut source, &tile, (column * 32) as i64, (row * 32) as i64);
        }
    }
    source.save(&input).unwrap();

    let out = temp.path().join("out");
    let report = convert_grid(&input, &out, &PipelineOptions::default()).unwrap();
    assert!(report.all_succeeded());
    for i in 1..=6 {
        let name = format!("my-party-char{}", i);
        assert!(out.join(&name).join(format!("{}-sheet.png", name)).exists());
        assert!(out.join(&name).join("right-walk-3.png").exists());
    }
}

#[test]
fn test_parallel_grid_matches_sequential() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("duo.png");
    let mut source = RgbaImage::new(64, 32);
    imageops::replace(&mut source, &character(32, 32, 10), 0, 0);
    imageops::replace(&mut source, &character(32, 32, 170), 32, 0);
    source.save(&input).unwrap();

    let grid = GridShape::new(1, 2);
    let sequential = PipelineOptions { grid, jobs: 1, ..Default::default() };
    let parallel = PipelineOptions { grid, jobs: 4, ..Default::default() };
    convert_grid(&input, &temp.path().join("seq"), &sequential).unwrap();
    convert_grid(&input, &temp.path().join("par"), &parallel).unwrap();

    for name in ["duo-char1", "duo-char2"] {
        let sheet = format!("{}-sheet.png", name);
        assert_eq!(
            hash_file(&temp.path().join("seq").join(name).join(&sheet)),
            hash_file(&temp.path().join("par").join(name).join(&sheet))
        );
    }
}

// ============================================================================
// Alignment pass over pipeline output
// ============================================================================

/// Move content up by `rows`, leaving transparent rows at the bottom.
fn raise(image: &RgbaImage, rows: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    RgbaImage::from_fn(w, h, |x, y| {
        if y + rows < h {
            *image.get_pixel(x, y + rows)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[test]
fn test_alignment_of_fresh_output_is_noop() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("bard.png");
    character(20, 30, 80).save(&input).unwrap();
    let report = convert_character(&input, temp.path(), None, &PipelineOptions::default()).unwrap();

    let before = hash_file(&report.dir.join(frame_file_name(Direction::Down, 2)));
    let aligned = correct_character_dir(&report.dir, AlignOptions::default()).unwrap();
    assert!(aligned.is_noop());
    assert!(aligned.rewritten.is_empty());
    assert_eq!(before, hash_file(&report.dir.join(frame_file_name(Direction::Down, 2))));
}

#[test]
fn test_alignment_repairs_drifted_frame_and_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("monk.png");
    character(20, 30, 140).save(&input).unwrap();
    let options = PipelineOptions { gait: GaitKind::Static, ..Default::default() };
    let report = convert_character(&input, temp.path(), None, &options).unwrap();
    let dir = report.dir;

    let drifted_path = dir.join(frame_file_name(Direction::Up, 1));
    let original = image::open(&drifted_path).unwrap().to_rgba8();
    let expected_row = lowest_opaque_row(&original, ContentRule::Alpha).unwrap();
    save_png(&raise(&original, 3), &drifted_path).unwrap();

    let first = correct_character_dir(&dir, AlignOptions::default()).unwrap();
    assert_eq!(first.shifts[&Direction::Up], vec![0, 3, 0, 0]);
    assert_eq!(first.rewritten, vec![drifted_path.clone()]);

    let repaired = image::open(&drifted_path).unwrap().to_rgba8();
    assert_eq!(lowest_opaque_row(&repaired, ContentRule::Alpha), Some(expected_row));

    let sheet = image::open(sheet_path(&dir, "monk")).unwrap().to_rgba8();
    let block = imageops::crop_imm(&sheet, 32, Direction::Up.row() * 48, 32, 48).to_image();
    assert_eq!(block, repaired);

    let second = correct_character_dir(&dir, AlignOptions::default()).unwrap();
    assert!(second.is_noop());
    assert!(second.rewritten.is_empty());
}
