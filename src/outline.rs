//! Silhouette outline synthesis.
//!
//! The outline is every transparent pixel that touches (8-connected) an
//! opaque one, painted solid black. A one-pixel ring is all a sprite-scale
//! silhouette needs, so there is no contour tracing here.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

/// Color painted onto outline pixels.
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Binary mask of pixels with any opacity (255) vs fully transparent (0).
pub fn alpha_mask(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[3] > 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Add a one-pixel black outline around the opaque silhouette.
///
/// Returns a new image; the input is left untouched.
pub fn outline(image: &RgbaImage) -> RgbaImage {
    let mask = alpha_mask(image);
    // L-infinity radius 1 is the 3x3 neighborhood
    let grown = dilate(&mask, Norm::LInf, 1);

    let mut result = image.clone();
    for (x, y, pixel) in result.enumerate_pixels_mut() {
        if grown.get_pixel(x, y)[0] > 0 && mask.get_pixel(x, y)[0] == 0 {
            *pixel = OUTLINE_COLOR;
        }
    }
    result
}
