// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! EXIF orientation handling for phone photos.
//!
//! Orientation values (tag 0x0112):
//! 1 = upright, 2 = mirrored, 3 = 180°, 4 = flipped vertically,
//! 5 = mirrored + 90° CW, 6 = 90° CW, 7 = mirrored + 270° CW, 8 = 270° CW.
//! Values 5-8 swap width and height.

use exif::{In, Reader, Tag};
use image::DynamicImage;
use std::io::Cursor;

/// Read the orientation tag from raw image bytes.
/// Returns 1 when there is no EXIF block, no tag, or an out-of-range value.
pub fn read_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let exif = match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .filter(|v| (1..=8).contains(v))
        .unwrap_or(1)
}

/// Rotate/flip so the pixels display upright.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    /// 2x1 image: red on the left, blue on the right.
    fn two_pixel() -> DynamicImage {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn orientation_one_is_identity() {
        let img = two_pixel();
        let out = apply_orientation(img.clone(), 1);
        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn orientations_five_to_eight_swap_dimensions() {
        for o in 5..=8 {
            assert_eq!(apply_orientation(two_pixel(), o).dimensions(), (1, 2), "o={o}");
        }
        for o in 1..=4 {
            assert_eq!(apply_orientation(two_pixel(), o).dimensions(), (2, 1), "o={o}");
        }
    }

    #[test]
    fn orientation_six_puts_left_edge_on_top() {
        let out = apply_orientation(two_pixel(), 6).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([0, 0, 255]));
    }

    #[test]
    fn orientation_eight_puts_left_edge_on_bottom() {
        let out = apply_orientation(two_pixel(), 8).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn orientation_two_mirrors() {
        let out = apply_orientation(two_pixel(), 2).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn unknown_orientation_is_identity() {
        assert_eq!(apply_orientation(two_pixel(), 42).dimensions(), (2, 1));
    }

    #[test]
    fn missing_exif_reads_as_upright() {
        assert_eq!(read_orientation(&[]), 1);
        assert_eq!(read_orientation(b"\xFF\xD8\xFF\xD9"), 1);
    }
}
