// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food photo normalization for the vision model.
//!
//! Pipeline: validate MIME type and size, decode, apply EXIF orientation,
//! downscale by a step function of the original size, then JPEG-encode with
//! a quality search that aims for a byte band small enough to upload quickly
//! but detailed enough for food recognition.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat, RgbImage};
use serde::Serialize;
use std::io::Cursor;

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Accepted input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    /// Map a declared MIME type. Parameters and case are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(SourceFormat::Jpeg),
            "image/png" => Some(SourceFormat::Png),
            "image/webp" => Some(SourceFormat::WebP),
            _ => None,
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
            SourceFormat::WebP => ImageFormat::WebP,
        }
    }
}

/// A user-selected image as received.
#[derive(Debug, Clone, Copy)]
pub struct RawImageInput<'a> {
    pub bytes: &'a [u8],
    /// Declared MIME type, e.g. from a `Content-Type` header
    pub mime_type: Option<&'a str>,
}

impl<'a> RawImageInput<'a> {
    pub fn new(bytes: &'a [u8], mime_type: Option<&'a str>) -> Self {
        Self { bytes, mime_type }
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// JPEG payload ready for the vision model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedImage {
    /// Base64 (standard alphabet) JPEG bytes
    pub encoded_payload: String,
    pub original_byte_size: usize,
    pub compressed_byte_size: usize,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub codec: &'static str,
    /// JPEG quality (1-100) of the returned encoding
    pub quality: u8,
}

impl NormalizedImage {
    /// The payload as a `data:` URL.
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.encoded_payload)
    }
}

/// Normalization failures. None of these are retryable with the same input.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),
}

impl NormalizeError {
    /// Stable wire code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            NormalizeError::UnsupportedFormat(_) => "INVALID_FILE_FORMAT",
            NormalizeError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            NormalizeError::DecodeError(_) => "IMAGE_DECODE_ERROR",
            NormalizeError::EncodeError(_) => "COMPRESSION_FAILED",
        }
    }
}

/// Size and quality policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePolicy {
    /// Inputs larger than this are rejected
    pub max_input_bytes: usize,
    /// Images whose longer side is below this are never resized
    pub resize_floor: u32,
    /// `(exclusive upper bound on longer side, target)` steps; anything
    /// above the last bound uses `largest_target`
    pub resize_steps: Vec<(u32, u32)>,
    pub largest_target: u32,
    pub target_min_bytes: usize,
    pub target_max_bytes: usize,
    /// Quality search stops once within this distance of `target_max_bytes`
    pub tolerance_bytes: usize,
    pub quality_high: u8,
    pub quality_low: u8,
    pub max_search_iterations: u32,
    pub quality_nudge: u8,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            max_input_bytes: 10 * MIB,
            resize_floor: 1280,
            resize_steps: vec![(2000, 1280), (3000, 1440)],
            largest_target: 1600,
            target_min_bytes: 200 * KIB,
            target_max_bytes: 600 * KIB,
            tolerance_bytes: 50 * KIB,
            quality_high: 75,
            quality_low: 65,
            max_search_iterations: 5,
            quality_nudge: 5,
        }
    }
}

impl ImagePolicy {
    /// Target length of the longer side for an image whose longer side is
    /// `longer`. Never larger than `longer`.
    pub fn target_dimension(&self, longer: u32) -> u32 {
        if longer < self.resize_floor {
            return longer;
        }
        self.resize_steps
            .iter()
            .find(|(bound, _)| longer < *bound)
            .map(|(_, target)| *target)
            .unwrap_or(self.largest_target)
    }

    /// Output dimensions for a `width` x `height` image.
    ///
    /// Resizes only when the longer side is strictly greater than the
    /// target; both sides are floored and kept at least 1.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let longer = width.max(height);
        let target = self.target_dimension(longer);
        if longer <= target {
            return (width, height);
        }
        let ratio = target as f64 / longer as f64;
        let new_w = ((width as f64 * ratio).floor() as u32).max(1);
        let new_h = ((height as f64 * ratio).floor() as u32).max(1);
        (new_w, new_h)
    }
}

/// Normalizes user photos into JPEG payloads.
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    policy: ImagePolicy,
}

impl ImageNormalizer {
    pub fn new(policy: ImagePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ImagePolicy {
        &self.policy
    }

    /// Run the full pipeline.
    pub fn normalize(&self, input: RawImageInput<'_>) -> Result<NormalizedImage, NormalizeError> {
        let mime = input.mime_type.map(str::trim).unwrap_or("");
        if mime.is_empty() {
            return Err(NormalizeError::UnsupportedFormat(
                "missing content type".to_string(),
            ));
        }
        let format = SourceFormat::from_mime(mime)
            .ok_or_else(|| NormalizeError::UnsupportedFormat(mime.to_string()))?;

        if input.byte_len() > self.policy.max_input_bytes {
            return Err(NormalizeError::FileTooLarge {
                size: input.byte_len(),
                limit: self.policy.max_input_bytes,
            });
        }

        let decoded = image::load_from_memory_with_format(input.bytes, format.image_format())
            .map_err(|e| NormalizeError::DecodeError(e.to_string()))?;

        let oriented = if format == SourceFormat::Jpeg {
            let orientation = super::exif::read_orientation(input.bytes);
            super::exif::apply_orientation(decoded, orientation)
        } else {
            decoded
        };

        let (src_w, src_h) = (oriented.width(), oriented.height());
        let (new_w, new_h) = self.policy.output_dimensions(src_w, src_h);
        let rgb = resize_to_rgb(oriented, new_w, new_h);

        let (bytes, quality) = self.encode_adaptive(&rgb)?;

        tracing::debug!(
            from = format!("{src_w}x{src_h}"),
            to = format!("{new_w}x{new_h}"),
            quality,
            original_bytes = input.byte_len(),
            compressed_bytes = bytes.len(),
            "Image normalized"
        );

        Ok(NormalizedImage {
            compressed_byte_size: bytes.len(),
            encoded_payload: STANDARD.encode(&bytes),
            original_byte_size: input.byte_len(),
            pixel_width: new_w,
            pixel_height: new_h,
            codec: "jpeg",
            quality,
        })
    }

    /// Encode at high quality, then search downward if too large or nudge
    /// upward if too small. Returns the chosen bytes and quality.
    fn encode_adaptive(&self, img: &RgbImage) -> Result<(Vec<u8>, u8), NormalizeError> {
        let p = &self.policy;
        let mut quality = p.quality_high;
        let mut bytes = encode_jpeg(img, quality)?;
        // Smallest encoding seen, used when the ceiling cannot be met
        let mut smallest = (bytes.len(), quality);
        // Largest encoding seen that fits under the ceiling
        let mut best_fit: Option<(Vec<u8>, u8)> = None;

        if bytes.len() > p.target_max_bytes {
            let mut low = p.quality_low;
            let mut high = p.quality_high;
            let mut attempts = 0;

            while attempts < p.max_search_iterations
                && (bytes.len() > p.target_max_bytes
                    || p.target_max_bytes - bytes.len() > p.tolerance_bytes)
            {
                quality = low + (high - low) / 2;
                bytes = encode_jpeg(img, quality)?;
                if bytes.len() < smallest.0 {
                    smallest = (bytes.len(), quality);
                }
                if bytes.len() > p.target_max_bytes {
                    high = quality;
                } else {
                    if best_fit.as_ref().map_or(true, |(b, _)| bytes.len() > b.len()) {
                        best_fit = Some((bytes.clone(), quality));
                    }
                    low = quality;
                }
                attempts += 1;
            }

            if bytes.len() > p.target_max_bytes {
                if let Some((fit, fit_quality)) = best_fit {
                    tracing::debug!(
                        quality = fit_quality,
                        bytes = fit.len(),
                        "Search ended over the ceiling, using best fitting encoding"
                    );
                    quality = fit_quality;
                    bytes = fit;
                } else if smallest.1 != quality {
                    tracing::debug!(
                        quality = smallest.1,
                        bytes = smallest.0,
                        "Size ceiling not reachable, using smallest encoding"
                    );
                    quality = smallest.1;
                    bytes = encode_jpeg(img, quality)?;
                }
            }
        }

        if bytes.len() < p.target_min_bytes && quality < p.quality_high {
            let nudged = quality.saturating_add(p.quality_nudge).min(p.quality_high);
            let candidate = encode_jpeg(img, nudged)?;
            if candidate.len() <= p.target_max_bytes {
                quality = nudged;
                bytes = candidate;
            }
        }

        Ok((bytes, quality))
    }
}

/// Resize (if needed) and drop any alpha channel.
fn resize_to_rgb(img: DynamicImage, width: u32, height: u32) -> RgbImage {
    let rgb = img.to_rgb8();
    if rgb.width() == width && rgb.height() == height {
        return rgb;
    }
    image::imageops::resize(&rgb, width, height, FilterType::CatmullRom)
}

/// Encode an RGB image as baseline JPEG at `quality` (1-100).
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, NormalizeError> {
    let mut cursor = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder
        .encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
        .map_err(|e| NormalizeError::EncodeError(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    // ── policy ──

    #[test]
    fn target_dimension_steps() {
        let p = ImagePolicy::default();
        assert_eq!(p.target_dimension(800), 800);
        assert_eq!(p.target_dimension(1279), 1279);
        assert_eq!(p.target_dimension(1280), 1280);
        assert_eq!(p.target_dimension(1999), 1280);
        assert_eq!(p.target_dimension(2000), 1440);
        assert_eq!(p.target_dimension(2999), 1440);
        assert_eq!(p.target_dimension(3000), 1600);
        assert_eq!(p.target_dimension(8000), 1600);
    }

    #[test]
    fn output_dimensions_never_upscale() {
        let p = ImagePolicy::default();
        assert_eq!(p.output_dimensions(640, 480), (640, 480));
    }

    #[test]
    fn output_dimensions_equal_to_target_is_noop() {
        let p = ImagePolicy::default();
        // Longer side exactly at the target: strict comparison, no resize
        assert_eq!(p.output_dimensions(1280, 720), (1280, 720));
        assert_eq!(p.output_dimensions(720, 1280), (720, 1280));
    }

    #[test]
    fn output_dimensions_floor_and_preserve_ratio() {
        let p = ImagePolicy::default();
        // 1500 -> 1280: ratio 0.8533.., 1000 * ratio = 853.33 -> 853
        assert_eq!(p.output_dimensions(1500, 1000), (1280, 853));
        assert_eq!(p.output_dimensions(4000, 3000), (1600, 1200));
        assert_eq!(p.output_dimensions(2500, 2500), (1440, 1440));
    }

    #[test]
    fn output_dimensions_extreme_aspect_keeps_one_pixel() {
        let p = ImagePolicy::default();
        assert_eq!(p.output_dimensions(1, 5000), (1, 1600));
    }

    #[test]
    fn mime_parsing() {
        assert_eq!(SourceFormat::from_mime("image/jpeg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_mime("IMAGE/PNG"), Some(SourceFormat::Png));
        assert_eq!(
            SourceFormat::from_mime("image/webp; q=1"),
            Some(SourceFormat::WebP)
        );
        assert_eq!(SourceFormat::from_mime("image/gif"), None);
        assert_eq!(SourceFormat::from_mime("image/jpg"), None);
    }

    // ── validation ──

    #[test]
    fn rejects_gif() {
        let err = ImageNormalizer::default()
            .normalize(RawImageInput::new(b"GIF89a", Some("image/gif")))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::UnsupportedFormat(_)));
        assert_eq!(err.code(), "INVALID_FILE_FORMAT");
    }

    #[test]
    fn rejects_missing_type() {
        let normalizer = ImageNormalizer::default();
        let bytes = png_bytes(4, 4);
        for mime in [None, Some(""), Some("  ")] {
            let err = normalizer
                .normalize(RawImageInput::new(&bytes, mime))
                .unwrap_err();
            assert!(matches!(err, NormalizeError::UnsupportedFormat(_)));
        }
    }

    #[test]
    fn rejects_oversized_before_decoding() {
        let policy = ImagePolicy {
            max_input_bytes: 16,
            ..ImagePolicy::default()
        };
        // Not a valid image: size check must fire first
        let bytes = vec![0u8; 17];
        let err = ImageNormalizer::new(policy)
            .normalize(RawImageInput::new(&bytes, Some("image/png")))
            .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::FileTooLarge { size: 17, limit: 16 }
        ));
    }

    #[test]
    fn zero_byte_file_is_decode_error() {
        let err = ImageNormalizer::default()
            .normalize(RawImageInput::new(&[], Some("image/jpeg")))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::DecodeError(_)));
    }

    #[test]
    fn corrupt_data_is_decode_error() {
        let err = ImageNormalizer::default()
            .normalize(RawImageInput::new(b"definitely not a png", Some("image/png")))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::DecodeError(_)));
    }

    // ── encoding ──

    #[test]
    fn small_png_keeps_dimensions_and_becomes_jpeg() {
        let bytes = png_bytes(320, 240);
        let out = ImageNormalizer::default()
            .normalize(RawImageInput::new(&bytes, Some("image/png")))
            .unwrap();

        assert_eq!((out.pixel_width, out.pixel_height), (320, 240));
        assert_eq!(out.codec, "jpeg");
        assert_eq!(out.original_byte_size, bytes.len());
        assert_eq!(out.quality, 75);

        let jpeg = STANDARD.decode(&out.encoded_payload).unwrap();
        assert_eq!(jpeg.len(), out.compressed_byte_size);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
        assert!(out.data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn unreachable_ceiling_returns_smallest_without_error() {
        // Noise compresses badly; a 1-byte ceiling can never be met
        let mut seed: u32 = 12345;
        let img = RgbImage::from_fn(200, 200, |_, _| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let v = (seed >> 16) as u8;
            Rgb([v, v.wrapping_mul(3), v.wrapping_mul(7)])
        });
        let policy = ImagePolicy {
            target_min_bytes: 0,
            target_max_bytes: 1,
            tolerance_bytes: 0,
            ..ImagePolicy::default()
        };
        let normalizer = ImageNormalizer::new(policy.clone());
        let (bytes, quality) = normalizer.encode_adaptive(&img).unwrap();

        assert!(quality >= policy.quality_low);
        assert!(quality < policy.quality_high);
        let at_high = encode_jpeg(&img, policy.quality_high).unwrap();
        assert!(bytes.len() <= at_high.len());
    }

    #[test]
    fn tiny_output_at_high_quality_is_not_nudged() {
        let img = RgbImage::from_pixel(64, 64, Rgb([200, 100, 50]));
        let (bytes, quality) = ImageNormalizer::default().encode_adaptive(&img).unwrap();
        assert_eq!(quality, 75);
        assert!(bytes.len() < 200 * KIB);
    }

    fn noise(width: u32, height: u32) -> RgbImage {
        let mut state: u32 = 0x2545_f491;
        RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        })
    }

    #[test]
    fn output_just_over_ceiling_is_searched_down() {
        let img = noise(600, 600);
        let at_high = encode_jpeg(&img, 75).unwrap().len();
        // Over the ceiling by less than the tolerance
        let policy = ImagePolicy {
            target_min_bytes: 0,
            target_max_bytes: at_high - 1000,
            ..ImagePolicy::default()
        };
        let (bytes, quality) = ImageNormalizer::new(policy.clone())
            .encode_adaptive(&img)
            .unwrap();
        assert!(bytes.len() <= policy.target_max_bytes);
        assert!(quality < 75);
        assert!(quality >= policy.quality_low);
    }

    #[test]
    fn search_settles_within_tolerance_below_ceiling() {
        let img = noise(600, 600);
        let at_low = encode_jpeg(&img, 65).unwrap().len();
        let at_high = encode_jpeg(&img, 75).unwrap().len();
        let policy = ImagePolicy {
            target_min_bytes: 0,
            target_max_bytes: (at_low + at_high) / 2,
            tolerance_bytes: at_high - at_low,
            ..ImagePolicy::default()
        };
        let (bytes, _) = ImageNormalizer::new(policy.clone())
            .encode_adaptive(&img)
            .unwrap();
        assert!(bytes.len() <= policy.target_max_bytes);
        assert!(policy.target_max_bytes - bytes.len() <= policy.tolerance_bytes);
    }
}
