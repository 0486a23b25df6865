//! Resize by dimensions or toward a target file size

use image::imageops::FilterType;
use tracing::info;

use super::encode::{decode_image, encode_jpeg, encode_png, sniff_image_type};
use super::MAX_OUTPUT_PIXELS;
use crate::artifact::Artifact;
use crate::error::{ToolError, ToolResult};
use crate::size_search::{search_under_target, TargetSize, IMAGE_QUALITY_PRESETS};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

/// Operation: Lanczos3 resample to exactly `width` x `height`, PNG out
pub fn resize_pixels(bytes: &[u8], width: u32, height: u32) -> ToolResult<Artifact> {
    if width == 0 || height == 0 {
        return Err(ToolError::InvalidInput(format!(
            "Width and height must be positive (got {}x{})",
            width, height
        )));
    }
    if width as u64 * height as u64 > MAX_OUTPUT_PIXELS {
        return Err(ToolError::InvalidInput(format!(
            "{}x{} exceeds the maximum output size",
            width, height
        )));
    }

    let img = decode_image(bytes)?;
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    Ok(Artifact::png(encode_png(&resized)?, "resized.png"))
}

/// Operation: re-encode as JPEG at the highest quality that fits `target`
///
/// An image already under the target comes back untouched, in its own format.
pub fn resize_to_filesize(bytes: &[u8], target: TargetSize) -> ToolResult<Artifact> {
    let img = decode_image(bytes)?;
    let result = search_under_target(bytes, target.bytes(), &IMAGE_QUALITY_PRESETS, |quality| {
        encode_jpeg(&img, quality)
    });

    info!(
        outcome = ?result.outcome,
        attempts = result.attempts,
        input = bytes.len(),
        output = result.data.len(),
        "Image size search finished"
    );

    if result.is_original() {
        let (mime, ext) = sniff_image_type(&result.data);
        return Ok(Artifact::new(result.data, mime, format!("resized.{}", ext)));
    }
    Ok(Artifact::jpeg(result.data, "resized.jpg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{MIME_JPEG, MIME_PNG};
    use crate::size_search::SizeUnit;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

    fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let mut state: u32 = 0x9E37_79B9;
        let img = RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            Rgb([state as u8, (state >> 8) as u8, (state >> 16) as u8])
        });
        encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    #[test]
    fn test_resize_pixels_exact_dimensions() {
        let artifact = resize_pixels(&noisy_png(50, 40), 20, 70).unwrap();
        assert_eq!(artifact.mime_type, MIME_PNG);
        assert_eq!(artifact.filename, "resized.png");

        let out = decode_image(&artifact.data).unwrap();
        assert_eq!(out.dimensions(), (20, 70));
    }

    #[test]
    fn test_resize_pixels_rejects_zero() {
        assert!(matches!(
            resize_pixels(&noisy_png(4, 4), 0, 10),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resize_pixels_rejects_huge_canvas() {
        assert!(matches!(
            resize_pixels(&noisy_png(4, 4), 100_000, 100_000),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_filesize_small_image_returned_as_is() {
        let png = noisy_png(4, 4);
        let artifact = resize_to_filesize(&png, TargetSize::new(1.0, SizeUnit::Mb)).unwrap();

        assert_eq!(artifact.data, png);
        assert_eq!(artifact.mime_type, MIME_PNG);
        assert_eq!(artifact.filename, "resized.png");
    }

    #[test]
    fn test_filesize_reaches_target_as_jpeg() {
        let png = noisy_png(128, 128);
        let target = TargetSize::new(20.0, SizeUnit::Kb);
        let artifact = resize_to_filesize(&png, target).unwrap();

        assert_eq!(artifact.mime_type, MIME_JPEG);
        assert_eq!(artifact.filename, "resized.jpg");
        assert!(artifact.len() as u64 <= target.bytes());
    }

    #[test]
    fn test_filesize_never_grows() {
        let png = noisy_png(64, 64);
        let artifact = resize_to_filesize(&png, TargetSize::new(0.0, SizeUnit::Kb)).unwrap();
        assert!(artifact.len() <= png.len());
    }

    #[test]
    fn test_filesize_rejects_garbage() {
        assert!(matches!(
            resize_to_filesize(b"garbage", TargetSize::new(1.0, SizeUnit::Kb)),
            Err(ToolError::ImageDecode(_))
        ));
    }
}
