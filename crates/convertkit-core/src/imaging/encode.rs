use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::artifact::{MIME_JPEG, MIME_PNG};
use crate::error::{ToolError, ToolResult};

/// Decode an uploaded image, sniffing the format from its bytes
pub fn decode_image(bytes: &[u8]) -> ToolResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| ToolError::ImageDecode(e.to_string()))
}

/// Decode base64 image data, with or without a `data:image/...;base64,` prefix
pub fn decode_image_data(data: &str) -> ToolResult<DynamicImage> {
    let data = data.trim();
    let payload = if data.starts_with("data:image") {
        data.split_once(',').map(|(_, rest)| rest).unwrap_or_default()
    } else {
        data
    };

    let bytes = BASE64
        .decode(payload)
        .map_err(|e| ToolError::InvalidInput(format!("Invalid base64 image data: {}", e)))?;
    decode_image(&bytes)
}

pub fn encode_png(img: &DynamicImage) -> ToolResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ToolError::EncodeError(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Encode as baseline JPEG. Alpha and palette images are flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> ToolResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| ToolError::EncodeError(format!("JPEG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

/// MIME type and file extension for bytes we pass through untouched
pub fn sniff_image_type(bytes: &[u8]) -> (&'static str, &'static str) {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => (MIME_JPEG, "jpg"),
        Ok(ImageFormat::Png) => (MIME_PNG, "png"),
        Ok(ImageFormat::Gif) => ("image/gif", "gif"),
        Ok(ImageFormat::WebP) => ("image/webp", "webp"),
        Ok(ImageFormat::Bmp) => ("image/bmp", "bmp"),
        Ok(ImageFormat::Tiff) => ("image/tiff", "tiff"),
        _ => ("application/octet-stream", "bin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_encode_jpeg_magic() {
        let img = DynamicImage::new_rgb8(10, 10);
        let data = encode_jpeg(&img, 80).unwrap();
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_jpeg_flattens_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 0])));
        let data = encode_jpeg(&img, 90).unwrap();
        let decoded = decode_image(&data).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_encode_png_magic() {
        let img = DynamicImage::new_rgb8(10, 10);
        let data = encode_png(&img).unwrap();
        assert_eq!(&data[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(ToolError::ImageDecode(_))
        ));
    }

    #[test]
    fn test_decode_image_data_url() {
        let png = encode_png(&DynamicImage::new_rgb8(3, 2)).unwrap();
        let url = format!("data:image/png;base64,{}", BASE64.encode(&png));

        let img = decode_image_data(&url).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));

        let bare = decode_image_data(&BASE64.encode(&png)).unwrap();
        assert_eq!((bare.width(), bare.height()), (3, 2));
    }

    #[test]
    fn test_decode_image_data_rejects_bad_base64() {
        assert!(matches!(
            decode_image_data("data:image/png;base64,@@@"),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sniff_image_type() {
        let png = encode_png(&DynamicImage::new_rgb8(2, 2)).unwrap();
        assert_eq!(sniff_image_type(&png), (MIME_PNG, "png"));
        let jpg = encode_jpeg(&DynamicImage::new_rgb8(2, 2), 50).unwrap();
        assert_eq!(sniff_image_type(&jpg), (MIME_JPEG, "jpg"));
    }
}
