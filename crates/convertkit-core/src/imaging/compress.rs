use super::encode::{decode_image, encode_jpeg};
use crate::artifact::Artifact;
use crate::error::ToolResult;

pub const DEFAULT_QUALITY: i64 = 75;

/// Operation: re-encode as JPEG, quality clamped to 1..=100
pub fn compress_image(bytes: &[u8], quality: i64) -> ToolResult<Artifact> {
    let img = decode_image(bytes)?;
    let quality = quality.clamp(1, 100) as u8;
    Ok(Artifact::jpeg(encode_jpeg(&img, quality)?, "compressed.jpg"))
}
