use image::DynamicImage;

use super::encode::encode_png;
use crate::artifact::Artifact;
use crate::error::{ToolError, ToolResult};

/// Requested crop edges in pixels, as submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Default for CropBox {
    fn default() -> Self {
        Self {
            left: 0,
            top: 0,
            right: 100,
            bottom: 100,
        }
    }
}

/// Crop edges after clamping; always a non-empty region inside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    /// Clamp into a `width` x `height` image with at least one pixel each way.
    /// The image itself must be non-empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> CropRegion {
        let (w, h) = (width as i64, height as i64);

        let left = self.left.clamp(0, (w - 1).max(0));
        let top = self.top.clamp(0, (h - 1).max(0));
        let right = self.right.clamp(left + 1, w.max(left + 1));
        let bottom = self.bottom.clamp(top + 1, h.max(top + 1));

        CropRegion {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }
}

/// Operation: crop to `bounds`, PNG out
pub fn crop_image(img: &DynamicImage, bounds: CropBox) -> ToolResult<Artifact> {
    if img.width() == 0 || img.height() == 0 {
        return Err(ToolError::InvalidInput("Image has no pixels".into()));
    }

    let region = bounds.clamp_to(img.width(), img.height());
    let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
    Ok(Artifact::png(encode_png(&cropped)?, "cropped.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::encode::decode_image;
    use image::{GenericImageView, Rgb, RgbImage};
    use proptest::prelude::*;

    #[test]
    fn test_default_box() {
        assert_eq!(
            CropBox::default(),
            CropBox {
                left: 0,
                top: 0,
                right: 100,
                bottom: 100
            }
        );
    }

    #[test]
    fn test_clamp_inside_bounds_untouched() {
        let region = CropBox {
            left: 10,
            top: 5,
            right: 30,
            bottom: 25,
        }
        .clamp_to(100, 100);
        assert_eq!(
            region,
            CropRegion {
                x: 10,
                y: 5,
                width: 20,
                height: 20
            }
        );
    }

    #[test]
    fn test_clamp_oversized_box() {
        let region = CropBox::default().clamp_to(40, 30);
        assert_eq!(
            region,
            CropRegion {
                x: 0,
                y: 0,
                width: 40,
                height: 30
            }
        );
    }

    #[test]
    fn test_clamp_inverted_box_is_one_pixel() {
        let region = CropBox {
            left: 50,
            top: 50,
            right: 10,
            bottom: 10,
        }
        .clamp_to(20, 20);
        assert_eq!(
            region,
            CropRegion {
                x: 19,
                y: 19,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn test_crop_keeps_pixels() {
        let img = RgbImage::from_fn(10, 10, |x, y| Rgb([x as u8 * 20, y as u8 * 20, 0]));
        let artifact = crop_image(
            &DynamicImage::ImageRgb8(img),
            CropBox {
                left: 2,
                top: 3,
                right: 6,
                bottom: 8,
            },
        )
        .unwrap();
        assert_eq!(artifact.filename, "cropped.png");

        let out = decode_image(&artifact.data).unwrap();
        assert_eq!(out.dimensions(), (4, 5));
        assert_eq!(out.to_rgb8().get_pixel(0, 0), &Rgb([40, 60, 0]));
    }

    proptest! {
        #[test]
        fn clamped_region_stays_inside_image(
            width in 1u32..500,
            height in 1u32..500,
            left in -1000i64..1000,
            top in -1000i64..1000,
            right in -1000i64..1000,
            bottom in -1000i64..1000,
        ) {
            let region = CropBox { left, top, right, bottom }.clamp_to(width, height);

            prop_assert!(region.width >= 1);
            prop_assert!(region.height >= 1);
            prop_assert!(region.x + region.width <= width);
            prop_assert!(region.y + region.height <= height);
        }
    }
}
