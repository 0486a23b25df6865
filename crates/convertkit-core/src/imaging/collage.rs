//! Grid collage of uploaded images

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use super::encode::{decode_image, encode_png};
use super::MAX_OUTPUT_PIXELS;
use crate::artifact::Artifact;
use crate::error::{ToolError, ToolResult};

/// Side of each square tile in pixels
pub const TILE_SIZE: u32 = 200;
pub const DEFAULT_COLUMNS: u32 = 2;
pub const DEFAULT_SPACING: u32 = 5;
pub const BACKGROUND: Rgb<u8> = Rgb([50, 50, 50]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollageLayout {
    pub columns: u32,
    pub rows: u32,
    pub spacing: u32,
}

impl CollageLayout {
    /// Layout for `count` tiles; fewer than one column is treated as one
    pub fn new(count: usize, columns: u32, spacing: u32) -> ToolResult<Self> {
        if count == 0 {
            return Err(ToolError::InvalidInput("No images provided".into()));
        }
        let columns = columns.max(1);
        let rows = (count as u64).div_ceil(columns as u64);
        let rows = u32::try_from(rows)
            .map_err(|_| ToolError::InvalidInput("Too many images for one collage".into()))?;

        let layout = Self {
            columns,
            rows,
            spacing,
        };
        let (w, h) = layout.canvas_size_u64();
        if w > u32::MAX as u64 || h > u32::MAX as u64 || w * h > MAX_OUTPUT_PIXELS {
            return Err(ToolError::InvalidInput(format!(
                "Collage of {}x{} pixels is too large",
                w, h
            )));
        }
        Ok(layout)
    }

    fn canvas_size_u64(&self) -> (u64, u64) {
        let span = |n: u32| {
            n as u64 * TILE_SIZE as u64 + (n as u64).saturating_sub(1) * self.spacing as u64
        };
        (span(self.columns), span(self.rows))
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        let (w, h) = self.canvas_size_u64();
        (w as u32, h as u32)
    }

    /// Top-left corner of tile `index`, filled row by row
    pub fn position(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        let col = index % self.columns;
        let row = index / self.columns;
        let step = TILE_SIZE + self.spacing;
        (col * step, row * step)
    }
}

/// Operation: tile every image at 200x200 on a dark grid, PNG out
pub fn create_collage(uploads: &[Vec<u8>], columns: u32, spacing: u32) -> ToolResult<Artifact> {
    let layout = CollageLayout::new(uploads.len(), columns, spacing)?;
    let (width, height) = layout.canvas_size();
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    for (i, bytes) in uploads.iter().enumerate() {
        let tile = decode_image(bytes)?
            .resize_exact(TILE_SIZE, TILE_SIZE, FilterType::Lanczos3)
            .to_rgb8();
        let (x, y) = layout.position(i);
        imageops::replace(&mut canvas, &tile, x as i64, y as i64);
    }

    Ok(Artifact::png(
        encode_png(&image::DynamicImage::ImageRgb8(canvas))?,
        "collage.png",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn solid(color: [u8; 3]) -> Vec<u8> {
        encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
            30,
            20,
            Rgb(color),
        )))
        .unwrap()
    }

    #[test]
    fn test_three_images_two_columns() {
        let uploads = vec![solid([255, 0, 0]), solid([0, 255, 0]), solid([0, 0, 255])];
        let artifact = create_collage(&uploads, 2, 5).unwrap();
        assert_eq!(artifact.filename, "collage.png");

        let out = decode_image(&artifact.data).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (405, 405));

        assert_eq!(out.get_pixel(100, 100), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(305, 100), &Rgb([0, 255, 0]));
        assert_eq!(out.get_pixel(100, 305), &Rgb([0, 0, 255]));
        // gutter and the empty fourth cell
        assert_eq!(out.get_pixel(202, 100), &BACKGROUND);
        assert_eq!(out.get_pixel(305, 305), &BACKGROUND);
    }

    #[test]
    fn test_zero_columns_means_one() {
        let layout = CollageLayout::new(3, 0, 5).unwrap();
        assert_eq!(layout.columns, 1);
        assert_eq!(layout.rows, 3);
        assert_eq!(layout.canvas_size(), (200, 610));
    }

    #[test]
    fn test_empty_upload_list_fails() {
        assert!(matches!(
            create_collage(&[], 2, 5),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_oversized_layout_rejected() {
        assert!(CollageLayout::new(4, 2, 1_000_000).is_err());
    }

    #[test]
    fn test_bad_image_fails() {
        let result = create_collage(&[solid([1, 2, 3]), b"nope".to_vec()], 2, 0);
        assert!(matches!(result, Err(ToolError::ImageDecode(_))));
    }

    #[test]
    fn test_single_image_no_spacing() {
        let artifact = create_collage(&[solid([9, 9, 9])], 4, 5).unwrap();
        let out = decode_image(&artifact.data).unwrap();
        // four columns even with one image
        assert_eq!(out.dimensions(), (815, 200));
    }

    proptest! {
        #[test]
        fn layout_matches_grid_formula(
            count in 1usize..40,
            columns in 0u32..8,
            spacing in 0u32..50,
        ) {
            let layout = CollageLayout::new(count, columns, spacing).unwrap();
            let cols = columns.max(1);
            let rows = (count as u32 + cols - 1) / cols;

            prop_assert_eq!(layout.rows, rows);
            prop_assert_eq!(
                layout.canvas_size(),
                (cols * 200 + (cols - 1) * spacing, rows * 200 + (rows - 1) * spacing)
            );

            let (w, h) = layout.canvas_size();
            for i in 0..count {
                let (x, y) = layout.position(i);
                prop_assert!(x + TILE_SIZE <= w);
                prop_assert!(y + TILE_SIZE <= h);
                prop_assert_eq!(x / (TILE_SIZE + spacing), i as u32 % cols);
                prop_assert_eq!(y / (TILE_SIZE + spacing), i as u32 / cols);
            }
        }
    }
}
