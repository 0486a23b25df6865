//! PDF rasterization backends
//!
//! pdfium is loaded dynamically at startup. When it cannot be found the
//! placeholder backend takes over: it emits white pages of the right size,
//! each stamped with its page number, so PDF-to-images still produces a
//! usable archive, and callers that need real
//! pixels (compression) can check [`PdfRasterizer::renders_content`].

use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::warn;

use super::build::PageImage;
use super::{load_document, page_size_points};
use crate::archive::zip_entries;
use crate::artifact::{Artifact, MIME_ZIP};
use crate::error::{ToolError, ToolResult};
use crate::imaging::encode::{encode_jpeg, encode_png};

/// Resolution used for PDF-to-images
pub const EXPORT_DPI: u32 = 200;

/// JPEG quality for exported page images
pub const EXPORT_JPEG_QUALITY: u8 = 95;

/// Upper bound on either side of a rendered page
pub const MAX_RENDER_DIMENSION: u32 = 10_000;

pub const PDFIUM_INSTALL_HINT: &str =
    "PDF rendering requires the pdfium library. Place libpdfium next to the server binary, in ./lib, or install it system-wide.";

pub trait PdfRasterizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// False for backends that only reproduce page geometry
    fn renders_content(&self) -> bool;

    /// Render every page at `dpi`, in page order
    fn render_pages(&self, pdf_bytes: &[u8], dpi: u32) -> ToolResult<Vec<PageImage>>;
}

/// Convert a length in points to pixels at `dpi`, at least one pixel
pub fn points_to_pixels(points: f32, dpi: u32) -> u32 {
    let pixels = (points / 72.0 * dpi as f32).round();
    (pixels.max(1.0) as u32).min(MAX_RENDER_DIMENSION)
}

/// Pick the best available backend
pub fn detect_rasterizer() -> Arc<dyn PdfRasterizer> {
    #[cfg(feature = "pdfium")]
    match pdfium_backend::PdfiumRasterizer::bind() {
        Ok(rasterizer) => {
            tracing::info!("PDF rasterizer: pdfium");
            return Arc::new(rasterizer);
        }
        Err(e) => warn!("pdfium unavailable, falling back to placeholder pages: {}", e),
    }

    #[cfg(not(feature = "pdfium"))]
    warn!("Built without pdfium, falling back to placeholder pages");

    Arc::new(PlaceholderRasterizer)
}

/// 3x5 digit bitmaps, one row per entry, leftmost column in the high bit
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Draw `page_number` in black near the top-left corner, scaled with `dpi`
fn stamp_page_number(image: &mut RgbImage, page_number: usize, dpi: u32) {
    let cell = (dpi / 36).max(1);
    let margin = cell * 4;

    for (i, digit) in page_number.to_string().bytes().enumerate() {
        let glyph = DIGIT_GLYPHS[usize::from(digit - b'0')];
        let left = margin + i as u32 * cell * 4;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..3u32 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                let x = left + col * cell;
                let y = margin + row as u32 * cell;
                let rect = Rect::at(x as i32, y as i32).of_size(cell, cell);
                draw_filled_rect_mut(image, rect, Rgb([0, 0, 0]));
            }
        }
    }
}

/// White pages sized from each page's MediaBox, numbered in the corner
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRasterizer;

impl PdfRasterizer for PlaceholderRasterizer {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn renders_content(&self) -> bool {
        false
    }

    fn render_pages(&self, pdf_bytes: &[u8], dpi: u32) -> ToolResult<Vec<PageImage>> {
        let doc = load_document(pdf_bytes).map_err(|e| {
            ToolError::BackendUnavailable(format!("{} Details: {}", PDFIUM_INSTALL_HINT, e))
        })?;

        let pages: Vec<PageImage> = doc
            .get_pages()
            .into_values()
            .enumerate()
            .map(|(index, page_id)| {
                let (width_pt, height_pt) = page_size_points(&doc, page_id);
                let mut image = RgbImage::from_pixel(
                    points_to_pixels(width_pt, dpi),
                    points_to_pixels(height_pt, dpi),
                    Rgb([255, 255, 255]),
                );
                stamp_page_number(&mut image, index + 1, dpi);
                PageImage {
                    image: DynamicImage::ImageRgb8(image),
                    width_pt,
                    height_pt,
                }
            })
            .collect();

        if pages.is_empty() {
            return Err(ToolError::InvalidInput(
                "Could not extract pages from PDF".into(),
            ));
        }
        Ok(pages)
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    use std::sync::Mutex;

    use pdfium_render::prelude::*;

    use super::{points_to_pixels, PdfRasterizer, PDFIUM_INSTALL_HINT};
    use crate::error::{ToolError, ToolResult};
    use crate::pdf::build::PageImage;

    /// pdfium keeps global library state; one render at a time
    static RENDER_LOCK: Mutex<()> = Mutex::new(());

    /// Locations probed for libpdfium, in order, before the system path
    const SEARCH_PATHS: [&str; 2] = ["./", "./lib"];

    /// Renders with pdfium. Bindings are created per call so nothing
    /// non-`Send` is held across threads.
    #[derive(Debug)]
    pub struct PdfiumRasterizer;

    impl PdfiumRasterizer {
        /// Verify that pdfium can be bound
        pub fn bind() -> ToolResult<Self> {
            let _guard = RENDER_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            create_pdfium()?;
            Ok(Self)
        }
    }

    fn create_pdfium() -> ToolResult<Pdfium> {
        let bindings = SEARCH_PATHS
            .iter()
            .find_map(|path| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path)).ok()
            })
            .map(Ok)
            .unwrap_or_else(Pdfium::bind_to_system_library)
            .map_err(|e| {
                ToolError::BackendUnavailable(format!("{} ({:?})", PDFIUM_INSTALL_HINT, e))
            })?;
        Ok(Pdfium::new(bindings))
    }

    impl PdfRasterizer for PdfiumRasterizer {
        fn name(&self) -> &'static str {
            "pdfium"
        }

        fn renders_content(&self) -> bool {
            true
        }

        fn render_pages(&self, pdf_bytes: &[u8], dpi: u32) -> ToolResult<Vec<PageImage>> {
            let _guard = RENDER_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let pdfium = create_pdfium()?;

            let document = pdfium
                .load_pdf_from_byte_slice(pdf_bytes, None)
                .map_err(|e| ToolError::ParseError(format!("{:?}", e)))?;

            let mut pages = Vec::new();
            for (index, page) in document.pages().iter().enumerate() {
                let width_pt = page.width().value;
                let height_pt = page.height().value;

                let config = PdfRenderConfig::new()
                    .set_target_width(points_to_pixels(width_pt, dpi) as i32)
                    .set_target_height(points_to_pixels(height_pt, dpi) as i32);

                let bitmap = page.render_with_config(&config).map_err(|e| {
                    ToolError::OperationError(format!(
                        "Failed to render page {}: {:?}",
                        index + 1,
                        e
                    ))
                })?;

                pages.push(PageImage {
                    image: bitmap.as_image(),
                    width_pt,
                    height_pt,
                });
            }

            Ok(pages)
        }
    }
}

/// Output format for exported page images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl PageImageFormat {
    pub fn from_form(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "jpg" | "jpeg" => PageImageFormat::Jpeg,
            _ => PageImageFormat::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            PageImageFormat::Png => "png",
            PageImageFormat::Jpeg => "jpg",
        }
    }

    fn encode(self, image: &DynamicImage) -> ToolResult<Vec<u8>> {
        match self {
            PageImageFormat::Png => encode_png(image),
            PageImageFormat::Jpeg => encode_jpeg(image, EXPORT_JPEG_QUALITY),
        }
    }
}

/// Operation: render every page and pack them as `page_{n}.{ext}` in a ZIP
pub fn pdf_to_images(
    rasterizer: &dyn PdfRasterizer,
    pdf_bytes: &[u8],
    format: PageImageFormat,
) -> ToolResult<Artifact> {
    let pages = rasterizer.render_pages(pdf_bytes, EXPORT_DPI)?;
    if pages.is_empty() {
        return Err(ToolError::InvalidInput(
            "No images could be extracted from PDF".into(),
        ));
    }
    if !rasterizer.renders_content() {
        warn!(
            pages = pages.len(),
            "Exporting placeholder pages; install pdfium for real page images"
        );
    }

    let entries = pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let name = format!("page_{}.{}", i + 1, format.extension());
            format.encode(&page.image).map(|encoded| (name, encoded))
        })
        .collect::<ToolResult<Vec<_>>>()?;
    let data = zip_entries(entries)?;

    Ok(Artifact::new(data, MIME_ZIP, "pdf_images.zip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{create_sized_pdf, create_test_pdf};
    use std::io::{Cursor, Read};

    #[test]
    fn test_points_to_pixels() {
        assert_eq!(points_to_pixels(72.0, 200), 200);
        assert_eq!(points_to_pixels(612.0, 72), 612);
        assert_eq!(points_to_pixels(0.0, 300), 1);
        assert_eq!(points_to_pixels(1.0e9, 300), MAX_RENDER_DIMENSION);
    }

    #[test]
    fn test_placeholder_pages_match_media_box() {
        let pdf = create_sized_pdf(2, "Geo", 144, 72);
        let pages = PlaceholderRasterizer.render_pages(&pdf, 100).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!((pages[0].image.width(), pages[0].image.height()), (200, 100));
        assert_eq!((pages[0].width_pt, pages[0].height_pt), (144.0, 72.0));
    }

    #[test]
    fn test_placeholder_pages_are_numbered() {
        let pdf = create_test_pdf(2, "Num");
        let pages = PlaceholderRasterizer.render_pages(&pdf, 72).unwrap();
        let first = pages[0].image.to_rgb8();
        let second = pages[1].image.to_rgb8();

        assert_eq!(*first.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert!(first.pixels().any(|p| *p == Rgb([0, 0, 0])));
        assert_ne!(first, second);
    }

    #[test]
    fn test_stamp_draws_every_digit() {
        let mut image = RgbImage::from_pixel(200, 60, Rgb([255, 255, 255]));
        stamp_page_number(&mut image, 10, 72);

        let cell = 2;
        let margin = cell * 4;
        // "1" has its top row lit in the middle column only; "0" lights all three
        assert_eq!(*image.get_pixel(margin, margin), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(margin + cell, margin), Rgb([0, 0, 0]));
        let zero_left = margin + cell * 4;
        assert_eq!(*image.get_pixel(zero_left, margin), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(zero_left + cell, margin + cell), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_placeholder_reports_missing_backend_on_bad_input() {
        let err = PlaceholderRasterizer.render_pages(b"nope", 100).unwrap_err();
        assert!(matches!(err, ToolError::BackendUnavailable(_)));
        assert!(err.to_string().contains("pdfium"));
    }

    #[test]
    fn test_page_image_format_from_form() {
        assert_eq!(PageImageFormat::from_form("JPG"), PageImageFormat::Jpeg);
        assert_eq!(PageImageFormat::from_form("jpeg"), PageImageFormat::Jpeg);
        assert_eq!(PageImageFormat::from_form("png"), PageImageFormat::Png);
        assert_eq!(PageImageFormat::from_form("bmp"), PageImageFormat::Png);
    }

    #[test]
    fn test_pdf_to_images_zip_layout() {
        let pdf = create_test_pdf(3, "Zip");
        let artifact = pdf_to_images(&PlaceholderRasterizer, &pdf, PageImageFormat::Jpeg).unwrap();

        assert_eq!(artifact.mime_type, MIME_ZIP);
        assert_eq!(artifact.filename, "pdf_images.zip");

        let mut archive = zip::ZipArchive::new(Cursor::new(artifact.data)).unwrap();
        assert_eq!(archive.len(), 3);

        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["page_1.jpg", "page_2.jpg", "page_3.jpg"]);

        let mut first = Vec::new();
        archive.by_name("page_1.jpg").unwrap().read_to_end(&mut first).unwrap();
        assert_eq!(&first[0..2], &[0xFF, 0xD8]);
    }
}
