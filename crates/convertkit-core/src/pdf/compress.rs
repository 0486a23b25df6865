//! Compress a PDF toward a target size
//!
//! The first preset is a lossless rewrite. The rest rebuild the document
//! from rasterized pages, stepping DPI down and, within each DPI, JPEG
//! quality down. Pages are rendered once per DPI.

use std::fmt;

use tracing::{info, warn};

use super::build::{pages_to_pdf, ImageEncoding, PageImage};
use super::raster::PdfRasterizer;
use super::{load_document, save_document};
use crate::artifact::Artifact;
use crate::error::{ToolError, ToolResult};
use crate::size_search::{
    search_under_target, SearchOutcome, TargetSize, PDF_DPI_PRESETS, PDF_QUALITY_PRESETS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPreset {
    /// Object pruning and stream compression, content untouched
    Lossless,
    /// Rebuild from page bitmaps
    Raster { dpi: u32, quality: u8 },
}

impl fmt::Display for CompressionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionPreset::Lossless => write!(f, "lossless"),
            CompressionPreset::Raster { dpi, quality } => {
                write!(f, "{} dpi @ quality {}", dpi, quality)
            }
        }
    }
}

/// Presets in descending quality order
pub fn compression_presets(rasterize: bool) -> Vec<CompressionPreset> {
    let mut presets = vec![CompressionPreset::Lossless];
    if rasterize {
        for dpi in PDF_DPI_PRESETS {
            for quality in PDF_QUALITY_PRESETS {
                presets.push(CompressionPreset::Raster { dpi, quality });
            }
        }
    }
    presets
}

/// Lossless structural rewrite
pub fn rewrite_lossless(bytes: &[u8]) -> ToolResult<Vec<u8>> {
    let mut doc = load_document(bytes)?;
    doc.prune_objects();
    doc.delete_zero_length_streams();
    doc.compress();
    save_document(&mut doc)
}

/// Operation: shrink `bytes` to `target` if any preset allows it
pub fn compress_pdf(
    rasterizer: &dyn PdfRasterizer,
    bytes: &[u8],
    target: TargetSize,
) -> ToolResult<Artifact> {
    // Reject non-PDF input up front; the search would otherwise echo it back
    load_document(bytes)?;

    let target_bytes = target.bytes();
    let rasterize = rasterizer.renders_content();
    if !rasterize && bytes.len() as u64 > target_bytes {
        warn!(
            backend = rasterizer.name(),
            "No rendering backend, only lossless compression is available"
        );
    }

    let presets = compression_presets(rasterize);
    let mut rendered: Option<(u32, Result<Vec<PageImage>, String>)> = None;

    let result = search_under_target(bytes, target_bytes, &presets, |preset| match preset {
        CompressionPreset::Lossless => rewrite_lossless(bytes),
        CompressionPreset::Raster { dpi, quality } => {
            let stale = rendered.as_ref().map_or(true, |(cached_dpi, _)| *cached_dpi != dpi);
            if stale {
                let pages = rasterizer
                    .render_pages(bytes, dpi)
                    .map_err(|e| e.to_string());
                rendered = Some((dpi, pages));
            }
            match rendered.as_ref().map(|(_, pages)| pages) {
                Some(Ok(pages)) => pages_to_pdf(pages, ImageEncoding::Jpeg(quality)),
                Some(Err(e)) => Err(ToolError::OperationError(e.clone())),
                None => Err(ToolError::OperationError("No rendered pages".into())),
            }
        }
    });

    match result.outcome {
        SearchOutcome::AlreadyUnderTarget => info!("PDF already under target size"),
        SearchOutcome::Reached(preset) => info!(%preset, size = result.data.len(), "PDF compressed to target"),
        SearchOutcome::Smallest(preset) => info!(
            %preset,
            size = result.data.len(),
            target_bytes,
            "Target unreachable, returning smallest result"
        ),
        SearchOutcome::Unchanged => info!("No preset beat the original, returning it unchanged"),
    }

    Ok(Artifact::pdf(result.data, "compressed.pdf"))
}
