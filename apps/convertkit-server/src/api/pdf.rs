//! PDF endpoints

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Response,
};
use convertkit_core::pdf::build::images_to_pdf;
use convertkit_core::pdf::compress::compress_pdf;
use convertkit_core::pdf::merge::merge_documents;
use convertkit_core::pdf::pages::delete_page;
use convertkit_core::pdf::security::{apply_security, SecurityAction};
use convertkit_core::pdf::watermark::{watermark_pdf, DEFAULT_WATERMARK_TEXT};
use convertkit_core::{pdf::raster::pdf_to_images, Artifact, PageImageFormat, SizeUnit, TargetSize};
use tracing::info;

use super::Endpoint;
use crate::error::ToolFailure;
use crate::pages::Page;
use crate::AppState;

const MERGE: Endpoint = Endpoint::new(Page::Pdf, "merging PDFs");
const DELETE_PAGE: Endpoint = Endpoint::new(Page::Pdf, "deleting page");
const TO_IMAGES: Endpoint = Endpoint::new(Page::Pdf, "converting PDF to images");
const FROM_IMAGES: Endpoint = Endpoint::new(Page::Pdf, "converting images to PDF");
const WATERMARK: Endpoint = Endpoint::new(Page::Pdf, "watermarking PDF");
const ENCRYPT: Endpoint = Endpoint::new(Page::Pdf, "with encryption");
const COMPRESS: Endpoint = Endpoint::new(Page::Pdf, "compressing PDF");

type Upload = Result<Multipart, MultipartRejection>;

/// Handler: POST /api/pdf/merge/
pub async fn handle_merge(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = MERGE.read_form(upload).await? else {
        return Ok(MERGE.redirect());
    };
    let pdfs = form.files("pdfs");
    if pdfs.is_empty() {
        return Ok(MERGE.redirect());
    }

    info!(
        count = pdfs.len(),
        bytes = form.total_file_bytes("pdfs"),
        "Merging PDFs"
    );
    MERGE
        .run(&state, move || {
            merge_documents(pdfs).map(|data| Artifact::pdf(data, "merged.pdf"))
        })
        .await
}

/// Handler: POST /api/pdf/delete-page/
pub async fn handle_delete_page(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = DELETE_PAGE.read_form(upload).await? else {
        return Ok(DELETE_PAGE.redirect());
    };
    let Some(pdf) = form.file("pdf") else {
        return Ok(DELETE_PAGE.redirect());
    };

    // Negative or oversized numbers become 0, which matches no page
    let page_number = u32::try_from(form.parse_or("page_num", 1i64)).unwrap_or(0);
    info!(file = %pdf.label(), page_number, "Deleting page");

    let bytes = pdf.data.clone();
    DELETE_PAGE
        .run(&state, move || {
            delete_page(&bytes, page_number).map(|data| Artifact::pdf(data, "edited.pdf"))
        })
        .await
}

/// Handler: POST /api/pdf/to-images/
pub async fn handle_pdf_to_images(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = TO_IMAGES.read_form(upload).await? else {
        return Ok(TO_IMAGES.redirect());
    };
    let Some(pdf) = form.file("pdf") else {
        return Ok(TO_IMAGES.redirect());
    };

    let format = PageImageFormat::from_form(form.text_or("format", "png"));
    info!(file = %pdf.label(), ?format, "Converting PDF to images");

    let bytes = pdf.data.clone();
    let rasterizer = state.rasterizer.clone();
    TO_IMAGES
        .run(&state, move || pdf_to_images(rasterizer.as_ref(), &bytes, format))
        .await
}

/// Handler: POST /api/images/to-pdf/
pub async fn handle_images_to_pdf(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = FROM_IMAGES.read_form(upload).await? else {
        return Ok(FROM_IMAGES.redirect());
    };
    let images = form.files("images");
    if images.is_empty() {
        return Ok(FROM_IMAGES.redirect());
    }

    info!(
        count = images.len(),
        bytes = form.total_file_bytes("images"),
        "Converting images to PDF"
    );
    FROM_IMAGES
        .run(&state, move || images_to_pdf(&images))
        .await
}

/// Handler: POST /api/pdf/watermark/
pub async fn handle_watermark(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = WATERMARK.read_form(upload).await? else {
        return Ok(WATERMARK.redirect());
    };
    let Some(pdf) = form.file("pdf") else {
        return Ok(WATERMARK.redirect());
    };

    let text = form.text_or("text", DEFAULT_WATERMARK_TEXT).to_string();
    info!(file = %pdf.label(), text = %text, "Watermarking PDF");

    let bytes = pdf.data.clone();
    WATERMARK
        .run(&state, move || watermark_pdf(&bytes, &text))
        .await
}

/// Handler: POST /api/pdf/encrypt/
pub async fn handle_encrypt(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = ENCRYPT.read_form(upload).await? else {
        return Ok(ENCRYPT.redirect());
    };
    let Some(pdf) = form.file("pdf") else {
        return Ok(ENCRYPT.redirect());
    };

    let password = form.raw_text("password").unwrap_or_default().to_string();
    let action = SecurityAction::from_form(form.text_or("action", "encrypt"));
    info!(file = %pdf.label(), ?action, "Applying PDF security");

    let bytes = pdf.data.clone();
    ENCRYPT
        .run(&state, move || apply_security(&bytes, &password, action))
        .await
}

/// Handler: POST /api/pdf/compress/
pub async fn handle_compress(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = COMPRESS.read_form(upload).await? else {
        return Ok(COMPRESS.redirect());
    };
    let Some(pdf) = form.file("pdf") else {
        return Ok(COMPRESS.redirect());
    };

    let target = TargetSize::new(
        form.parse_or("size", 1.0),
        SizeUnit::from_form(form.text_or("unit", "mb")),
    );
    info!(
        file = %pdf.label(),
        input = pdf.data.len(),
        target_bytes = target.bytes(),
        "Compressing PDF"
    );

    let bytes = pdf.data.clone();
    let rasterizer = state.rasterizer.clone();
    COMPRESS
        .run(&state, move || compress_pdf(rasterizer.as_ref(), &bytes, target))
        .await
}
