//! Image endpoints

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Response,
};
use convertkit_core::imaging::collage::{create_collage, DEFAULT_COLUMNS, DEFAULT_SPACING};
use convertkit_core::imaging::compress::{compress_image, DEFAULT_QUALITY};
use convertkit_core::imaging::crop::{crop_image, CropBox};
use convertkit_core::imaging::encode::{decode_image, decode_image_data};
use convertkit_core::imaging::resize::{
    resize_pixels, resize_to_filesize, DEFAULT_HEIGHT, DEFAULT_WIDTH,
};
use convertkit_core::{SizeUnit, TargetSize};
use tracing::info;

use super::Endpoint;
use crate::error::{ServerError, ToolFailure};
use crate::pages::Page;
use crate::AppState;

const RESIZE: Endpoint = Endpoint::new(Page::Images, "resizing image");
const CROP: Endpoint = Endpoint::new(Page::Images, "cropping image");
const COMPRESS: Endpoint = Endpoint::new(Page::Images, "compressing image");
const COLLAGE: Endpoint = Endpoint::new(Page::Images, "creating collage");

type Upload = Result<Multipart, MultipartRejection>;

/// Non-positive or oversized dimensions become 0, which is rejected as invalid
fn dimension(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Handler: POST /api/image/resize-pixels/
pub async fn handle_resize_pixels(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = RESIZE.read_form(upload).await? else {
        return Ok(RESIZE.redirect());
    };
    let Some(image) = form.file("image") else {
        return Ok(RESIZE.redirect());
    };

    let width = dimension(form.parse_or("width", DEFAULT_WIDTH as i64));
    let height = dimension(form.parse_or("height", DEFAULT_HEIGHT as i64));
    info!(file = %image.label(), width, height, "Resizing image");

    let bytes = image.data.clone();
    RESIZE
        .run(&state, move || resize_pixels(&bytes, width, height))
        .await
}

/// Handler: POST /api/image/resize-filesize/
pub async fn handle_resize_filesize(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = RESIZE.read_form(upload).await? else {
        return Ok(RESIZE.redirect());
    };
    let Some(image) = form.file("image") else {
        return Ok(RESIZE.redirect());
    };

    let target = TargetSize::new(
        form.parse_or("size", 1.0),
        SizeUnit::from_form(form.text_or("unit", "kb")),
    );
    info!(
        file = %image.label(),
        input = image.data.len(),
        target_bytes = target.bytes(),
        "Resizing image to file size"
    );

    let bytes = image.data.clone();
    RESIZE
        .run(&state, move || resize_to_filesize(&bytes, target))
        .await
}

/// Handler: POST /api/image/crop/
///
/// Accepts base64 `image_data` from the in-page crop editor, or an uploaded
/// `image`. `image_data` wins when both are present.
pub async fn handle_crop(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = CROP.read_form(upload).await? else {
        return Ok(CROP.redirect());
    };

    let defaults = CropBox::default();
    let bounds = CropBox {
        left: form.truncated_or("left", defaults.left),
        top: form.truncated_or("top", defaults.top),
        right: form.truncated_or("right", defaults.right),
        bottom: form.truncated_or("bottom", defaults.bottom),
    };

    enum Source {
        Data(String),
        File(Vec<u8>),
    }
    let source = match (form.text("image_data"), form.file("image")) {
        (Some(data), _) => Source::Data(data.to_string()),
        (None, Some(image)) => Source::File(image.data.clone()),
        (None, None) => return Err(CROP.fail(ServerError::MissingInput("No image provided"))),
    };
    info!(?bounds, "Cropping image");

    CROP.run(&state, move || {
        let img = match source {
            Source::Data(data) => decode_image_data(&data)?,
            Source::File(bytes) => decode_image(&bytes)?,
        };
        crop_image(&img, bounds)
    })
    .await
}

/// Handler: POST /api/image/compress/
pub async fn handle_compress(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = COMPRESS.read_form(upload).await? else {
        return Ok(COMPRESS.redirect());
    };
    let Some(image) = form.file("image") else {
        return Ok(COMPRESS.redirect());
    };

    let quality = form.parse_or("quality", DEFAULT_QUALITY);
    info!(file = %image.label(), quality, "Compressing image");

    let bytes = image.data.clone();
    COMPRESS
        .run(&state, move || compress_image(&bytes, quality))
        .await
}

/// Handler: POST /api/image/collage/
pub async fn handle_collage(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Response, ToolFailure> {
    let Some(form) = COLLAGE.read_form(upload).await? else {
        return Ok(COLLAGE.redirect());
    };
    let images = form.files("images");
    if images.is_empty() {
        return Ok(COLLAGE.redirect());
    }

    let columns = form
        .parse_or("cols", DEFAULT_COLUMNS as i64)
        .clamp(1, u32::MAX as i64) as u32;
    let spacing = form
        .parse_or("spacing", DEFAULT_SPACING as i64)
        .clamp(0, u32::MAX as i64) as u32;
    info!(count = images.len(), columns, spacing, "Creating collage");

    COLLAGE
        .run(&state, move || create_collage(&images, columns, spacing))
        .await
}
