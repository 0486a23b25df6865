use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{handle_health, image, pdf};
use crate::pages::{image_tools, index, pdf_tools, to_image_tools, to_pdf_tools};
use crate::AppState;

/// Build the full application router
///
/// Conversion endpoints answer GET with a redirect to their page.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Pages
        .route("/", get(index))
        .route("/pdf/", get(pdf_tools))
        .route("/images/", get(image_tools))
        .route("/health", get(handle_health))
        // PDF operations
        .route(
            "/api/pdf/merge/",
            get(to_pdf_tools).post(pdf::handle_merge),
        )
        .route(
            "/api/pdf/delete-page/",
            get(to_pdf_tools).post(pdf::handle_delete_page),
        )
        .route(
            "/api/pdf/to-images/",
            get(to_pdf_tools).post(pdf::handle_pdf_to_images),
        )
        .route(
            "/api/images/to-pdf/",
            get(to_pdf_tools).post(pdf::handle_images_to_pdf),
        )
        .route(
            "/api/pdf/watermark/",
            get(to_pdf_tools).post(pdf::handle_watermark),
        )
        .route(
            "/api/pdf/encrypt/",
            get(to_pdf_tools).post(pdf::handle_encrypt),
        )
        .route(
            "/api/pdf/compress/",
            get(to_pdf_tools).post(pdf::handle_compress),
        )
        // Image operations
        .route(
            "/api/image/resize-pixels/",
            get(to_image_tools).post(image::handle_resize_pixels),
        )
        .route(
            "/api/image/resize-filesize/",
            get(to_image_tools).post(image::handle_resize_filesize),
        )
        .route(
            "/api/image/crop/",
            get(to_image_tools).post(image::handle_crop),
        )
        .route(
            "/api/image/compress/",
            get(to_image_tools).post(image::handle_compress),
        )
        .route(
            "/api/image/collage/",
            get(to_image_tools).post(image::handle_collage),
        )
        // Apply middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
