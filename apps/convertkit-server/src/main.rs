//! convertkit server
//!
//! Serves three HTML pages of upload forms and one POST endpoint per
//! conversion. Each endpoint reads a multipart form, runs the conversion from
//! `convertkit-core` on the blocking pool, and answers with the result as a
//! download, or re-renders the originating page with the error.
//!
//! ## Architecture
//!
//! - Rate limiting via tower-governor (optional)
//! - Request tracing via tower-http
//! - One shared PDF rasterizer, picked at startup

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use convertkit_core::{detect_rasterizer, PdfRasterizer};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod form;
mod pages;
mod routes;

/// Command-line arguments for the convertkit server
#[derive(Parser, Debug)]
#[command(name = "convertkit-server")]
#[command(about = "Web front-end for PDF and image conversion utilities")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "CONVERTKIT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Conversion timeout in milliseconds
    #[arg(long, env = "CONVERTKIT_TIMEOUT_MS", default_value = "120000")]
    timeout_ms: u64,

    /// Largest accepted request body in megabytes
    #[arg(long, env = "CONVERTKIT_MAX_UPLOAD_MB", default_value = "100")]
    max_upload_mb: usize,

    /// Rate limit: requests per second per IP (0 disables)
    #[arg(long, env = "CONVERTKIT_RATE_LIMIT", default_value = "0")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Backend used by PDF-to-images and PDF compression
    pub rasterizer: Arc<dyn PdfRasterizer>,
    /// Conversion timeout in milliseconds
    pub timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting convertkit server on {}:{}", args.host, args.port);

    let state = AppState {
        rasterizer: detect_rasterizer(),
        timeout_ms: args.timeout_ms,
    };
    info!("PDF rasterizer: {}", state.rasterizer.name());

    let max_upload_bytes = args.max_upload_mb.saturating_mul(1024 * 1024);
    let mut app = routes::router(state, max_upload_bytes);

    if args.rate_limit > 0 {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(args.rate_limit.into())
                .burst_size(args.rate_limit.saturating_mul(2))
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limit: {}", args.rate_limit))?,
        );
        app = app.layer(GovernorLayer {
            config: governor_conf,
        });
        info!("Rate limit: {} requests/second per IP", args.rate_limit);
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Conversion timeout: {}ms", args.timeout_ms);
    info!("Upload limit: {} MB", args.max_upload_mb);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
