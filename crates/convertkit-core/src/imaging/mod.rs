//! Raster image operations built on the `image` crate

pub mod collage;
pub mod compress;
pub mod crop;
pub mod encode;
pub mod resize;

/// Largest canvas any operation will allocate, in pixels
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;
