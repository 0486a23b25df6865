//! PDF and image conversion operations
//!
//! Every operation takes uploaded bytes plus a few scalar parameters and
//! returns an [`Artifact`]: the output bytes with a MIME type and a download
//! name. Nothing here knows about HTTP.
//!
//! - `pdf`: merge, delete page, PDF to images, images to PDF, watermark,
//!   encrypt/decrypt, compress to a target size
//! - `imaging`: resize, resize to a target size, crop, compress, collage
//! - `size_search`: the shared quality-ladder search used by both
//!   "compress to target size" operations

pub mod archive;
pub mod artifact;
pub mod error;
pub mod imaging;
pub mod pdf;
pub mod size_search;

pub use artifact::Artifact;
pub use error::{ToolError, ToolResult};
pub use pdf::raster::{detect_rasterizer, PageImageFormat, PdfRasterizer, PlaceholderRasterizer};
pub use size_search::{search_under_target, SearchOutcome, SizeSearchResult, SizeUnit, TargetSize};
