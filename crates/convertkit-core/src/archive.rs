//! ZIP packaging for multi-file outputs

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::error::ToolResult;

/// Pack named entries into an in-memory ZIP, in iteration order
///
/// Already-compressed payloads (PNG, JPEG) are stored rather than deflated.
pub fn zip_entries<I, N>(entries: I) -> ToolResult<Vec<u8>>
where
    I: IntoIterator<Item = (N, Vec<u8>)>,
    N: Into<String>,
{
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, data) in entries {
        zip.start_file(name.into(), options)?;
        zip.write_all(&data)?;
    }

    Ok(zip.finish()?.into_inner())
}
