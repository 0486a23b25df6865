//! Output artifacts returned to the caller as a single download

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_ZIP: &str = "application/zip";

/// Bytes produced by one operation, with the metadata needed to serve them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
}

impl Artifact {
    pub fn new(data: Vec<u8>, mime_type: &'static str, filename: impl Into<String>) -> Self {
        Self {
            data,
            mime_type,
            filename: filename.into(),
        }
    }

    pub fn pdf(data: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::new(data, MIME_PDF, filename)
    }

    pub fn png(data: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::new(data, MIME_PNG, filename)
    }

    pub fn jpeg(data: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::new(data, MIME_JPEG, filename)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value for the `Content-Disposition` header
    pub fn content_disposition(&self) -> String {
        let safe: String = self
            .filename
            .chars()
            .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
            .collect();
        format!("attachment; filename=\"{}\"", safe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_quotes_filename() {
        let artifact = Artifact::pdf(vec![1, 2, 3], "merged.pdf");
        assert_eq!(
            artifact.content_disposition(),
            "attachment; filename=\"merged.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_strips_header_breaking_chars() {
        let artifact = Artifact::png(vec![], "bad\"name\r\n.png");
        assert_eq!(
            artifact.content_disposition(),
            "attachment; filename=\"badname.png\""
        );
    }
}
