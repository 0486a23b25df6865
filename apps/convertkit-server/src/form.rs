//! Multipart form collection
//!
//! Forms are read fully into memory, then queried by field name. Scalar
//! fields are parsed leniently: a missing, blank or unparseable value falls
//! back to the endpoint's default.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use tracing::debug;

use crate::error::ServerError;

/// One uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub data: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Upload {
    /// File name and declared type, for log lines
    pub fn label(&self) -> String {
        format!(
            "{} ({})",
            self.filename.as_deref().unwrap_or("upload"),
            self.content_type.as_deref().unwrap_or("unknown type")
        )
    }
}

#[derive(Debug, Default)]
pub struct FormData {
    files: HashMap<String, Vec<Upload>>,
    fields: HashMap<String, String>,
}

impl FormData {
    /// Drain every field of `multipart`
    ///
    /// File inputs left empty by the browser arrive as zero-byte parts with
    /// an empty file name; those are dropped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            let filename = field.file_name().map(|s| s.to_string());
            let content_type = field.content_type().map(|s| s.to_string());

            if filename.is_some() {
                let data = field.bytes().await?;
                if data.is_empty() {
                    continue;
                }
                debug!(field = %name, size = data.len(), "Received file");
                form.files.entry(name).or_default().push(Upload {
                    data: data.to_vec(),
                    filename,
                    content_type,
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// First non-empty file under `name`
    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name).and_then(|uploads| uploads.first())
    }

    /// Every file under `name`, in upload order
    pub fn files(&self, name: &str) -> Vec<Vec<u8>> {
        self.files
            .get(name)
            .map(|uploads| uploads.iter().map(|u| u.data.clone()).collect())
            .unwrap_or_default()
    }

    /// Text field, `None` when missing or blank
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn text_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.text(name).unwrap_or(default)
    }

    /// Raw text field, blank values included
    pub fn raw_text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> T {
        self.text(name)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Integer field that may be submitted as a float; the fraction is truncated
    pub fn truncated_or(&self, name: &str, default: i64) -> i64 {
        self.text(name)
            .and_then(|value| parse_truncated(value.trim()))
            .unwrap_or(default)
    }

    pub fn total_file_bytes(&self, name: &str) -> usize {
        self.files
            .get(name)
            .map(|uploads| uploads.iter().map(|u| u.data.len()).sum())
            .unwrap_or(0)
    }
}

fn parse_truncated(value: &str) -> Option<i64> {
    if let Ok(int) = value.parse::<i64>() {
        return Some(int);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .map(|float| float.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn form_with(fields: &[(&str, &str)]) -> FormData {
        FormData {
            files: HashMap::new(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_defaults_for_missing_and_blank() {
        let form = form_with(&[("blank", "  ")]);
        assert_eq!(form.parse_or("missing", 7u32), 7);
        assert_eq!(form.parse_or("blank", 7u32), 7);
        assert_eq!(form.text_or("blank", "WATERMARK"), "WATERMARK");
        assert_eq!(form.raw_text("blank"), Some("  "));
    }

    #[test]
    fn test_unparseable_falls_back() {
        let form = form_with(&[("width", "wide"), ("size", "1.5")]);
        assert_eq!(form.parse_or("width", 800i64), 800);
        assert_eq!(form.parse_or("size", 1.0f64), 1.5);
    }

    #[test]
    fn test_truncated_accepts_floats() {
        let form = form_with(&[("left", "12.9"), ("top", "-3.7"), ("right", "40"), ("bottom", "NaN")]);
        assert_eq!(form.truncated_or("left", 0), 12);
        assert_eq!(form.truncated_or("top", 0), -3);
        assert_eq!(form.truncated_or("right", 100), 40);
        assert_eq!(form.truncated_or("bottom", 100), 100);
    }

    #[test]
    fn test_files_empty_when_missing() {
        let form = FormData::default();
        assert!(form.files("pdfs").is_empty());
        assert!(form.file("pdf").is_none());
        assert_eq!(form.total_file_bytes("pdfs"), 0);
    }

    proptest! {
        #[test]
        fn integers_survive_truncation(value in any::<i32>()) {
            let text = value.to_string();
            let form = form_with(&[("n", text.as_str())]);
            prop_assert_eq!(form.truncated_or("n", 0), value as i64);
        }
    }
}
