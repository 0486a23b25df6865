use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding failed: {0}")]
    EncodeError(String),

    #[error("Incorrect password for decrypting PDF.")]
    IncorrectPassword,

    #[error("{0}")]
    BackendUnavailable(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// True when the failure stems from the uploaded data rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ToolError::ParseError(_)
                | ToolError::ImageDecode(_)
                | ToolError::InvalidPage(_)
                | ToolError::InvalidInput(_)
                | ToolError::IncorrectPassword
        )
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
