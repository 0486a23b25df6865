//! Password protection via qpdf (AES-256, revision 6)

use qpdf::{
    EncryptionParams, EncryptionParamsR6, PrintPermission, QPdf, QPdfError, QPdfErrorCode,
};
use tracing::debug;

use crate::artifact::Artifact;
use crate::error::{ToolError, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityAction {
    #[default]
    Encrypt,
    Decrypt,
}

impl SecurityAction {
    /// `encrypt` selects encryption; any other value decrypts
    pub fn from_form(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("encrypt") {
            SecurityAction::Encrypt
        } else {
            SecurityAction::Decrypt
        }
    }

    pub fn output_filename(self) -> &'static str {
        match self {
            SecurityAction::Encrypt => "encrypted.pdf",
            SecurityAction::Decrypt => "decrypted.pdf",
        }
    }
}

fn map_qpdf_error(e: QPdfError) -> ToolError {
    match e.error_code() {
        QPdfErrorCode::InvalidPassword => ToolError::IncorrectPassword,
        QPdfErrorCode::DamagedPdf => ToolError::ParseError(e.to_string()),
        _ => ToolError::OperationError(e.to_string()),
    }
}

/// Encrypt with `password` as both user and owner password, all permissions granted
pub fn encrypt_pdf(bytes: &[u8], password: &str) -> ToolResult<Vec<u8>> {
    let pdf = QPdf::read_from_memory(bytes).map_err(map_qpdf_error)?;
    debug!(input = bytes.len(), "Encrypting PDF");

    let params = EncryptionParams::R6(EncryptionParamsR6 {
        user_password: password.to_string(),
        owner_password: password.to_string(),
        allow_accessibility: true,
        allow_extract: true,
        allow_assemble: true,
        allow_annotate_and_form: true,
        allow_form_filling: true,
        allow_modify_other: true,
        allow_print: PrintPermission::Full,
        encrypt_metadata: true,
    });

    let mut writer = pdf.writer();
    writer.encryption_params(params);
    writer.write_to_memory().map_err(map_qpdf_error)
}

/// Open with `password` and write without encryption
pub fn decrypt_pdf(bytes: &[u8], password: &str) -> ToolResult<Vec<u8>> {
    let pdf = QPdf::read_from_memory_encrypted(bytes, password).map_err(map_qpdf_error)?;
    debug!(input = bytes.len(), "Decrypting PDF");

    let mut writer = pdf.writer();
    writer.preserve_encryption(false);
    writer.write_to_memory().map_err(map_qpdf_error)
}

/// Operation: encrypt or decrypt, named for the action taken
pub fn apply_security(bytes: &[u8], password: &str, action: SecurityAction) -> ToolResult<Artifact> {
    let data = match action {
        SecurityAction::Encrypt => encrypt_pdf(bytes, password)?,
        SecurityAction::Decrypt => decrypt_pdf(bytes, password)?,
    };
    Ok(Artifact::pdf(data, action.output_filename()))
}
