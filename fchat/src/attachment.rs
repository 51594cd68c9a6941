//! Image attachments and their inline data URI encoding.
//!
//! ```rust
//! use fchat::Attachment;
//!
//! let attachment = Attachment::bytes("image/png", vec![0x89, 0x50, 0x4e, 0x47]);
//! assert_eq!(attachment.mime_type().as_deref(), Some("image/png"));
//! ```

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::ChatError;

pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Bytes { mime_type: String, data: Vec<u8> },
    /// Read when the turn is admitted; the mime type comes from the extension.
    File { path: PathBuf },
}

impl Attachment {
    pub fn bytes(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Bytes {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn mime_type(&self) -> Option<String> {
        match self {
            Self::Bytes { mime_type, .. } => Some(mime_type.clone()),
            Self::File { path } => mime_guess::from_path(path)
                .first()
                .map(|mime| mime.essence_str().to_string()),
        }
    }

    /// Reads and validates the image, returning `data:<mime>;base64,<payload>`.
    pub async fn to_data_uri(&self) -> Result<String, ChatError> {
        let mime_type = self.mime_type().unwrap_or_default();
        if !ALLOWED_IMAGE_TYPES.contains(&mime_type.as_str()) {
            return Err(ChatError::attachment(format!(
                "unsupported image type '{}'; use JPEG, PNG, GIF, or WebP",
                if mime_type.is_empty() { "unknown" } else { mime_type.as_str() }
            )));
        }

        let data = match self {
            Self::Bytes { data, .. } => data.clone(),
            Self::File { path } => tokio::fs::read(path).await.map_err(|err| {
                ChatError::attachment(format!("failed to read '{}': {err}", path.display()))
            })?,
        };

        if data.is_empty() {
            return Err(ChatError::attachment("image is empty"));
        }
        if data.len() > MAX_ATTACHMENT_BYTES {
            return Err(ChatError::attachment(format!(
                "image is {:.1}MB; the limit is {}MB",
                data.len() as f64 / (1024.0 * 1024.0),
                MAX_ATTACHMENT_BYTES / (1024 * 1024)
            )));
        }

        Ok(format!("data:{mime_type};base64,{}", STANDARD.encode(&data)))
    }
}
