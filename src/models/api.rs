use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::validate::ValidationResult;

/// Where the conversion input comes from.
///
/// Serialized lowercase to match the frontend payloads:
/// "googledocs" | "docx" | "md"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    GoogleDocs,
    Docx,
    Md,
}

/// Body of `POST /api/convert`.
///
/// `content` carries pre-extracted text (upload paths); `url` is only
/// meaningful for the Google Docs source. `model` overrides the configured
/// default model id and is passed through unvalidated; an unknown id is only
/// discovered when the model service rejects the call.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "sourceType")]
    pub source_type: SourceType,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// One SSE frame on the `/api/convert` stream, serialized as the `data:` JSON.
///
/// Per request exactly one of the terminal sequences occurs:
/// `chunk* validation done` on success, or `chunk* error` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConvertEvent {
    Chunk { content: String },
    Validation { valid: bool, errors: Vec<String> },
    Error { message: String },
    Done,
}

impl ConvertEvent {
    pub fn validation(result: ValidationResult) -> Self {
        ConvertEvent::Validation {
            valid: result.valid,
            errors: result.errors,
        }
    }
}

/// Body of `GET /api/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/// Body of a successful `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub content: String,
}
