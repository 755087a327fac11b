use thiserror::Error;

/// Failures while turning a source descriptor into plain text.
///
/// `InvalidSourceUrl` and `SourceUnreachable` are resolved before any SSE
/// headers are sent and map to ordinary HTTP statuses; the remaining variants
/// cover upload decoding and surface as 500s on the upload endpoint.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The Google Docs reference does not contain a `/d/{id}` segment.
    #[error("Invalid Google Docs URL")]
    InvalidSourceUrl,

    /// The export endpoint returned a non-success status (or the fetch failed).
    #[error("Failed to fetch Google Docs content. Make sure the document is publicly accessible.")]
    SourceUnreachable,

    /// The DOCX container or its document part could not be parsed.
    #[error("failed to extract DOCX content: {0}")]
    Docx(String),

    /// An uploaded Markdown file was not valid UTF-8.
    #[error("uploaded file is not valid UTF-8 text")]
    InvalidUtf8,
}

/// Failures talking to the model service, before or during a completion stream.
///
/// Never retried; once the SSE stream has begun these degrade to a single
/// `error` event followed by stream closure.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model service request failed: {0}")]
    Request(String),

    /// The chat call was rejected outright (unknown model, bad credential, ...).
    #[error("model service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A stream line that was not parseable as a chat chunk.
    #[error("malformed model stream payload: {0}")]
    Malformed(String),

    /// The stream carried an explicit error object from the service.
    #[error("{0}")]
    Upstream(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        ModelError::Request(e.to_string())
    }
}
