#![forbid(unsafe_code)]
#![doc = r#"
Blogforge

Convert blog source documents (Google Docs exports, uploaded DOCX/Markdown)
into constrained HTML snippets by relaying a streaming LLM chat completion to
the client over SSE and validating the accumulated output.

Crate highlights
- Library: pure validation via `validate_html_output`, the generic relay loop
  in `relay`, and format-specific text extraction in `extract`.
- HTTP server (in `server`): `/api/models`, `/api/upload`, `/api/convert`
  plus optional static/SPA serving.
- Upstream: an Ollama-style chat API (`/api/chat` NDJSON stream, `/api/tags`
  catalog) behind `ollama::OllamaClient`.

Modules
- `config`: startup-loaded, immutable process configuration and shared state.
- `extract`: Google Docs export fetch, DOCX and Markdown text extraction.
- `models`: wire shapes for the public API and the upstream chat service.
- `ollama`: model-service client and NDJSON stream framing.
- `relay`: the consumption loop bridging completion stream to event sink.
- `server`: Axum router/handlers.
- `util`: shared helpers (tracing, env, CORS, error responses).
- `validate`: post-stream structural rule check.
"#]

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod ollama;
pub mod relay;
pub mod server;
pub mod util;
pub mod validate;

// Re-export the pieces downstream users and tests reach for most.
pub use crate::config::{AppConfig, AppState, UploadFormat};
pub use crate::error::{ExtractError, ModelError};
pub use crate::relay::{relay, EventSink, SinkClosed};
pub use crate::validate::{validate_html_output, ValidationResult};
