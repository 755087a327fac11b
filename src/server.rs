use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::channel::mpsc;
use http::{header, StatusCode};
use tower_http::services::{ServeDir, ServeFile};

use crate::config::{AppState, UploadFormat};
use crate::error::ExtractError;
use crate::extract::{extract_docx, extract_markdown, fetch_google_doc};
use crate::models::api::{
    ConvertEvent, ConvertRequest, ModelsResponse, SourceType, UploadResponse,
};
use crate::ollama::build_chat_request;
use crate::relay::{relay, EventSink, SseChannelSink};
use crate::util::{cors_layer_from_env, error_response};

/// Upload body ceiling, matching the documented 10 MiB limit.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the Axum router with `/api/models`, `/api/upload` and `/api/convert`.
///
/// When a static directory is configured the router also serves assets from
/// it, with `index.html` as the SPA fallback for unmatched routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/api/models", get(models))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/convert", post(convert))
        .with_state(state.clone());

    let router = if let Some(dir) = &state.config.static_dir {
        let index = dir.join("index.html");
        router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
    } else {
        router
    };

    router
        .layer(cors_layer_from_env())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// List available models. Advisory only: any catalog failure is swallowed
/// into a single-element fallback carrying the configured default model, so
/// this endpoint never returns a non-200.
async fn models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = match state.ollama.list_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!(error = %e, "model listing failed, falling back to default");
            vec![state.config.default_model.clone()]
        }
    };
    Json(ModelsResponse { models })
}

/// Accept a single `file` multipart field and return its extracted text.
///
/// The accepted extension is fixed per deployment variant; non-matching
/// uploads are rejected before extraction runs.
async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let format = state.config.upload_format;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("malformed multipart body: {e}"),
                )
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_ascii_lowercase();
        if !filename.ends_with(format.extension()) {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Only {} files are allowed", format.extension()),
            );
        }

        let data = match field.bytes().await {
            Ok(d) => d,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("failed to read upload: {e}"),
                )
            }
        };

        let extracted = match format {
            UploadFormat::Docx => extract_docx(&data),
            UploadFormat::Md => extract_markdown(&data),
        };
        return match extracted {
            Ok(content) => Json(UploadResponse { content }).into_response(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        };
    }

    error_response(StatusCode::BAD_REQUEST, "No file uploaded")
}

/// Run one conversion: resolve the input text, open a streaming completion
/// and relay it to the client as SSE frames.
///
/// Pre-flight failures (bad URL, unreachable document, empty content) are
/// resolved before any stream opens and use ordinary HTTP statuses. Once the
/// SSE response exists, all failures degrade to a single `error` event.
async fn convert(State(state): State<Arc<AppState>>, Json(req): Json<ConvertRequest>) -> Response {
    let content = match resolve_content(&state, &req).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if content.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No content provided");
    }

    let model = req
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(&state.config.default_model)
        .to_string();
    let chat_req = build_chat_request(&state.system_prompt, &content, &model);

    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(32);
    let ollama = state.ollama.clone();
    tokio::spawn(async move {
        let mut sink = SseChannelSink::new(tx);
        match ollama.chat_stream(&chat_req).await {
            Ok(stream) => {
                relay(stream, &mut sink).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, model = %chat_req.model, "completion call failed");
                let _ = sink
                    .send(ConvertEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                sink.close();
            }
        }
    });

    sse_response(rx)
}

/// Resolve the input text for a conversion request. The Google Docs path is
/// the only one with a side effect (one outbound export fetch).
async fn resolve_content(state: &AppState, req: &ConvertRequest) -> Result<String, Response> {
    match (req.source_type, req.url.as_deref()) {
        (SourceType::GoogleDocs, Some(url)) => {
            fetch_google_doc(&state.http, &state.config.google_export_base, url)
                .await
                .map_err(|e| {
                    let status = match e {
                        ExtractError::InvalidSourceUrl => StatusCode::BAD_REQUEST,
                        ExtractError::SourceUnreachable => StatusCode::BAD_GATEWAY,
                        _ => StatusCode::INTERNAL_SERVER_ERROR,
                    };
                    error_response(status, &e.to_string())
                })
        }
        _ => Ok(req.content.clone().unwrap_or_default()),
    }
}

fn sse_response(rx: mpsc::Receiver<Result<Bytes, std::io::Error>>) -> Response {
    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        // tell nginx-style intermediaries not to buffer the stream
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(rx))
        .unwrap()
}
