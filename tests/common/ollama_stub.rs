use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// How the stub answers `POST /api/chat`.
#[derive(Clone)]
pub enum ChatBehavior {
    /// Emit these NDJSON lines as the streaming body.
    Lines(Vec<String>),
    /// Reject the call outright.
    Status(u16, String),
}

/// Configurable in-process stand-in for the model service (and the Google
/// Docs export endpoint, which shares the listener for convenience).
pub struct StubConfig {
    pub chat: ChatBehavior,
    /// `Some(names)` answers `/api/tags` with a catalog; `None` answers 500.
    pub tags: Option<Vec<String>>,
    /// `Some(bytes)` serves a DOCX export for any document id; `None` answers
    /// 404 (document not publicly shared).
    pub export_doc: Option<Vec<u8>>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            chat: ChatBehavior::Lines(chat_lines(&[])),
            tags: None,
            export_doc: None,
        }
    }
}

struct StubState {
    config: StubConfig,
    export_calls: AtomicUsize,
}

pub struct OllamaStub {
    pub base_url: String,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl OllamaStub {
    pub async fn start(config: StubConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("stub bind");
        let addr = listener.local_addr().expect("stub addr");
        let state = Arc::new(StubState {
            config,
            export_calls: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/api/chat", post(chat))
            .route("/api/tags", get(tags))
            .route("/document/d/:id/export", get(export))
            .with_state(state.clone());

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .expect("stub serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(tx),
        }
    }

    pub fn export_calls(&self) -> usize {
        self.state.export_calls.load(Ordering::SeqCst)
    }
}

impl Drop for OllamaStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// NDJSON lines for a well-behaved stream: one line per fragment plus the
/// terminal `done` line.
pub fn chat_lines(fragments: &[&str]) -> Vec<String> {
    let mut lines: Vec<String> = fragments
        .iter()
        .map(|f| {
            json!({"message": {"role": "assistant", "content": f}, "done": false}).to_string()
        })
        .collect();
    lines.push(json!({"message": {"role": "assistant", "content": ""}, "done": true}).to_string());
    lines
}

/// A stream that fails mid-flight with a service-side error line.
pub fn chat_lines_with_error(fragments: &[&str], error: &str) -> Vec<String> {
    let mut lines: Vec<String> = fragments
        .iter()
        .map(|f| {
            json!({"message": {"role": "assistant", "content": f}, "done": false}).to_string()
        })
        .collect();
    lines.push(json!({"error": error}).to_string());
    lines
}

async fn chat(State(state): State<Arc<StubState>>) -> Response {
    match &state.config.chat {
        ChatBehavior::Lines(lines) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/x-ndjson")
            .body(Body::from(lines.join("\n") + "\n"))
            .unwrap(),
        ChatBehavior::Status(code, body) => Response::builder()
            .status(StatusCode::from_u16(*code).unwrap())
            .body(Body::from(body.clone()))
            .unwrap(),
    }
}

async fn tags(State(state): State<Arc<StubState>>) -> Response {
    match &state.config.tags {
        Some(names) => {
            let models: Vec<_> = names.iter().map(|n| json!({"name": n})).collect();
            Json(json!({"models": models})).into_response()
        }
        None => (StatusCode::INTERNAL_SERVER_ERROR, "catalog unavailable").into_response(),
    }
}

async fn export(State(state): State<Arc<StubState>>) -> Response {
    state.export_calls.fetch_add(1, Ordering::SeqCst);
    match &state.config.export_doc {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "document is not shared").into_response(),
    }
}
