//! Client for the upstream Ollama-style chat API.
//!
//! Two capabilities are consumed: streaming chat completion (`POST /api/chat`,
//! NDJSON body) and model listing (`GET /api/tags`). The streaming call
//! returns an open fragment stream; the relay owns its consumption.

use bytes::Bytes;
use futures::stream::{try_unfold, Stream, StreamExt};
use std::pin::Pin;

use crate::config::AppConfig;
use crate::error::ModelError;
use crate::models::ollama::{ChatMessage, ChatRequest, ChatStreamChunk, TagsResponse};

/// Handle to the model service, cloned per request from `AppState`.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    api_key: Option<String>,
}

/// Compose the immutable system instruction with the extracted text as the
/// user turn. The model id is caller-supplied or the configured default;
/// it is not checked against the catalog before sending.
pub fn build_chat_request(system_prompt: &str, user_content: &str, model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_content),
        ],
        stream: true,
    }
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            http,
            host: config.ollama_host.clone(),
            api_key: config.ollama_api_key.clone(),
        }
    }

    /// Open a streaming chat completion and return the fragment stream.
    ///
    /// Each item is one fragment's text in arrival order, including the empty
    /// content of the terminal `done` line. A non-success status is returned
    /// as `ModelError::Status` before any fragment is produced.
    pub async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<impl Stream<Item = Result<String, ModelError>> + Send, ModelError> {
        let url = format!("{}/api/chat", self.host);
        let mut rb = self
            .http
            .post(&url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .json(req);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }
        let resp = rb.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ndjson_content_stream(resp.bytes_stream()))
    }

    /// List available model names from the service catalog, in service order.
    ///
    /// Callers on the HTTP surface treat any `Err` as advisory and substitute
    /// the configured default model.
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let url = format!("{}/api/tags", self.host);
        let mut rb = self.http.get(&url);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }
        let resp = rb.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

struct LineState<S> {
    inner: Pin<Box<S>>,
    buf: Vec<u8>,
    done: bool,
}

/// Frame a byte stream into NDJSON chat chunks and yield each fragment's text.
///
/// Network chunks are buffered as raw bytes and only complete lines are
/// decoded, so a multi-byte codepoint straddling a chunk boundary stays
/// intact. Lines are parsed in arrival order; a line carrying `error`
/// terminates the stream with `ModelError::Upstream`. The stream ends after
/// the `done: true` line (or byte-stream exhaustion, tolerating a missing
/// trailing newline).
fn ndjson_content_stream<S, E>(bytes: S) -> impl Stream<Item = Result<String, ModelError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: std::fmt::Display,
{
    let state = LineState {
        inner: Box::pin(bytes),
        buf: Vec::new(),
        done: false,
    };

    try_unfold(state, |mut st| async move {
        loop {
            if let Some(line) = take_line(&mut st.buf) {
                if line.is_empty() {
                    continue;
                }
                let (content, done) = parse_chunk_line(&line)?;
                if done {
                    st.done = true;
                }
                return Ok(Some((content, st)));
            }
            if st.done {
                return Ok(None);
            }
            match st.inner.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => return Err(ModelError::Request(e.to_string())),
                None => {
                    // Exhausted without a done line; flush any trailing partial line.
                    let rest = std::mem::take(&mut st.buf);
                    st.done = true;
                    let rest = rest.trim_ascii();
                    if rest.is_empty() {
                        return Ok(None);
                    }
                    let (content, _) = parse_chunk_line(rest)?;
                    return Ok(Some((content, st)));
                }
            }
        }
    })
}

fn take_line(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buf.drain(..=pos).collect();
    Some(line.trim_ascii().to_vec())
}

fn parse_chunk_line(line: &[u8]) -> Result<(String, bool), ModelError> {
    let chunk: ChatStreamChunk =
        serde_json::from_slice(line).map_err(|e| ModelError::Malformed(e.to_string()))?;
    if let Some(err) = chunk.error {
        return Err(ModelError::Upstream(err));
    }
    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok((content, chunk.done))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ollama::Role;
    use futures::stream;
    use std::convert::Infallible;

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    #[test]
    fn chat_request_carries_system_then_user_turn() {
        let req = build_chat_request("be terse", "hello", "qwen3-coder:480b-cloud");
        assert_eq!(req.model, "qwen3-coder:480b-cloud");
        assert!(req.stream);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[0].content, "be terse");
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(req.messages[1].content, "hello");
    }

    #[tokio::test]
    async fn fragments_preserve_arrival_order() {
        let upstream = byte_stream(vec![
            "{\"message\":{\"role\":\"assistant\",\"content\":\"A\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"B\"},\"done\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\"C\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        ]);
        let fragments: Vec<String> = ndjson_content_stream(upstream)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["A", "B", "C", ""]);
    }

    #[tokio::test]
    async fn lines_split_across_byte_chunks_are_reassembled() {
        let upstream = byte_stream(vec![
            "{\"message\":{\"role\":\"assistant\",\"con",
            "tent\":\"AB\"},\"done\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        ]);
        let fragments: Vec<String> = ndjson_content_stream(upstream)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["AB", ""]);
    }

    #[tokio::test]
    async fn multibyte_codepoints_split_across_byte_chunks_survive() {
        let line = "{\"message\":{\"role\":\"assistant\",\"content\":\"café\"},\"done\":true}\n";
        let bytes = line.as_bytes();
        // Split inside the two-byte encoding of 'é'.
        let cut = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let upstream = stream::iter(vec![
            Ok::<_, Infallible>(Bytes::copy_from_slice(&bytes[..cut])),
            Ok(Bytes::copy_from_slice(&bytes[cut..])),
        ]);
        let fragments: Vec<String> = ndjson_content_stream(upstream)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["café"]);
    }

    #[tokio::test]
    async fn error_line_terminates_the_stream() {
        let upstream = byte_stream(vec![
            "{\"message\":{\"role\":\"assistant\",\"content\":\"A\"},\"done\":false}\n",
            "{\"error\":\"model quota exceeded\"}\n",
        ]);
        let items: Vec<Result<String, ModelError>> =
            ndjson_content_stream(upstream).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "A");
        assert!(matches!(&items[1], Err(ModelError::Upstream(m)) if m == "model quota exceeded"));
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_flushed() {
        let upstream = byte_stream(vec![
            "{\"message\":{\"role\":\"assistant\",\"content\":\"tail\"},\"done\":false}",
        ]);
        let fragments: Vec<String> = ndjson_content_stream(upstream)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["tail"]);
    }
}
