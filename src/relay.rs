//! Streaming relay: the single consumption loop bridging the upstream
//! completion stream to a push-oriented event sink.
//!
//! Lifecycle per request: Idle -> Streaming -> Completed | Failed. Exactly one
//! terminal sequence is emitted, `validation` + `done` on completion or one
//! `error` on failure, and the sink is closed on both paths. Ordering is
//! enforced here and nowhere else: fragments are appended and forwarded one
//! at a time, in arrival order, with no coalescing or splitting.

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{pin_mut, SinkExt, Stream, StreamExt};

use crate::error::ModelError;
use crate::models::api::ConvertEvent;
use crate::validate::validate_html_output;

/// The receiving side of the sink is gone (client disconnect or closed body).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Push-oriented event sink with an explicit close signal.
///
/// The HTTP layer supplies a channel-backed implementation feeding the SSE
/// response body; tests supply collecting sinks.
#[async_trait]
pub trait EventSink: Send {
    async fn send(&mut self, event: ConvertEvent) -> Result<(), SinkClosed>;
    fn close(&mut self);
}

/// Sink writing SSE `data:` frames into a bounded channel whose receiver is
/// the response body stream.
pub struct SseChannelSink {
    tx: mpsc::Sender<Result<Bytes, std::io::Error>>,
}

impl SseChannelSink {
    pub fn new(tx: mpsc::Sender<Result<Bytes, std::io::Error>>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for SseChannelSink {
    async fn send(&mut self, event: ConvertEvent) -> Result<(), SinkClosed> {
        let json = serde_json::to_string(&event).map_err(|_| SinkClosed)?;
        let frame = Bytes::from(format!("data: {json}\n\n"));
        self.tx.send(Ok(frame)).await.map_err(|_| SinkClosed)
    }

    fn close(&mut self) {
        self.tx.close_channel();
    }
}

/// Drive one completion stream to its terminal state.
///
/// For each fragment, in arrival order: append to the accumulated output,
/// then emit one `chunk` event carrying exactly that fragment. On upstream
/// exhaustion the accumulated text is validated and `validation` + `done`
/// are emitted; on upstream error a single `error` event replaces them.
/// A rejected sink write means the client is gone: forwarding is abandoned
/// and dropping the stream cancels the upstream call best-effort.
///
/// Returns the accumulated output regardless of how the stream ended.
pub async fn relay<S, K>(upstream: S, sink: &mut K) -> String
where
    S: Stream<Item = Result<String, ModelError>>,
    K: EventSink + ?Sized,
{
    pin_mut!(upstream);
    let mut accumulated = String::new();

    loop {
        match upstream.next().await {
            Some(Ok(fragment)) => {
                accumulated.push_str(&fragment);
                let event = ConvertEvent::Chunk { content: fragment };
                if sink.send(event).await.is_err() {
                    tracing::debug!("event sink closed mid-stream, abandoning relay");
                    sink.close();
                    return accumulated;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "completion stream failed");
                let _ = sink
                    .send(ConvertEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                sink.close();
                return accumulated;
            }
            None => break,
        }
    }

    let result = validate_html_output(&accumulated);
    let _ = sink.send(ConvertEvent::validation(result)).await;
    let _ = sink.send(ConvertEvent::Done).await;
    sink.close();
    accumulated
}
