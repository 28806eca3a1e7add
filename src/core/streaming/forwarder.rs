//! Upstream→client SSE pump
//!
//! A straight loop over the upstream byte stream: forward each frame,
//! stop as soon as the client goes away, never hold a lock across I/O.
//! Frames are passed through unmodified; the pump only watches the
//! stream for a usage-bearing chunk so the log row can carry token
//! counts.

use crate::core::models::openai::Usage;
use crate::core::streaming::types::ChatCompletionChunk;
use crate::utils::error::GatewayError;
use actix_web::web;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What happened on the pump
#[derive(Debug, Default)]
pub struct StreamOutcome {
    /// Bytes forwarded to the client
    pub bytes_forwarded: u64,
    /// Usage from the last usage-bearing chunk, when the upstream sent one
    pub usage: Option<Usage>,
    /// Upstream transport error that ended the stream early
    pub upstream_error: Option<String>,
    /// The client went away before the upstream finished
    pub client_disconnected: bool,
}

/// Forward the upstream SSE body to the client channel.
///
/// `first_chunk` carries a frame the caller already pulled while deciding
/// whether the stream had begun. Returns once the upstream ends, errors,
/// or the client disconnects; dropping the upstream response aborts the
/// upstream connection.
pub async fn pump_sse(
    mut upstream: reqwest::Response,
    first_chunk: Option<Bytes>,
    tx: mpsc::Sender<std::result::Result<web::Bytes, GatewayError>>,
) -> StreamOutcome {
    let mut outcome = StreamOutcome::default();
    let mut scanner = UsageScanner::default();

    if let Some(chunk) = first_chunk {
        scanner.feed(&chunk);
        outcome.bytes_forwarded += chunk.len() as u64;
        if tx.send(Ok(web::Bytes::from(chunk))).await.is_err() {
            outcome.client_disconnected = true;
            return outcome;
        }
    }

    loop {
        match upstream.chunk().await {
            Ok(Some(chunk)) => {
                scanner.feed(&chunk);
                outcome.bytes_forwarded += chunk.len() as u64;
                if tx.send(Ok(web::Bytes::from(chunk))).await.is_err() {
                    debug!("client disconnected, aborting upstream stream");
                    outcome.client_disconnected = true;
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "upstream stream ended with transport error");
                outcome.upstream_error = Some(e.to_string());
                break;
            }
        }
    }

    outcome.usage = scanner.usage;
    outcome
}

/// Incremental scanner for usage-bearing `data:` lines
#[derive(Debug, Default)]
struct UsageScanner {
    partial: String,
    usage: Option<Usage>,
}

impl UsageScanner {
    fn feed(&mut self, chunk: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(chunk));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            self.scan_line(line.trim_end());
        }
    }

    fn scan_line(&mut self, line: &str) {
        let Some(payload) = line.strip_prefix("data: ") else {
            return;
        };
        if payload == "[DONE]" || !payload.contains("\"usage\"") {
            return;
        }
        if let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(payload) {
            if chunk.usage.is_some() {
                self.usage = chunk.usage;
            }
        }
    }
}
