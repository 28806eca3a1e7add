//! Upstream egress helpers

use crate::core::models::openai::ChatCompletionRequest;
use crate::core::sources::{Source, SourceType};
use reqwest::{RequestBuilder, Response, StatusCode};

/// Client-visible error bodies from upstreams are read up to this bound
pub const MAX_ERROR_BODY: usize = 1024;

/// Anthropic API version pinned on egress
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Attach the source-type-appropriate auth headers
pub fn authorize(builder: RequestBuilder, source: &Source) -> RequestBuilder {
    match source.source_type {
        SourceType::Anthropic => {
            let builder = match &source.api_key {
                Some(key) if !key.is_empty() => builder.header("x-api-key", key.as_str()),
                _ => builder,
            };
            builder.header("anthropic-version", ANTHROPIC_VERSION)
        }
        // bearer for openai/newapi/custom, and for cpa iff a credential
        // is configured
        _ => match source.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        },
    }
}

/// Build the chat-completions POST for one attempt.
///
/// The per-attempt deadline is optional: stream attempts carry none, so
/// total time is bounded by the upstream's own pace and client-side
/// cancellation.
pub fn chat_request(
    client: &reqwest::Client,
    source: &Source,
    body: &ChatCompletionRequest,
    timeout: Option<std::time::Duration>,
) -> RequestBuilder {
    let url = format!(
        "{}/v1/chat/completions",
        source.base_url.trim_end_matches('/')
    );
    let mut builder = authorize(client.post(url), source).json(body);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
}

/// Transient failures are worth another source; parameter and auth
/// errors will fail everywhere, so they end the chain.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Read at most [`MAX_ERROR_BODY`] bytes of an error body.
///
/// Bounded so a misbehaving upstream cannot balloon memory; the fragment
/// goes to logs and source status, never to the client.
pub async fn read_error_body(mut response: Response) -> String {
    let mut collected: Vec<u8> = Vec::with_capacity(256);
    while collected.len() < MAX_ERROR_BODY {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let remaining = MAX_ERROR_BODY - collected.len();
                collected.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&collected).into_owned()
}
