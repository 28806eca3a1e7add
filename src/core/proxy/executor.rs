//! Request lifecycle executor

use super::upstream;
use crate::core::models::openai::{ChatCompletionRequest, ChatCompletionResponse, Usage};
use crate::core::models::{ClientInfo, RequestLog};
use crate::core::rate_limiter::{RateLimiter, ReleaseGuard};
use crate::core::router::Router;
use crate::core::streaming::forwarder::{pump_sse, StreamOutcome};
use crate::core::streaming::types::Event;
use crate::core::translator::{self, fc_compat};
use crate::core::sources::Source;
use crate::storage::Store;
use crate::utils::error::{ErrorResponse, GatewayError};
use actix_web::{http::header, HttpResponse};
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

/// Executor tuning
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Additional attempts after the first; 0 disables failover
    pub max_retries: u32,
    /// Per-attempt deadline for non-stream upstream calls
    pub request_timeout: Duration,
    /// Consecutive failures before a source turns unhealthy
    pub failure_threshold: u32,
    /// Permit failover for streams that have not yet sent a byte
    pub retry_streams_before_first_byte: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            request_timeout: Duration::from_secs(300),
            failure_threshold: 3,
            retry_streams_before_first_byte: true,
        }
    }
}

/// Per-request context assembled by the auth middleware
pub struct RequestContext {
    /// Client identity
    pub client: ClientInfo,
    /// Correlation id (inbound X-Request-ID or generated)
    pub request_id: String,
    /// Concurrency slot to release at the terminal outcome
    pub guard: Option<ReleaseGuard>,
}

enum AttemptFailure {
    /// Worth trying another source
    Retryable(String),
    /// Will fail everywhere; ends the chain
    Terminal(String),
}

impl AttemptFailure {
    fn message(&self) -> &str {
        match self {
            AttemptFailure::Retryable(m) | AttemptFailure::Terminal(m) => m,
        }
    }
}

/// Drives one request from admission to terminal outcome
pub struct ProxyExecutor {
    router: Arc<Router>,
    limiter: Arc<RateLimiter>,
    store: Arc<dyn Store>,
    client: reqwest::Client,
    config: ExecutorConfig,
}

impl ProxyExecutor {
    /// Executor over the given collaborators
    pub fn new(
        router: Arc<Router>,
        limiter: Arc<RateLimiter>,
        store: Arc<dyn Store>,
        client: reqwest::Client,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            router,
            limiter,
            store,
            client,
            config,
        }
    }

    /// Run the failover loop for one request and produce the client
    /// response. Exactly one log row is written per terminal outcome.
    pub async fn execute(&self, req: ChatCompletionRequest, mut ctx: RequestContext) -> HttpResponse {
        let mut tried: HashSet<String> = HashSet::new();
        let mut first_tried: Option<String> = None;
        let mut last_source: Option<Arc<Source>> = None;
        let mut last_error: Option<String> = None;

        let attempts = self.config.max_retries as usize + 1;
        for attempt in 0..attempts {
            let Some(source) = self.router.route(&req, &tried) else {
                break;
            };
            tried.insert(source.id.clone());
            if first_tried.is_none() {
                first_tried = Some(source.id.clone());
            }
            let failover_from = if attempt > 0 {
                first_tried.clone().unwrap_or_default()
            } else {
                String::new()
            };
            last_source = Some(Arc::clone(&source));

            let translated = translator::translate(&req, &source);
            let started = Instant::now();
            let result = if translated.fc_compat {
                self.compat_attempt(&req, &translated.request, &source).await
            } else if req.is_stream() {
                return match self
                    .stream_attempt(&req, &translated.request, &source, &mut ctx, &failover_from)
                    .await
                {
                    Ok(response) => response,
                    Err(failure) => {
                        self.note_attempt_failure(&source, &failure, started);
                        last_error = Some(failure.message().to_string());
                        if matches!(failure, AttemptFailure::Terminal(_)) {
                            break;
                        }
                        continue;
                    }
                };
            } else {
                self.normal_attempt(&translated.request, &source).await
            };

            let latency_ms = started.elapsed().as_millis() as u64;
            match result {
                Ok((body, usage, compat_stream)) => {
                    source.mark_success(latency_ms);
                    self.limiter.record_success(&ctx.client.key_id);
                    self.write_log(RequestLog {
                        request_id: ctx.request_id.clone(),
                        timestamp: Utc::now(),
                        source_id: source.id.clone(),
                        source_name: source.name.clone(),
                        model: req.model.clone(),
                        has_tools: req.has_tools(),
                        has_thinking: req.has_thinking(),
                        stream: req.is_stream(),
                        success: true,
                        status_code: 200,
                        latency_ms,
                        prompt_tokens: usage.map(|u| u.prompt_tokens).unwrap_or(0),
                        completion_tokens: usage.map(|u| u.completion_tokens).unwrap_or(0),
                        error: None,
                        failover_from,
                        client_ip: ctx.client.ip.clone(),
                        client_tool: ctx.client.tool.clone(),
                        key_id: ctx.client.key_id.clone(),
                        fc_compat_used: translated.fc_compat,
                    })
                    .await;
                    if let Some(guard) = ctx.guard.take() {
                        guard.release();
                    }
                    return match compat_stream {
                        Some(events) => sse_from_events(events),
                        None => HttpResponse::Ok().json(body),
                    };
                }
                Err(failure) => {
                    self.note_attempt_failure(&source, &failure, started);
                    last_error = Some(format!(
                        "source {} failed: {}",
                        source.name,
                        failure.message()
                    ));
                    if matches!(failure, AttemptFailure::Terminal(_)) {
                        break;
                    }
                }
            }
        }

        // every source exhausted (or none qualified)
        self.limiter.record_error(&ctx.client.key_id);
        let message = last_error
            .clone()
            .unwrap_or_else(|| format!("no available source for model {}", req.model));
        let (source_id, source_name) = last_source
            .as_ref()
            .map(|s| (s.id.clone(), s.name.clone()))
            .unwrap_or_default();
        self.write_log(RequestLog {
            request_id: ctx.request_id.clone(),
            timestamp: Utc::now(),
            source_id,
            source_name,
            model: req.model.clone(),
            has_tools: req.has_tools(),
            has_thinking: req.has_thinking(),
            stream: req.is_stream(),
            success: false,
            status_code: 500,
            latency_ms: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            error: Some(message.clone()),
            failover_from: match (first_tried, tried.len() > 1) {
                (Some(first), true) => first,
                _ => String::new(),
            },
            client_ip: ctx.client.ip.clone(),
            client_tool: ctx.client.tool.clone(),
            key_id: ctx.client.key_id.clone(),
            fc_compat_used: false,
        })
        .await;
        if let Some(guard) = ctx.guard.take() {
            guard.release();
        }
        error!(request_id = %ctx.request_id, error = %message, "request exhausted all sources");
        HttpResponse::InternalServerError().json(ErrorResponse::new(
            message,
            "server_error",
            "all_sources_failed",
        ))
    }

    /// Plain JSON round trip
    async fn normal_attempt(
        &self,
        body: &ChatCompletionRequest,
        source: &Source,
    ) -> Result<(serde_json::Value, Option<Usage>, Option<Vec<Event>>), AttemptFailure> {
        let response = upstream::chat_request(
            &self.client,
            source,
            body,
            Some(self.config.request_timeout),
        )
        .send()
        .await
        .map_err(|e| AttemptFailure::Retryable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let fragment = upstream::read_error_body(response).await;
            let message = format!("HTTP {}: {}", status.as_u16(), fragment);
            return Err(if upstream::is_retryable_status(status) {
                AttemptFailure::Retryable(message)
            } else {
                AttemptFailure::Terminal(message)
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AttemptFailure::Retryable(format!("invalid response body: {}", e)))?;
        let usage = value
            .get("usage")
            .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());
        Ok((value, usage, None))
    }

    /// Compatibility path: non-stream upstream call, projected reply,
    /// locally synthesized stream when the caller asked for SSE
    async fn compat_attempt(
        &self,
        original: &ChatCompletionRequest,
        body: &ChatCompletionRequest,
        source: &Source,
    ) -> Result<(serde_json::Value, Option<Usage>, Option<Vec<Event>>), AttemptFailure> {
        let (value, usage, _) = self.normal_attempt(body, source).await?;
        let typed: ChatCompletionResponse = serde_json::from_value(value).map_err(|e| {
            AttemptFailure::Retryable(format!("invalid completion response: {}", e))
        })?;
        let projected = fc_compat::project_response(typed);
        let events = original
            .is_stream()
            .then(|| fc_compat::synthesize_stream_events(&projected));
        let value = serde_json::to_value(&projected)
            .map_err(|e| AttemptFailure::Terminal(e.to_string()))?;
        Ok((value, usage, events))
    }

    /// Streaming path.
    ///
    /// Failover stays possible until the first upstream byte is in hand;
    /// from then on the stream is committed and ends best-effort. The
    /// pump task owns the terminal bookkeeping: health update, log row,
    /// and the concurrency slot.
    async fn stream_attempt(
        &self,
        req: &ChatCompletionRequest,
        body: &ChatCompletionRequest,
        source: &Arc<Source>,
        ctx: &mut RequestContext,
        failover_from: &str,
    ) -> Result<HttpResponse, AttemptFailure> {
        let mut response = upstream::chat_request(&self.client, source, body, None)
            .send()
            .await
            .map_err(|e| AttemptFailure::Retryable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let fragment = upstream::read_error_body(response).await;
            let message = format!("HTTP {}: {}", status.as_u16(), fragment);
            return Err(if upstream::is_retryable_status(status) {
                AttemptFailure::Retryable(message)
            } else {
                AttemptFailure::Terminal(message)
            });
        }

        // hold the first frame back so a stream that dies before its
        // first byte can still fail over
        let first_chunk: Option<Bytes> = if self.config.retry_streams_before_first_byte {
            match response.chunk().await {
                Ok(chunk) => chunk,
                Err(e) => return Err(AttemptFailure::Retryable(e.to_string())),
            }
        } else {
            None
        };

        let (tx, rx) = mpsc::channel::<Result<actix_web::web::Bytes, GatewayError>>(64);
        let started = Instant::now();
        let source = Arc::clone(source);
        let limiter = Arc::clone(&self.limiter);
        let store = Arc::clone(&self.store);
        let threshold = self.config.failure_threshold;
        let guard = ctx.guard.take();
        let row_seed = RequestLog {
            request_id: ctx.request_id.clone(),
            timestamp: Utc::now(),
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            model: req.model.clone(),
            has_tools: req.has_tools(),
            has_thinking: req.has_thinking(),
            stream: true,
            success: true,
            status_code: 200,
            latency_ms: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            error: None,
            failover_from: failover_from.to_string(),
            client_ip: ctx.client.ip.clone(),
            client_tool: ctx.client.tool.clone(),
            key_id: ctx.client.key_id.clone(),
            fc_compat_used: false,
        };

        tokio::spawn(async move {
            let outcome = pump_sse(response, first_chunk, tx).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            finish_stream(
                outcome, latency_ms, &source, &limiter, store, row_seed, threshold,
            )
            .await;
            drop(guard);
        });

        Ok(HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "text/event-stream"))
            .insert_header((header::CACHE_CONTROL, "no-cache"))
            .streaming(ReceiverStream::new(rx)))
    }

    fn note_attempt_failure(&self, source: &Source, failure: &AttemptFailure, started: Instant) {
        let latency_ms = started.elapsed().as_millis() as u64;
        source.mark_failure(failure.message(), latency_ms, self.config.failure_threshold);
        warn!(
            source = %source.id,
            error = %failure.message(),
            "upstream attempt failed"
        );
    }

    async fn write_log(&self, row: RequestLog) {
        if let Err(e) = self.store.append_request_log(&row).await {
            error!(error = %e, request_id = %row.request_id, "failed to persist request log");
        }
    }
}

/// Terminal bookkeeping for a committed stream
async fn finish_stream(
    outcome: StreamOutcome,
    latency_ms: u64,
    source: &Source,
    limiter: &RateLimiter,
    store: Arc<dyn Store>,
    mut row: RequestLog,
    threshold: u32,
) {
    match &outcome.upstream_error {
        Some(error) => {
            // the client saw a truncated stream; health-wise this is a
            // transport failure, log-wise a best-effort success
            source.mark_failure(error.clone(), latency_ms, threshold);
        }
        None => source.mark_success(latency_ms),
    }
    limiter.record_success(&row.key_id);

    row.timestamp = Utc::now();
    row.latency_ms = latency_ms;
    if let Some(usage) = outcome.usage {
        row.prompt_tokens = usage.prompt_tokens;
        row.completion_tokens = usage.completion_tokens;
    }
    if outcome.client_disconnected {
        row.error = Some("client disconnected".to_string());
    } else if let Some(error) = outcome.upstream_error {
        row.error = Some(error);
    }
    if let Err(e) = store.append_request_log(&row).await {
        error!(error = %e, request_id = %row.request_id, "failed to persist request log");
    }
    info!(
        request_id = %row.request_id,
        source = %row.source_id,
        bytes = outcome.bytes_forwarded,
        "stream finished"
    );
}

/// Immediate SSE response from pre-built events (compat stream synthesis)
fn sse_from_events(events: Vec<Event>) -> HttpResponse {
    let body = async_stream::stream! {
        for event in events {
            yield Ok::<_, GatewayError>(event.to_bytes());
        }
    };
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(body)
}
