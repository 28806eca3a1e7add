//! Single-source probe
//!
//! One `GET {base_url}/v1/models` per source per pass, with the
//! source-type-appropriate auth header. The same response doubles as the
//! discovery payload for auto-detect aggregators, so no second request
//! is ever issued.

use crate::core::proxy::upstream::{authorize, MAX_ERROR_BODY};
use crate::core::sources::{provider_caps, DetectedCapabilities, Source};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;

/// Parsed `/v1/models` entry
#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    /// Aggregators annotate entries with their sub-provider
    #[serde(default)]
    provider: Option<String>,
    /// Standard OpenAI field, used when `provider` is absent
    #[serde(default)]
    owned_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

/// Successful probe result
#[derive(Debug)]
pub struct ProbeSuccess {
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
    /// (model id, provider) pairs from the response
    pub models: Vec<(String, Option<String>)>,
}

/// Failed probe result
#[derive(Debug)]
pub struct ProbeError {
    /// Time spent before the failure
    pub latency_ms: u64,
    /// Truncated error description
    pub message: String,
}

/// Probe one source's models endpoint
pub async fn probe_source(client: &Client, source: &Source) -> Result<ProbeSuccess, ProbeError> {
    let url = format!("{}/v1/models", source.base_url.trim_end_matches('/'));
    let started = Instant::now();

    let request = authorize(client.get(&url), source);

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            return Err(ProbeError {
                latency_ms: started.elapsed().as_millis() as u64,
                message: truncate(&e.to_string()),
            });
        }
    };

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProbeError {
            latency_ms,
            message: truncate(&format!("HTTP {}: {}", status.as_u16(), body)),
        });
    }

    let body: ModelsResponse = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            return Err(ProbeError {
                latency_ms,
                message: truncate(&format!("invalid models response: {}", e)),
            });
        }
    };

    Ok(ProbeSuccess {
        latency_ms,
        models: body
            .data
            .into_iter()
            .map(|entry| (entry.id, entry.provider.or(entry.owned_by)))
            .collect(),
    })
}

/// Fold a probe's model pairs into an auto-detect aggregator's status.
///
/// Pairs whose provider is not enabled by config are dropped; the
/// detected model list and FC/vision bits are recomputed from the fixed
/// provider capability matrix. No-op for non-aggregators and for
/// aggregators without auto-detect.
pub fn apply_detection(source: &Source, models: &[(String, Option<String>)]) {
    let Some(aggregator) = source.aggregator.as_ref() else {
        return;
    };
    if !source.source_type.is_aggregator() || !aggregator.auto_detect {
        return;
    }

    let mut model_providers = HashMap::new();
    let mut detected = DetectedCapabilities::default();
    for (model, provider) in models {
        let Some(provider) = provider else { continue };
        if !aggregator.provider_enabled(provider) {
            continue;
        }
        let Some(caps) = provider_caps(provider) else {
            continue;
        };
        model_providers.insert(model.clone(), provider.clone());
        detected.models.push(model.clone());
        detected.function_calling |= caps.function_calling;
        detected.vision |= caps.vision;
    }

    source.update_status(|status| {
        status.model_providers = model_providers;
        status.detected = Some(detected);
    });
}

/// Bounded error text, cut at a character boundary
pub fn truncate(message: &str) -> String {
    if message.len() <= MAX_ERROR_BODY {
        return message.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
