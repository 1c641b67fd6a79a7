//! One timed JSON request/response exchange with a provider endpoint

use anyhow::{Context, Result, anyhow};
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// What came back from a provider, plus how long it took
#[derive(Debug)]
pub(crate) struct Exchange {
    pub latency_ms: u64,
    /// Parsed body on 2xx, otherwise the human-readable failure
    pub outcome: std::result::Result<Value, String>,
}

/// Send `request` with a hard `timeout` and read the whole body.
///
/// Latency covers the send and the full body read. A 2xx body that is not
/// valid JSON yields `Value::Null` so the adapter falls back to empty fields.
pub(crate) async fn post_json(provider: &str, request: RequestBuilder, timeout: Duration) -> Exchange {
    let started = Instant::now();
    let outcome = send(provider, request.timeout(timeout)).await;
    let latency_ms = elapsed_ms(started);

    let outcome = outcome.map_err(|e| format!("{:#}", e));
    if let Err(err) = &outcome {
        debug!("{} call failed after {}ms: {}", provider, latency_ms, err);
    }
    Exchange { latency_ms, outcome }
}

async fn send(provider: &str, request: RequestBuilder) -> Result<Value> {
    let response = request
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", provider))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read {} response body", provider))?;

    if !status.is_success() {
        // Non-2xx keeps the provider's own error text
        return Err(if body.trim().is_empty() {
            anyhow!("{} API request failed with status {}", provider, status)
        } else {
            anyhow!(body)
        });
    }

    Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
        debug!("{} returned a non-JSON body: {}", provider, e);
        Value::Null
    }))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// `value[key]` as a string, if present and a string
pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Concatenate `text` from every element of an array of parts/blocks,
/// optionally keeping only those whose `type` matches
pub(crate) fn join_text(parts: Option<&Value>, only_type: Option<&str>) -> String {
    parts
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|p| match only_type {
                    Some(t) => p.get("type").and_then(Value::as_str) == Some(t),
                    None => true,
                })
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_str_field() {
        let v = json!({"a": "x", "b": 1});
        assert_eq!(str_field(&v, "a").as_deref(), Some("x"));
        assert!(str_field(&v, "b").is_none());
        assert!(str_field(&v, "c").is_none());
        assert!(str_field(&Value::Null, "a").is_none());
    }

    #[test]
    fn test_join_text_filters_by_type() {
        let blocks = json!([
            {"type": "text", "text": "Hello, "},
            {"type": "tool_use", "text": "ignored"},
            {"type": "text", "text": "world"},
        ]);
        assert_eq!(join_text(Some(&blocks), Some("text")), "Hello, world");
        assert_eq!(join_text(Some(&blocks), None), "Hello, ignoredworld");
        assert_eq!(join_text(None, None), "");
        assert_eq!(join_text(Some(&json!("not an array")), None), "");
    }
}
