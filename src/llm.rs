//! Hosted LLM client.
//!
//! Sends `{context, question}` to a Gemini-style `generateContent` endpoint
//! and returns the reply text. A chat turn never fails: structurally absent
//! replies become a fixed fallback string, and transport or provider errors
//! are formatted as an `Error: ...` reply rendered inline in the transcript.

use anyhow::Result;
use std::time::Duration;

use crate::config::LlmConfig;

/// Returned when the response body lacks `candidates[0].content.parts[0].text`.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response.";

/// Label prefixed to the context block sent ahead of the question.
const CONTEXT_LABEL: &str = "Lecture Notes Context:";

/// Stand-in when a failure carries no message at all, e.g. a provider
/// error payload whose `error.message` is an empty string.
const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Explicitly constructed LLM client, passed through server state rather
/// than held in a global. Construction validates configuration (API key
/// present, endpoint well-formed) so a bad deployment fails at startup.
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} not set", config.api_key_env))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// One chat turn. Infallible by contract: every failure mode is folded
    /// into the returned reply string.
    pub async fn generate(&self, context: Option<&str>, question: &str) -> String {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = build_request(context, question);

        let resp = match self.http.post(&url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => return format_error_reply(&e.to_string()),
        };

        let status = resp.status();
        let json: serde_json::Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => return format_error_reply(&e.to_string()),
        };

        if !status.is_success() {
            return format_error_reply(&provider_error_message(&json, status.as_u16()));
        }

        reply_text(&json)
    }
}

/// Request body: ordered parts, a labeled context block when present
/// followed by the raw question.
fn build_request(context: Option<&str>, question: &str) -> serde_json::Value {
    let mut parts = Vec::new();
    if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
        parts.push(serde_json::json!({ "text": format!("{}\n{}", CONTEXT_LABEL, ctx) }));
    }
    parts.push(serde_json::json!({ "text": question }));
    serde_json::json!({ "contents": [ { "parts": parts } ] })
}

/// Reads `candidates[0].content.parts[0].text`, falling back to
/// [`FALLBACK_REPLY`] when the path is absent or not a string.
fn reply_text(json: &serde_json::Value) -> String {
    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

/// Human-readable message for a provider error payload. Prefers the
/// provider's own `error.message`; falls back to the HTTP status.
fn provider_error_message(json: &serde_json::Value, status: u16) -> String {
    json.pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("provider returned HTTP {}", status))
}

/// Renders any failure as the assistant's reply. Blank messages get the
/// [`UNKNOWN_ERROR`] stand-in so the reply is never a bare `Error: `.
fn format_error_reply(message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        return format!("Error: {}", UNKNOWN_ERROR);
    }
    format!("Error: {}", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_with_context_has_two_parts() {
        let body = build_request(Some("T1\n\nT2"), "What is covered?");
        let parts = body.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 2);
        let ctx = parts[0]["text"].as_str().unwrap();
        assert!(ctx.starts_with("Lecture Notes Context:\n"));
        assert!(ctx.contains("T1"));
        assert_eq!(parts[1]["text"], "What is covered?");
    }

    #[test]
    fn request_without_context_has_one_part() {
        let body = build_request(None, "hello");
        let parts = body.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "hello");
    }

    #[test]
    fn blank_context_is_treated_as_absent() {
        let body = build_request(Some("   "), "hello");
        let parts = body.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn well_formed_response_yields_text() {
        let json = serde_json::json!({
            "candidates": [ { "content": { "parts": [ { "text": "The lecture covers memory." } ] } } ]
        });
        assert_eq!(reply_text(&json), "The lecture covers memory.");
    }

    #[test]
    fn malformed_response_yields_fallback() {
        assert_eq!(reply_text(&serde_json::json!({})), FALLBACK_REPLY);
        assert_eq!(
            reply_text(&serde_json::json!({ "candidates": [] })),
            FALLBACK_REPLY
        );
        assert_eq!(
            reply_text(&serde_json::json!({ "candidates": [ { "content": {} } ] })),
            FALLBACK_REPLY
        );
    }

    #[test]
    fn provider_error_message_is_surfaced_verbatim() {
        let json = serde_json::json!({ "error": { "message": "quota exceeded" } });
        let reply = format_error_reply(&provider_error_message(&json, 429));
        assert_eq!(reply, "Error: quota exceeded");
    }

    #[test]
    fn blank_error_message_gets_unknown_stand_in() {
        let json = serde_json::json!({ "error": { "message": "" } });
        let reply = format_error_reply(&provider_error_message(&json, 500));
        assert_eq!(reply, "Error: An unknown error occurred");
        assert_eq!(format_error_reply("  "), "Error: An unknown error occurred");
    }

    #[test]
    fn unshaped_provider_error_falls_back_to_status() {
        let json = serde_json::json!({ "weird": true });
        let reply = format_error_reply(&provider_error_message(&json, 503));
        assert_eq!(reply, "Error: provider returned HTTP 503");
    }
}
