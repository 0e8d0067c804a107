use crate::types::{Classification, DigestError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// External text-inference capability. An adapter instance is constructed
/// explicitly and passed into the pipeline — there is no process-wide client,
/// which keeps tests trivial to wire up with a mock.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Provider name for diagnostics.
    fn adapter_name(&self) -> &str;

    /// One completion call: a fixed system instruction plus a user payload.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

pub type DynLlmAdapter = Arc<dyn LlmAdapter>;

/// OpenAI chat-completions adapter. Requires an API key; the model can be
/// overridden per instance.
pub struct OpenAiAdapter {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("weekly-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn adapter_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            max_tokens: 400,
        };

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| DigestError::Adapter(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Adapter(format!("HTTP {}", status)));
        }

        let body: Resp = response
            .json()
            .await
            .map_err(|e| DigestError::Adapter(e.to_string()))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(DigestError::Adapter("empty completion".to_string()));
        }
        debug!("Completion received ({} chars)", content.len());
        Ok(content)
    }
}

/// Decode a classification verdict from a model response. Two stages: a
/// strict parse of the whole response, then a documented lenient fallback
/// that re-parses the first `{` .. last `}` slice (models occasionally wrap
/// the JSON in prose or a code fence). Anything else is an explicit decode
/// failure, which callers turn into a per-item keyword fallback.
pub fn decode_verdict(raw: &str) -> Result<Classification> {
    if let Ok(verdict) = serde_json::from_str::<Classification>(raw.trim()) {
        return Ok(verdict);
    }

    let start = raw.find('{');
    let end = raw.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(verdict) = serde_json::from_str::<Classification>(&raw[start..=end]) {
                debug!("Verdict decoded via lenient extraction");
                return Ok(verdict);
            }
        }
    }

    Err(DigestError::Decode(format!(
        "no JSON verdict in response: {}",
        raw.chars().take(120).collect::<String>()
    )))
}

/// Deterministic adapter for tests: returns a fixed response, or fails every
/// call when constructed with `failing()`.
pub struct MockLlmAdapter {
    response: Option<String>,
}

impl MockLlmAdapter {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Err(DigestError::Adapter("simulated outage".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_verdict_parses() {
        let verdict = decode_verdict(
            r#"{"include": true, "category": "Security", "tags": ["cve"], "summary": "A fix."}"#,
        )
        .unwrap();
        assert!(verdict.include);
        assert_eq!(verdict.category, "Security");
        assert_eq!(verdict.tags, vec!["cve"]);
    }

    #[test]
    fn fenced_verdict_decodes_leniently() {
        let raw = "Sure, here is the verdict:\n```json\n{\"include\": false, \"category\": \"Community\"}\n```";
        let verdict = decode_verdict(raw).unwrap();
        assert!(!verdict.include);
        assert_eq!(verdict.category, "Community");
        assert!(verdict.tags.is_empty());
        assert!(verdict.summary.is_none());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_verdict("I cannot classify this item.").unwrap_err();
        assert!(matches!(err, DigestError::Decode(_)));
    }
}
