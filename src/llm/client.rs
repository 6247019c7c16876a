// src/llm/client.rs

use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{PipelineConfig, Provider};
use crate::error::PipelineError;
use crate::llm::prompt::LlmPrompt;

const PROMPT_ABI_VERSION: &str = "v1-unity-pipeline";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Which model slot a call runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallMode {
    Text,
    Json,
}

/// The seam between the orchestrator and the network. Tests replay
/// recorded responses through this trait.
pub trait ModelInvoker {
    /// Send a prompt and return the completion text verbatim.
    fn invoke_text(&self, prompt: &LlmPrompt) -> Result<String, PipelineError>;

    /// Send a prompt and parse the completion as JSON. A single markdown
    /// fence around the payload is tolerated and stripped first.
    fn invoke_json(&self, prompt: &LlmPrompt) -> Result<Value, PipelineError>;
}

pub struct LlmClient {
    cfg: PipelineConfig,
}

impl LlmClient {
    pub fn new(cfg: PipelineConfig) -> Self {
        Self { cfg }
    }

    fn run(&self, prompt: &LlmPrompt, mode: CallMode) -> Result<String, PipelineError> {
        let model = match mode {
            CallMode::Text => &self.cfg.text_model,
            CallMode::Json => &self.cfg.json_model,
        };

        let prompt_hash = hash_prompt(prompt);
        let (url, headers, body) = build_request(&self.cfg, model, prompt, &prompt_hash);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PipelineError::Invocation(e.to_string()))?;

        let mut req = client.post(url).json(&body);
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let resp = req
            .send()
            .map_err(|e| PipelineError::Invocation(e.to_string()))?;
        let status = resp.status();
        let json: Value = resp
            .json()
            .map_err(|e| PipelineError::Invocation(e.to_string()))?;

        if !status.is_success() {
            return Err(PipelineError::Invocation(format!(
                "model API error {status}: {json}"
            )));
        }

        if let Some(cached) = json
            .pointer("/usage/prompt_tokens_details/cached_tokens")
            .and_then(|v| v.as_u64())
        {
            debug!(model = %model, cached_tokens = cached, "prompt cache hit");
        }

        extract_text(self.cfg.provider, &json)
    }
}

impl ModelInvoker for LlmClient {
    fn invoke_text(&self, prompt: &LlmPrompt) -> Result<String, PipelineError> {
        self.run(prompt, CallMode::Text)
    }

    fn invoke_json(&self, prompt: &LlmPrompt) -> Result<Value, PipelineError> {
        let text = self.run(prompt, CallMode::Json)?;
        let cleaned = strip_code_fences(&text);
        serde_json::from_str(cleaned).map_err(PipelineError::Parse)
    }
}

fn hash_prompt(prompt: &LlmPrompt) -> String {
    let mut h = Sha256::new();
    h.update(PROMPT_ABI_VERSION.as_bytes());
    h.update(prompt.system.as_bytes());
    h.update(prompt.user.as_bytes());
    hex::encode(h.finalize())
}

fn build_request(
    cfg: &PipelineConfig,
    model: &str,
    prompt: &LlmPrompt,
    prompt_hash: &str,
) -> (String, Vec<(&'static str, String)>, Value) {
    match cfg.provider {
        Provider::OpenAI => {
            let url = cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1/responses".into());

            let body = serde_json::json!({
                "model": model,
                "instructions": prompt.system,
                "input": prompt.user,
                "prompt_cache_key": prompt_hash,
            });

            (
                url,
                vec![("Authorization", format!("Bearer {}", cfg.api_key))],
                body,
            )
        }

        Provider::Anthropic => {
            let url = cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.anthropic.com/v1/messages".into());

            let body = serde_json::json!({
                "model": model,
                "max_tokens": 4096,
                "system": prompt.system,
                "messages": [
                    { "role": "user", "content": prompt.user }
                ]
            });

            (
                url,
                vec![
                    ("x-api-key", cfg.api_key.clone()),
                    ("anthropic-version", "2023-06-01".into()),
                ],
                body,
            )
        }
    }
}

fn extract_text(provider: Provider, v: &Value) -> Result<String, PipelineError> {
    match provider {
        Provider::OpenAI => v
            .get("output")
            .and_then(|o| o.as_array())
            .and_then(|arr| {
                arr.iter().find_map(|item| {
                    item.get("content")?
                        .as_array()?
                        .iter()
                        .find_map(|c| c.get("text")?.as_str())
                })
            })
            .map(str::to_owned)
            .ok_or_else(|| PipelineError::Invocation("OpenAI response parse failure".into())),

        Provider::Anthropic => v
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| PipelineError::Invocation("Anthropic response parse failure".into())),
    }
}

/// Unwrap one surrounding markdown fence, info string included. Models are
/// told not to fence JSON output, but some do anyway.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let rest = match trimmed.strip_prefix("```") {
        Some(rest) => rest,
        None => return trimmed,
    };
    let body = match rest.strip_suffix("```") {
        Some(body) => body,
        None => return trimmed,
    };

    match body.find('\n') {
        // First fence line is an info string ("json", "c", ...).
        Some(idx) => body[idx + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn openai_cfg() -> PipelineConfig {
        PipelineConfig {
            provider: Provider::OpenAI,
            text_model: "text-model".into(),
            json_model: "json-model".into(),
            api_key: "sk-test".into(),
            base_url: None,
        }
    }

    fn anthropic_cfg() -> PipelineConfig {
        PipelineConfig {
            provider: Provider::Anthropic,
            text_model: "sonnet".into(),
            json_model: "haiku".into(),
            api_key: "ak-test".into(),
            base_url: None,
        }
    }

    fn prompt() -> LlmPrompt {
        LlmPrompt {
            system: "sys".into(),
            user: "user".into(),
        }
    }

    #[test]
    fn strips_fenced_json_with_info_string() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fences() {
        assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  [\"foo\"] \n"), "[\"foo\"]");
        assert_eq!(strip_code_fences("``` only opens"), "``` only opens");
    }

    #[test]
    fn openai_request_targets_responses_api_with_cache_key() {
        let cfg = openai_cfg();
        let (url, headers, body) = build_request(&cfg, "json-model", &prompt(), "abc123");

        assert_eq!(url, "https://api.openai.com/v1/responses");
        assert_eq!(body["model"], "json-model");
        assert_eq!(body["instructions"], "sys");
        assert_eq!(body["input"], "user");
        assert_eq!(body["prompt_cache_key"], "abc123");
        assert!(headers
            .iter()
            .any(|(k, v)| *k == "Authorization" && v == "Bearer sk-test"));
    }

    #[test]
    fn anthropic_request_sets_version_header_and_messages() {
        let cfg = anthropic_cfg();
        let (url, headers, body) = build_request(&cfg, "haiku", &prompt(), "abc123");

        assert_eq!(url, "https://api.anthropic.com/v1/messages");
        assert_eq!(body["model"], "haiku");
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][0]["content"], "user");
        assert!(headers.iter().any(|(k, _)| *k == "x-api-key"));
        assert!(headers
            .iter()
            .any(|(k, v)| *k == "anthropic-version" && v == "2023-06-01"));
    }

    #[test]
    fn base_url_override_wins() {
        let mut cfg = openai_cfg();
        cfg.base_url = Some("http://localhost:8080/v1/responses".into());
        let (url, _, _) = build_request(&cfg, "m", &prompt(), "h");
        assert_eq!(url, "http://localhost:8080/v1/responses");
    }

    #[test]
    fn extracts_text_from_both_provider_shapes() {
        let openai = json!({
            "output": [
                { "type": "reasoning" },
                { "content": [ { "type": "output_text", "text": "hello" } ] }
            ]
        });
        assert_eq!(extract_text(Provider::OpenAI, &openai).unwrap(), "hello");

        let anthropic = json!({
            "content": [ { "type": "text", "text": "hi" } ]
        });
        assert_eq!(extract_text(Provider::Anthropic, &anthropic).unwrap(), "hi");

        assert!(extract_text(Provider::OpenAI, &json!({})).is_err());
    }

    #[test]
    fn prompt_hash_is_stable_and_input_sensitive() {
        let a = hash_prompt(&prompt());
        let b = hash_prompt(&prompt());
        assert_eq!(a, b);

        let other = LlmPrompt {
            system: "sys".into(),
            user: "different".into(),
        };
        assert_ne!(a, hash_prompt(&other));
    }
}
