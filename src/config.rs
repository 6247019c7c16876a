// src/config.rs

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl Provider {
    pub fn parse(name: &str) -> Result<Self, String> {
        match name {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(format!("unknown provider `{other}` (expected openai | anthropic)")),
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Resolved provider configuration for one run. The two model identifiers
/// are independent on purpose: JSON-mode stages (function selection,
/// condition exploration) and free-text stages (summaries, test code) can
/// run against different models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub provider: Provider,
    pub text_model: String,
    pub json_model: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

impl PipelineConfig {
    pub fn default_for(provider: Provider) -> Self {
        let (text_model, json_model) = match provider {
            Provider::OpenAI => ("gpt-5.2", "gpt-5.2-mini"),
            Provider::Anthropic => ("claude-sonnet-4-5", "claude-haiku-4-5"),
        };

        PipelineConfig {
            provider,
            text_model: text_model.to_string(),
            json_model: json_model.to_string(),
            api_key: String::new(),
            base_url: None,
        }
    }
}

/// Merge the defaults file with CLI overrides. The API key is filled from
/// the provider's environment variable when nothing else supplied one.
pub fn resolve(
    provider: Option<&str>,
    text_model: Option<String>,
    json_model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
) -> Result<PipelineConfig, String> {
    let mut cfg = match provider {
        Some(name) => {
            let provider = Provider::parse(name)?;
            // A saved config for a different provider must not leak its
            // models or key into this run.
            load_config()
                .filter(|c| c.provider == provider)
                .unwrap_or_else(|| PipelineConfig::default_for(provider))
        }
        None => load_config().unwrap_or_else(|| PipelineConfig::default_for(Provider::OpenAI)),
    };

    if let Some(model) = text_model {
        cfg.text_model = model;
    }
    if let Some(model) = json_model {
        cfg.json_model = model;
    }
    if let Some(url) = base_url {
        cfg.base_url = Some(url);
    }
    if let Some(key) = api_key {
        cfg.api_key = key;
    }

    if cfg.api_key.trim().is_empty() {
        if let Ok(key) = env::var(cfg.provider.api_key_var()) {
            cfg.api_key = key;
        }
    }

    Ok(cfg)
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("unitforge/llm.json")
}

fn load_config() -> Option<PipelineConfig> {
    fs::read_to_string(config_path())
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
}

/// Persist the resolved config (key included) as the new defaults.
pub fn save_config(cfg: &PipelineConfig) -> std::io::Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(cfg).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_text_and_json_models_independent() {
        let cfg = PipelineConfig::default_for(Provider::OpenAI);
        assert_ne!(cfg.text_model, cfg.json_model);

        let cfg = PipelineConfig::default_for(Provider::Anthropic);
        assert_ne!(cfg.text_model, cfg.json_model);
    }

    #[test]
    fn provider_parse_accepts_known_names_only() {
        assert_eq!(Provider::parse("openai").unwrap(), Provider::OpenAI);
        assert_eq!(Provider::parse("anthropic").unwrap(), Provider::Anthropic);
        assert!(Provider::parse("OpenAI").is_err());
        assert!(Provider::parse("ollama").is_err());
    }

    #[test]
    fn key_env_var_follows_provider() {
        assert_eq!(Provider::OpenAI.api_key_var(), "OPENAI_API_KEY");
        assert_eq!(Provider::Anthropic.api_key_var(), "ANTHROPIC_API_KEY");
    }
}
