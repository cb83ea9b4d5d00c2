use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use lectern_domain::chat::ChatMessage;

/// Per-call overrides on top of the configured provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmOptions {
	pub temperature: Option<f32>,
	pub model: Option<String>,
}
impl LlmOptions {
	pub fn deterministic() -> Self {
		Self { temperature: Some(0.0), model: None }
	}

	pub fn with_temperature(temperature: f32) -> Self {
		Self { temperature: Some(temperature), model: None }
	}
}

pub async fn generate(
	cfg: &lectern_config::LlmProviderConfig,
	prompt: &str,
	options: &LlmOptions,
) -> Result<String> {
	chat(cfg, &[ChatMessage::user(prompt)], options).await
}

pub async fn chat(
	cfg: &lectern_config::LlmProviderConfig,
	messages: &[ChatMessage],
	options: &LlmOptions,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = build_chat_body(cfg, messages, options);
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_chat_response(json)
}

fn build_chat_body(
	cfg: &lectern_config::LlmProviderConfig,
	messages: &[ChatMessage],
	options: &LlmOptions,
) -> Value {
	serde_json::json!({
		"model": options.model.as_deref().unwrap_or(cfg.model.as_str()),
		"temperature": options.temperature.unwrap_or(cfg.temperature),
		"messages": messages,
	})
}

fn parse_chat_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Chat response is missing message content."))?;

	if content.trim().is_empty() {
		return Err(eyre::eyre!("Chat response content is empty."));
	}

	Ok(content.to_string())
}
