use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
	RetrievalQuery,
}
impl EmbeddingTask {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::RetrievalQuery => "query",
		}
	}
}

pub async fn embed(
	cfg: &lectern_config::EmbeddingProviderConfig,
	text: &str,
	task: EmbeddingTask,
) -> Result<Vec<f32>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = build_embedding_body(cfg, text, task);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_embedding_response(json)
}

fn build_embedding_body(
	cfg: &lectern_config::EmbeddingProviderConfig,
	text: &str,
	task: EmbeddingTask,
) -> Value {
	let mut body = serde_json::json!({
		"model": cfg.model,
		"input": [text],
		"dimensions": cfg.dimensions,
	});

	if let Some(field) = cfg.task_type_field.as_deref()
		&& let Some(map) = body.as_object_mut()
	{
		map.insert(field.to_string(), Value::String(task.as_str().to_string()));
	}

	body
}

fn parse_embedding_response(json: Value) -> Result<Vec<f32>> {
	let item = json
		.get("data")
		.and_then(|v| v.as_array())
		.and_then(|data| data.first())
		.ok_or_else(|| eyre::eyre!("Embedding response is missing data array."))?;
	let embedding = item
		.get("embedding")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding item missing embedding array."))?;
	let mut vec = Vec::with_capacity(embedding.len());

	for value in embedding {
		let number =
			value.as_f64().ok_or_else(|| eyre::eyre!("Embedding value must be numeric."))?;
		vec.push(number as f32);
	}

	if vec.is_empty() {
		return Err(eyre::eyre!("Embedding response returned an empty vector."));
	}

	Ok(vec)
}
