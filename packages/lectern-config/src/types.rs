use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub session: Session,
	#[serde(default)]
	pub conversation: Conversation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Optional. Request body field that carries the embedding task type, e.g. "input_type".
	#[serde(default)]
	pub task_type_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Minimum similarity pushed down to the vector index. Zero disables index-side filtering.
	pub db_threshold: f32,
	/// Minimum similarity a candidate needs to survive retrieval.
	pub logic_threshold: f32,
	pub top_k: u32,
	pub snippet_chars: u32,
	pub semantic_filter: bool,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			db_threshold: 0.0,
			logic_threshold: 0.35,
			top_k: 10,
			snippet_chars: 280,
			semantic_filter: true,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Session {
	pub ttl_seconds: u64,
	pub max_sessions: u64,
}
impl Default for Session {
	fn default() -> Self {
		Self { ttl_seconds: 3_600, max_sessions: 10_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Conversation {
	/// Number of trailing history messages forwarded to conversational (non-answer) prompts.
	pub history_window: u32,
	pub messenger_temperature: f32,
}
impl Default for Conversation {
	fn default() -> Self {
		Self { history_window: 6, messenger_temperature: 0.3 }
	}
}
