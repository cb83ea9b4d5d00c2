pub mod explicit;
pub mod generator;
pub mod grounder;
pub mod intent;
pub mod messenger;
pub mod pipeline;
pub mod relevance;
pub mod search;
pub mod sessions;
pub mod store;

mod error;

pub use error::{Error, Result};
pub use explicit::{ExplicitTurnRequest, ExplicitTurnResponse};
pub use grounder::Grounding;
pub use lectern_providers::{embedding::EmbeddingTask, llm::LlmOptions};
pub use messenger::Notice;
pub use pipeline::{ChatTurnRequest, ChatTurnResponse};
pub use search::SearchConfig;
pub use sessions::{SessionGuard, SessionStore};
pub use store::PgQdrantStore;

use std::{future::Future, pin::Pin, sync::Arc};

use uuid::Uuid;

use lectern_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use lectern_domain::{
	chat::ChatMessage,
	document::{Document, ScoredDocument},
};
use lectern_providers::{embedding, llm};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
		task: EmbeddingTask,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait LlmProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		options: &'a LlmOptions,
	) -> BoxFuture<'a, color_eyre::Result<String>>;

	fn chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		options: &'a LlmOptions,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Read path into the user's document collection.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	/// Full documents for `ids` owned by `user_id`. Unknown ids and other users' documents are
	/// omitted; order is not guaranteed.
	fn find_by_ids<'a>(
		&'a self,
		user_id: &'a str,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<Document>>>;

	/// Similarity-scored documents of one user, best first. Returned documents carry at most a
	/// title.
	fn search_similar_with_score<'a>(
		&'a self,
		vector: Vec<f32>,
		top_k: u32,
		user_id: &'a str,
		min_score: f32,
	) -> BoxFuture<'a, Result<Vec<ScoredDocument>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub llm: Arc<dyn LlmProvider>,
}

pub struct LecternService {
	pub cfg: Config,
	pub store: Arc<dyn DocumentStore>,
	pub providers: Providers,
	pub sessions: SessionStore,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
		task: EmbeddingTask,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(embedding::embed(cfg, text, task))
	}
}

impl LlmProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		options: &'a LlmOptions,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(llm::generate(cfg, prompt, options))
	}

	fn chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
		options: &'a LlmOptions,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(llm::chat(cfg, messages, options))
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LlmProvider>) -> Self {
		Self { embedding, llm }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), llm: provider }
	}
}

impl LecternService {
	pub fn new(cfg: Config, store: Arc<dyn DocumentStore>) -> Self {
		Self::with_providers(cfg, store, Providers::default())
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn DocumentStore>, providers: Providers) -> Self {
		let sessions = SessionStore::new(&cfg.session);

		Self { cfg, store, providers, sessions }
	}

	/// Full-content copies of `docs`, in input order. Documents the store no longer has are
	/// logged and skipped. Scores and non-empty titles of the inputs are kept.
	pub(crate) async fn load_full(&self, user_id: &str, docs: &[Document]) -> Result<Vec<Document>> {
		let ids: Vec<Uuid> = docs.iter().map(|doc| doc.id).collect();
		let mut loaded = self.store.find_by_ids(user_id, &ids).await?;
		let mut out = Vec::with_capacity(docs.len());

		for doc in docs {
			let Some(pos) = loaded.iter().position(|full| full.id == doc.id) else {
				tracing::warn!(document_id = %doc.id, "Document is missing from the store; skipping.");

				continue;
			};
			let mut full = loaded.swap_remove(pos);

			if full.title.trim().is_empty() {
				full.title = doc.title.clone();
			}

			full.score = doc.score;

			out.push(full);
		}

		Ok(out)
	}
}

pub(crate) fn validate_turn(user_id: &str, session_id: &str, query: &str) -> Result<()> {
	for (label, value) in [("user_id", user_id), ("session_id", session_id), ("query", query)] {
		if value.trim().is_empty() {
			return Err(Error::InvalidRequest { message: format!("{label} must be non-empty.") });
		}
	}

	Ok(())
}
