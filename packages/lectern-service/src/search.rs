//! Embedding-based candidate retrieval.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use lectern_domain::document::{self, Document, ScoredDocument};

use crate::{EmbeddingTask, LecternService, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
	/// Pushed down to the vector index. Zero disables index-side filtering.
	pub db_threshold: f32,
	/// Applied after retrieval. Candidates below it are dropped.
	pub logic_threshold: f32,
	pub top_k: u32,
}
impl Default for SearchConfig {
	fn default() -> Self {
		Self { db_threshold: 0.0, logic_threshold: 0.35, top_k: 10 }
	}
}
impl From<&lectern_config::Search> for SearchConfig {
	fn from(cfg: &lectern_config::Search) -> Self {
		Self { db_threshold: cfg.db_threshold, logic_threshold: cfg.logic_threshold, top_k: cfg.top_k }
	}
}

impl LecternService {
	/// Candidates for `query` within one user's collection, best first.
	///
	/// Embedding and retrieval failures are returned to the caller. An empty result is a valid
	/// "no matches" outcome. Every candidate gets its stored title and a snippet; a lone
	/// surviving candidate is hydrated with its full content.
	pub async fn search_documents(
		&self,
		query: &str,
		user_id: &str,
		search: SearchConfig,
	) -> Result<Vec<Document>> {
		let vector = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, query, EmbeddingTask::RetrievalQuery)
			.await?;
		let scored = self
			.store
			.search_similar_with_score(vector, search.top_k, user_id, search.db_threshold)
			.await?;
		let retrieved = scored.len();
		let candidates = select_candidates(scored, search.logic_threshold);

		tracing::debug!(
			retrieved,
			kept = candidates.len(),
			logic_threshold = search.logic_threshold,
			"Search candidates selected."
		);

		if candidates.is_empty() {
			return Ok(candidates);
		}

		Ok(self.hydrate_candidates(user_id, candidates).await)
	}

	async fn hydrate_candidates(&self, user_id: &str, candidates: Vec<Document>) -> Vec<Document> {
		let ids: Vec<Uuid> = candidates.iter().map(|doc| doc.id).collect();
		let snippet_chars = self.cfg.search.snippet_chars as usize;
		let loaded = match self.store.find_by_ids(user_id, &ids).await {
			Ok(docs) => docs,
			Err(err) => {
				tracing::warn!(error = %err, "Candidate hydration failed; keeping index titles.");

				return candidates;
			},
		};
		let mut by_id: HashMap<Uuid, Document> =
			loaded.into_iter().map(|doc| (doc.id, doc)).collect();
		// Decided on survivors so a stale index hit cannot leave the lone result as a snippet.
		let full_content =
			candidates.iter().filter(|candidate| by_id.contains_key(&candidate.id)).count() == 1;
		let mut out = Vec::with_capacity(candidates.len());

		for mut candidate in candidates {
			let Some(stored) = by_id.remove(&candidate.id) else {
				tracing::warn!(
					document_id = %candidate.id,
					"Indexed document is missing from the store; dropping candidate."
				);

				continue;
			};

			if !stored.title.trim().is_empty() {
				candidate.title = stored.title;
			}

			candidate.metadata = stored.metadata;
			candidate.content = if full_content {
				stored.content
			} else {
				document::snippet(&stored.content, snippet_chars)
			};

			out.push(candidate);
		}

		out
	}
}

/// Drops results under `logic_threshold`, orders by descending similarity, and keeps the first
/// occurrence of each document.
pub fn select_candidates(mut scored: Vec<ScoredDocument>, logic_threshold: f32) -> Vec<Document> {
	scored.retain(|hit| hit.similarity.is_finite() && hit.similarity >= logic_threshold);
	scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(scored.len());

	for hit in scored {
		if !seen.insert(hit.document.id) {
			continue;
		}

		out.push(hit.document.with_score(hit.similarity));
	}

	out
}
