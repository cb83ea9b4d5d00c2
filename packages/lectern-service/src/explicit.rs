//! Answers over notes the caller attached directly, skipping intent resolution and grounding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use lectern_domain::{
	chat::ChatMessage,
	context::GroundedContext,
	document::{Citation, Document},
	session::Mode,
};

use crate::{LecternService, Result, grounder};

/// Reply when none of the attached notes could be loaded.
pub const NO_ATTACHED_NOTES: &str =
	"I couldn't load any of the attached notes. They may have been deleted or moved.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplicitTurnRequest {
	pub user_id: String,
	pub session_id: String,
	pub query: String,
	/// Attached notes. Entries without content are loaded by id.
	pub documents: Vec<Document>,
	#[serde(default)]
	pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplicitTurnResponse {
	pub reply: String,
	pub citations: Vec<Citation>,
}

impl LecternService {
	pub async fn execute_with_context(
		&self,
		req: ExplicitTurnRequest,
	) -> Result<ExplicitTurnResponse> {
		crate::validate_turn(&req.user_id, &req.session_id, &req.query)?;

		let _guard = self.sessions.lock(&req.session_id).await;
		let mut session = self.sessions.load_or_create(&req.session_id, &req.user_id)?;
		let docs = self.hydrate_attached(&req.user_id, req.documents).await;

		if docs.is_empty() {
			tracing::warn!(session_id = %req.session_id, "No attached notes could be loaded.");

			return Ok(ExplicitTurnResponse {
				reply: NO_ATTACHED_NOTES.to_string(),
				citations: Vec::new(),
			});
		}

		session.record_query(&req.query);

		let ctx = if docs.len() == 1 {
			let doc = &docs[0];

			session.to_browsing(vec![doc.clone()]);
			session.to_focused(doc.clone());

			GroundedContext::single(doc, session.candidate_views(), 1)
		} else {
			session.to_aggregated(docs.clone(), grounder::aggregate_content(&docs));

			GroundedContext::aggregated(&docs, session.candidate_views())
		};

		session.set_mode(Mode::Bypass);
		self.sessions.put(session);

		tracing::info!(
			session_id = %req.session_id,
			notes = ctx.notes.len(),
			"Explicit context bound."
		);

		let reply = self.generate_from_grounded_context(&req.query, &ctx, &req.history).await;

		Ok(ExplicitTurnResponse { reply, citations: ctx.citations() })
	}

	/// Deduplicates by id, keeps attached content, and loads the rest from `user_id`'s notes.
	/// Notes that cannot be loaded are logged and skipped.
	async fn hydrate_attached(&self, user_id: &str, documents: Vec<Document>) -> Vec<Document> {
		let mut seen = HashSet::new();
		let documents: Vec<Document> =
			documents.into_iter().filter(|doc| seen.insert(doc.id)).collect();
		let missing: Vec<Document> =
			documents.iter().filter(|doc| !doc.has_content()).cloned().collect();

		if missing.is_empty() {
			return documents;
		}

		let loaded = match self.load_full(user_id, &missing).await {
			Ok(loaded) => loaded,
			Err(err) => {
				tracing::warn!(
					missing = missing.len(),
					error = %err,
					"Attached notes could not be loaded."
				);

				Vec::new()
			},
		};

		documents
			.into_iter()
			.filter_map(|doc| {
				if doc.has_content() {
					return Some(doc);
				}

				loaded.iter().find(|full| full.id == doc.id).cloned()
			})
			.collect()
	}
}
