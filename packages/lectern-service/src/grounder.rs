//! Phase two: bind an intent to a validated set of source notes.
//!
//! Every branch either produces a [`GroundedContext`] to answer from or a reply that asks the
//! user for something. Session changes go through the transitions on [`Session`], so the
//! focused/browsing invariant holds after every branch.

use std::slice;

use lectern_domain::{
	chat::ChatMessage,
	context::GroundedContext,
	document::Document,
	intent::{Action, Explicitness, Intent},
	session::{Focus, Mode, Session},
};

use crate::{LecternService, Notice, SearchConfig};

/// Direct reply when retrieval itself fails.
pub const SEARCH_UNAVAILABLE: &str =
	"I couldn't search your notes just now. Please try again in a moment.";
/// Direct reply when the notes to combine cannot be loaded.
pub const AGGREGATE_UNAVAILABLE: &str =
	"I couldn't load those notes just now. Please try again in a moment.";

#[derive(Debug, Clone, PartialEq)]
pub enum Grounding {
	/// Sources are bound; generate an answer.
	Answer(GroundedContext),
	/// Do not answer yet. The text goes to the user as is.
	Reply(String),
}
impl Grounding {
	pub fn should_answer(&self) -> bool {
		matches!(self, Self::Answer(_))
	}
}

impl LecternService {
	pub async fn ground(
		&self,
		intent: &Intent,
		session: &mut Session,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		let grounding = match &intent.action {
			Action::Search { query: search_query } =>
				self.ground_search(intent, session, search_query, query, history).await,
			Action::Focus { target } => self.ground_focus(*target, session, query, history).await,
			Action::Aggregate { query: seed } =>
				self.ground_aggregate(intent, seed.as_deref(), session, query, history).await,
			Action::Answer => self.ground_answer(session, query, history).await,
			Action::Browse => self.browse(session, query, history).await,
			Action::MetaAnalysis => {
				session.set_mode(Mode::Nuance);

				Grounding::Answer(GroundedContext::history_only(session.candidate_views()))
			},
			Action::Clarify =>
				if session.candidates().is_empty() {
					self.notice(Notice::Clarify, query, history).await
				} else {
					self.browse(session, query, history).await
				},
		};

		tracing::info!(
			session_id = session.id(),
			action = intent.action.name(),
			should_answer = grounding.should_answer(),
			state = ?session.state(),
			candidates = session.candidates().len(),
			"Intent grounded."
		);

		grounding
	}

	async fn ground_search(
		&self,
		intent: &Intent,
		session: &mut Session,
		search_query: &str,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		let search = SearchConfig::from(&self.cfg.search);
		let mut found = match self.search_documents(search_query, session.user_id(), search).await
		{
			Ok(found) => found,
			Err(err) => {
				tracing::warn!(session_id = session.id(), error = %err, "Search failed.");

				return Grounding::Reply(SEARCH_UNAVAILABLE.to_string());
			},
		};

		match found.len() {
			0 => return self.notice(Notice::NotFound, query, history).await,
			1 => {
				let doc = found.swap_remove(0);

				return self.focus_single_result(session, doc, true, query, history).await;
			},
			_ => {},
		}

		let mut narrowed = self.narrow(search_query, found).await;

		match narrowed.len() {
			0 => self.notice(Notice::NotFound, query, history).await,
			1 => {
				let doc = narrowed.swap_remove(0);

				self.focus_single_result(session, doc, false, query, history).await
			},
			_ if intent.explicitness == Explicitness::High =>
				self.aggregate(session, narrowed, query, history).await,
			_ => {
				session.to_browsing(narrowed);
				session.set_mode(Mode::Rag);

				let candidates = session.candidate_views();

				self.notice(Notice::Ambiguity { candidates }, query, history).await
			},
		}
	}

	async fn ground_focus(
		&self,
		target: i64,
		session: &mut Session,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		let count = session.candidates().len();
		let Some(idx) = usize::try_from(target).ok().filter(|idx| *idx < count) else {
			tracing::info!(session_id = session.id(), target, count, "Selection out of range.");

			return self.notice(Notice::InvalidSelection { count }, query, history).await;
		};
		let candidate = session.candidates()[idx].clone();
		let doc = match self.load_one(session.user_id(), &candidate).await {
			Some(doc) => doc,
			None => return Grounding::Reply(open_failed(&candidate)),
		};

		session.to_focused(doc.clone());
		session.set_mode(Mode::Rag);

		Grounding::Answer(GroundedContext::single(&doc, session.candidate_views(), idx + 1))
	}

	async fn ground_aggregate(
		&self,
		intent: &Intent,
		seed: Option<&str>,
		session: &mut Session,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		if !session.candidates().is_empty() {
			let candidates = session.candidates().to_vec();

			return self.aggregate(session, candidates, query, history).await;
		}

		let reasoning = intent.reasoning.trim();
		let seed = match seed {
			Some(seed) => seed,
			None if !reasoning.is_empty() => reasoning,
			None => query,
		};
		let search = SearchConfig::from(&self.cfg.search);
		let found = match self.search_documents(seed, session.user_id(), search).await {
			Ok(found) => found,
			Err(err) => {
				tracing::warn!(session_id = session.id(), error = %err, "Aggregate search failed.");

				return Grounding::Reply(SEARCH_UNAVAILABLE.to_string());
			},
		};
		let narrowed = self.narrow(seed, found).await;

		if narrowed.is_empty() {
			return self.notice(Notice::NotFound, query, history).await;
		}

		self.aggregate(session, narrowed, query, history).await
	}

	async fn ground_answer(
		&self,
		session: &mut Session,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		if session.mode() == Mode::Nuance {
			session.set_mode(Mode::Rag);
		}

		match session.focus().cloned() {
			None if session.candidates().is_empty() =>
				self.notice(Notice::LostContext, query, history).await,
			None => self.browse(session, query, history).await,
			Some(Focus::Aggregated { .. }) => self.expand_aggregated(session, query, history).await,
			Some(Focus::Single(doc)) => {
				let doc = if doc.has_content() {
					doc
				} else {
					let user_id = session.user_id().to_string();

					match self.load_full(&user_id, slice::from_ref(&doc)).await {
						Ok(mut docs) if !docs.is_empty() => {
							let full = docs.swap_remove(0);

							session.refresh(slice::from_ref(&full));

							full
						},
						Ok(_) => {
							tracing::warn!(
								session_id = session.id(),
								document_id = %doc.id,
								"Focused document is gone."
							);

							let remaining = session
								.candidates()
								.iter()
								.filter(|candidate| candidate.id != doc.id)
								.cloned()
								.collect();

							session.to_browsing(remaining);

							return self.notice(Notice::LostContext, query, history).await;
						},
						Err(err) => {
							tracing::warn!(
								session_id = session.id(),
								document_id = %doc.id,
								error = %err,
								"Focused document reload failed."
							);

							return Grounding::Reply(open_failed(&doc));
						},
					}
				};
				let focus_index = session.focus_index().max(1);

				Grounding::Answer(GroundedContext::single(&doc, session.candidate_views(), focus_index))
			},
		}
	}

	/// Turns the aggregated focus back into one note per candidate so citations stay per document.
	async fn expand_aggregated(
		&self,
		session: &mut Session,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		let missing: Vec<Document> =
			session.candidates().iter().filter(|doc| !doc.has_content()).cloned().collect();

		if !missing.is_empty() {
			let user_id = session.user_id().to_string();

			match self.load_full(&user_id, &missing).await {
				Ok(docs) => session.refresh(&docs),
				Err(err) => tracing::warn!(
					session_id = session.id(),
					missing = missing.len(),
					error = %err,
					"Aggregated notes reload failed; answering from the rest."
				),
			}
		}

		let notes: Vec<Document> =
			session.candidates().iter().filter(|doc| doc.has_content()).cloned().collect();

		if notes.is_empty() {
			return self.notice(Notice::LostContext, query, history).await;
		}

		Grounding::Answer(GroundedContext::aggregated(&notes, session.candidate_views()))
	}

	async fn aggregate(
		&self,
		session: &mut Session,
		candidates: Vec<Document>,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		let docs = match self.load_full(session.user_id(), &candidates).await {
			Ok(docs) => docs,
			Err(err) => {
				tracing::warn!(session_id = session.id(), error = %err, "Aggregate load failed.");

				return Grounding::Reply(AGGREGATE_UNAVAILABLE.to_string());
			},
		};

		if docs.is_empty() {
			return self.notice(Notice::NotFound, query, history).await;
		}

		let content = aggregate_content(&docs);

		session.to_aggregated(docs.clone(), content);
		session.set_mode(Mode::Rag);

		Grounding::Answer(GroundedContext::aggregated(&docs, session.candidate_views()))
	}

	async fn focus_single_result(
		&self,
		session: &mut Session,
		doc: Document,
		hydrated: bool,
		query: &str,
		history: &[ChatMessage],
	) -> Grounding {
		let doc = if hydrated && doc.has_content() {
			doc
		} else {
			match self.load_full(session.user_id(), slice::from_ref(&doc)).await {
				Ok(mut docs) if !docs.is_empty() => docs.swap_remove(0),
				Ok(_) => return self.notice(Notice::NotFound, query, history).await,
				Err(err) => {
					tracing::warn!(document_id = %doc.id, error = %err, "Document load failed.");

					return Grounding::Reply(open_failed(&doc));
				},
			}
		};

		session.to_browsing(vec![doc.clone()]);
		session.to_focused(doc.clone());
		session.set_mode(Mode::Rag);

		Grounding::Answer(GroundedContext::single(&doc, session.candidate_views(), 1))
	}

	async fn browse(&self, session: &Session, query: &str, history: &[ChatMessage]) -> Grounding {
		if session.candidates().is_empty() {
			return self.notice(Notice::NothingLoaded, query, history).await;
		}

		let candidates = session.candidate_views();

		self.notice(Notice::Browse { candidates }, query, history).await
	}

	async fn narrow(&self, query: &str, candidates: Vec<Document>) -> Vec<Document> {
		let keep = self.filter_relevant(query, &candidates).await;

		candidates
			.into_iter()
			.enumerate()
			.filter(|(idx, _)| keep.binary_search(idx).is_ok())
			.map(|(_, doc)| doc)
			.collect()
	}

	async fn load_one(&self, user_id: &str, doc: &Document) -> Option<Document> {
		match self.load_full(user_id, slice::from_ref(doc)).await {
			Ok(mut docs) if !docs.is_empty() => Some(docs.swap_remove(0)),
			Ok(_) => None,
			Err(err) => {
				tracing::warn!(document_id = %doc.id, error = %err, "Document load failed.");

				None
			},
		}
	}

	async fn notice(&self, notice: Notice, query: &str, history: &[ChatMessage]) -> Grounding {
		Grounding::Reply(self.compose_notice(&notice, query, history).await)
	}
}

/// One body for the aggregated focus, a titled section per note in candidate order.
pub fn aggregate_content(docs: &[Document]) -> String {
	docs.iter()
		.map(|doc| format!("## {}\n\n{}", doc.display_title(), doc.content.trim()))
		.collect::<Vec<_>>()
		.join("\n\n")
}

fn open_failed(doc: &Document) -> String {
	format!(
		"I couldn't open \"{}\" right now. Please try again, or pick another note.",
		doc.display_title()
	)
}
