//! Conversational state for one chat thread.
//!
//! The session has two rooms: the candidate list (what was last shown to the user) and the focus
//! (what answers are currently grounded on). Fields are private so that every mutation goes
//! through one of the transitions below, each of which leaves `state()` and `focus()` in
//! agreement: the session is focused exactly when a focus is set.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::document::{CandidateView, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
	Browsing,
	Focused,
}

/// Which path produced the current answer source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
	/// Grounded on retrieved notes.
	#[default]
	Rag,
	/// Grounded on notes the caller attached directly.
	Bypass,
	/// Answered from conversation history alone.
	Nuance,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Focus {
	Single(Document),
	/// Every candidate at once. The sections of `content` follow candidate order.
	Aggregated { content: String },
}

#[derive(Debug, Clone)]
pub struct Session {
	id: String,
	user_id: String,
	mode: Mode,
	candidates: Vec<Document>,
	focus: Option<Focus>,
	last_query: Option<String>,
	updated_at: OffsetDateTime,
}
impl Session {
	pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			user_id: user_id.into(),
			mode: Mode::default(),
			candidates: Vec::new(),
			focus: None,
			last_query: None,
			updated_at: OffsetDateTime::now_utc(),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn user_id(&self) -> &str {
		&self.user_id
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	pub fn candidates(&self) -> &[Document] {
		&self.candidates
	}

	pub fn focus(&self) -> Option<&Focus> {
		self.focus.as_ref()
	}

	pub fn last_query(&self) -> Option<&str> {
		self.last_query.as_deref()
	}

	pub fn updated_at(&self) -> OffsetDateTime {
		self.updated_at
	}

	pub fn state(&self) -> SessionState {
		if self.focus.is_some() { SessionState::Focused } else { SessionState::Browsing }
	}

	/// The focused document, unless the focus is the aggregated view.
	pub fn focused_document(&self) -> Option<&Document> {
		match self.focus.as_ref()? {
			Focus::Single(doc) => Some(doc),
			Focus::Aggregated { .. } => None,
		}
	}

	pub fn is_aggregated(&self) -> bool {
		matches!(self.focus, Some(Focus::Aggregated { .. }))
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty() && self.focus.is_none()
	}

	/// 1-based position of the focused document within the candidates, or 0.
	pub fn focus_index(&self) -> usize {
		let Some(doc) = self.focused_document() else {
			return 0;
		};

		self.candidates
			.iter()
			.position(|candidate| candidate.id == doc.id)
			.map(|idx| idx + 1)
			.unwrap_or(0)
	}

	pub fn candidate_views(&self) -> Vec<CandidateView> {
		self.candidates.iter().map(Document::view).collect()
	}

	pub fn set_mode(&mut self, mode: Mode) {
		self.mode = mode;
		self.touch();
	}

	pub fn record_query(&mut self, query: &str) {
		self.last_query = Some(query.to_string());
		self.touch();
	}

	/// Focus on one document. The document replaces its own entry in the candidate list; when it
	/// was not a candidate, it becomes the only candidate.
	pub fn to_focused(&mut self, doc: Document) {
		match self.candidates.iter_mut().find(|candidate| candidate.id == doc.id) {
			Some(slot) => *slot = doc.clone(),
			None => self.candidates = vec![doc.clone()],
		}

		self.focus = Some(Focus::Single(doc));
		self.touch();
	}

	pub fn to_browsing(&mut self, candidates: Vec<Document>) {
		self.candidates = candidates;
		self.focus = None;
		self.touch();
	}

	/// Focus on all `candidates` at once. An empty candidate list leaves nothing to aggregate and
	/// resets the session to browsing.
	pub fn to_aggregated(&mut self, candidates: Vec<Document>, content: String) {
		if candidates.is_empty() {
			self.to_browsing(candidates);

			return;
		}

		self.candidates = candidates;
		self.focus = Some(Focus::Aggregated { content });
		self.touch();
	}

	/// Replaces stored candidates (and a matching single focus) with freshly hydrated copies.
	pub fn refresh(&mut self, docs: &[Document]) {
		for doc in docs {
			if let Some(slot) = self.candidates.iter_mut().find(|candidate| candidate.id == doc.id) {
				*slot = doc.clone();
			}
			if let Some(Focus::Single(focused)) = self.focus.as_mut()
				&& focused.id == doc.id
			{
				*focused = doc.clone();
			}
		}

		self.touch();
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		let focused = match self.focus.as_ref() {
			Some(Focus::Single(doc)) =>
				Some(FocusedView::Single { id: doc.id, title: doc.display_title().to_string() }),
			Some(Focus::Aggregated { .. }) =>
				Some(FocusedView::Aggregated { count: self.candidates.len() }),
			None => None,
		};

		SessionSnapshot {
			session_id: self.id.clone(),
			state: self.state(),
			mode: self.mode,
			candidates: self.candidate_views(),
			focused,
			last_query: self.last_query.clone(),
		}
	}

	fn touch(&mut self) {
		self.updated_at = OffsetDateTime::now_utc();
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FocusedView {
	Single { id: Uuid, title: String },
	Aggregated { count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
	pub session_id: String,
	pub state: SessionState,
	pub mode: Mode,
	pub candidates: Vec<CandidateView>,
	pub focused: Option<FocusedView>,
	pub last_query: Option<String>,
}
