use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const UNTITLED: &str = "Untitled";

/// A note from the user's collection. `content` is hydrated progressively: empty or a snippet
/// while the document is only a candidate, full text once it is focused or aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub id: Uuid,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub score: f32,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}
impl Document {
	pub fn new(id: Uuid, title: impl Into<String>) -> Self {
		Self { id, title: title.into(), content: String::new(), score: 0.0, metadata: Map::new() }
	}

	pub fn with_content(mut self, content: impl Into<String>) -> Self {
		self.content = content.into();

		self
	}

	pub fn with_score(mut self, score: f32) -> Self {
		self.score = score;

		self
	}

	pub fn has_content(&self) -> bool {
		!self.content.trim().is_empty()
	}

	pub fn display_title(&self) -> &str {
		let trimmed = self.title.trim();

		if trimmed.is_empty() { UNTITLED } else { trimmed }
	}

	pub fn view(&self) -> CandidateView {
		CandidateView { id: self.id, title: self.display_title().to_string(), score: self.score }
	}

	pub fn citation(&self) -> Citation {
		Citation { document_id: self.id, title: self.display_title().to_string() }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
	pub document: Document,
	pub similarity: f32,
}

/// Metadata-only view of a candidate, safe to hand to prompts and callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateView {
	pub id: Uuid,
	pub title: String,
	pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
	pub document_id: Uuid,
	pub title: String,
}

/// Returns at most `max_chars` characters of `content`, cut at a char boundary and trimmed.
pub fn snippet(content: &str, max_chars: usize) -> String {
	let trimmed = content.trim();

	match trimmed.char_indices().nth(max_chars) {
		Some((end, _)) => format!("{}...", trimmed[..end].trim_end()),
		None => trimmed.to_string(),
	}
}
