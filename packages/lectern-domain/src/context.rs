use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	document::{CandidateView, Citation, Document},
	intent::Scope,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedNote {
	pub id: Uuid,
	pub title: String,
	pub content: String,
}
impl From<&Document> for GroundedNote {
	fn from(doc: &Document) -> Self {
		Self { id: doc.id, title: doc.display_title().to_string(), content: doc.content.clone() }
	}
}

/// The validated source set one answer is generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedContext {
	pub notes: Vec<GroundedNote>,
	pub candidates: Vec<CandidateView>,
	pub scope: Scope,
	pub focused_id: Option<Uuid>,
	/// 1-based index of the focused note within `candidates`, 0 when nothing was picked.
	pub focus_index: usize,
	/// Ids of every grounded note, in note order. These become the reply citations.
	pub ids: Vec<Uuid>,
}
impl GroundedContext {
	pub fn single(doc: &Document, candidates: Vec<CandidateView>, focus_index: usize) -> Self {
		Self {
			notes: vec![GroundedNote::from(doc)],
			candidates,
			scope: Scope::Single,
			focused_id: Some(doc.id),
			focus_index,
			ids: vec![doc.id],
		}
	}

	pub fn aggregated(docs: &[Document], candidates: Vec<CandidateView>) -> Self {
		let notes: Vec<GroundedNote> = docs.iter().map(GroundedNote::from).collect();
		let ids = notes.iter().map(|note| note.id).collect();

		Self { notes, candidates, scope: Scope::All, focused_id: None, focus_index: 0, ids }
	}

	/// No sources: the answer comes from the conversation itself.
	pub fn history_only(candidates: Vec<CandidateView>) -> Self {
		Self {
			notes: Vec::new(),
			candidates,
			scope: Scope::None,
			focused_id: None,
			focus_index: 0,
			ids: Vec::new(),
		}
	}

	pub fn citations(&self) -> Vec<Citation> {
		self.ids
			.iter()
			.filter_map(|id| {
				self.notes
					.iter()
					.find(|note| note.id == *id)
					.map(|note| Citation { document_id: note.id, title: note.title.clone() })
			})
			.collect()
	}
}
