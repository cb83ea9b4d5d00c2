use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// A row of the `documents` table owned by the document service. Read-only from here.
#[derive(Debug, sqlx::FromRow)]
pub struct DocumentRow {
	pub document_id: Uuid,
	pub title: Option<String>,
	pub content: String,
	pub metadata: Value,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
	/// `None` when the point payload carries no parseable document id.
	pub document_id: Option<Uuid>,
	pub title: Option<String>,
	pub score: f32,
}
