//! Default [`DocumentStore`]: Postgres for content, Qdrant for similarity.

use serde_json::{Map, Value};
use uuid::Uuid;

use lectern_domain::document::{Document, ScoredDocument};
use lectern_storage::{db::Db, docs, models::DocumentRow, qdrant::QdrantStore};

use crate::{BoxFuture, DocumentStore, Result};

pub struct PgQdrantStore {
	pub db: Db,
	pub qdrant: QdrantStore,
}
impl PgQdrantStore {
	pub fn new(db: Db, qdrant: QdrantStore) -> Self {
		Self { db, qdrant }
	}
}

impl DocumentStore for PgQdrantStore {
	fn find_by_ids<'a>(
		&'a self,
		user_id: &'a str,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<Document>>> {
		Box::pin(async move {
			let rows = docs::find_documents_by_ids(&self.db.pool, user_id, ids).await?;

			Ok(rows.into_iter().map(document_from_row).collect())
		})
	}

	fn search_similar_with_score<'a>(
		&'a self,
		vector: Vec<f32>,
		top_k: u32,
		user_id: &'a str,
		min_score: f32,
	) -> BoxFuture<'a, Result<Vec<ScoredDocument>>> {
		Box::pin(async move {
			let hits = self.qdrant.search_similar(vector, top_k, user_id, min_score).await?;
			let mut out = Vec::with_capacity(hits.len());

			for hit in hits {
				let Some(document_id) = hit.document_id else {
					tracing::warn!(score = hit.score, "Vector point has no document id; skipping.");

					continue;
				};

				out.push(ScoredDocument {
					document: Document::new(document_id, hit.title.unwrap_or_default()),
					similarity: hit.score,
				});
			}

			Ok(out)
		})
	}
}

fn document_from_row(row: DocumentRow) -> Document {
	let metadata = match row.metadata {
		Value::Object(map) => map,
		_ => Map::new(),
	};

	Document {
		id: row.document_id,
		title: row.title.unwrap_or_default(),
		content: row.content,
		score: 0.0,
		metadata,
	}
}
