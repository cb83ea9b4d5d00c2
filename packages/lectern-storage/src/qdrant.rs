use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind,
};
use uuid::Uuid;

use crate::{Error, Result, models::SimilarityHit};

pub const DENSE_VECTOR_NAME: &str = "dense";
pub const DOCUMENT_ID_KEY: &str = "document_id";
pub const USER_ID_KEY: &str = "user_id";
pub const TITLE_KEY: &str = "title";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &lectern_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Nearest documents of one user, best first. `min_score` of zero disables index-side
	/// filtering.
	pub async fn search_similar(
		&self,
		vector: Vec<f32>,
		top_k: u32,
		user_id: &str,
		min_score: f32,
	) -> Result<Vec<SimilarityHit>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Query vector has {} dimensions; the collection expects {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.filter(user_filter(user_id))
			.limit(top_k as u64)
			.with_payload(true);

		if min_score > 0.0 {
			search = search.score_threshold(min_score);
		}

		let response = self.client.query(search).await?;

		Ok(response.result.iter().map(hit_from_point).collect())
	}
}

pub fn user_filter(user_id: &str) -> Filter {
	Filter::must([Condition::matches(USER_ID_KEY, user_id.to_string())])
}

pub fn hit_from_point(point: &ScoredPoint) -> SimilarityHit {
	SimilarityHit {
		document_id: payload_uuid(&point.payload, DOCUMENT_ID_KEY),
		title: payload_string(&point.payload, TITLE_KEY),
		score: point.score,
	}
}

fn payload_uuid(payload: &HashMap<String, Value>, key: &str) -> Option<Uuid> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Uuid::parse_str(text).ok(),
		_ => None,
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) if !text.trim().is_empty() => Some(text.to_string()),
		_ => None,
	}
}
