use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Result, models::DocumentRow};

/// Loads the given documents of one user with full content. Unknown ids and documents owned by
/// other users are absent from the result and the result order is unspecified.
pub async fn find_documents_by_ids<'e, E>(
	executor: E,
	user_id: &str,
	ids: &[Uuid],
) -> Result<Vec<DocumentRow>>
where
	E: PgExecutor<'e>,
{
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, DocumentRow>(
		"\
SELECT
\tdocument_id,
\ttitle,
\tCOALESCE(content, '') AS content,
\tCOALESCE(metadata, '{}'::jsonb) AS metadata,
\tupdated_at
FROM documents
WHERE document_id = ANY($1) AND user_id = $2 AND deleted_at IS NULL",
	)
	.bind(ids)
	.bind(user_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
