//! LLM narrowing of a multi-candidate search result.

use serde::Deserialize;
use serde_json::Value;

use lectern_domain::{document::Document, json};

use crate::{LecternService, LlmOptions};

/// Marks relevance-filter prompts.
pub const RELEVANCE_MARKER: &str = "RELEVANCE FILTER";

#[derive(Debug, Deserialize)]
struct RelevanceOutput {
	relevant: Vec<Value>,
}

impl LecternService {
	/// Indices (0-based, ascending) of the candidates that answer `query`.
	///
	/// With the filter disabled or fewer than two candidates every index is kept. A failed call or
	/// unreadable output also keeps every index; an explicit empty list keeps none.
	pub async fn filter_relevant(&self, query: &str, candidates: &[Document]) -> Vec<usize> {
		let all: Vec<usize> = (0..candidates.len()).collect();

		if !self.cfg.search.semantic_filter || candidates.len() < 2 {
			return all;
		}

		let prompt = build_relevance_prompt(query, candidates);
		let raw = match self
			.providers
			.llm
			.generate(&self.cfg.providers.llm, &prompt, &LlmOptions::deterministic())
			.await
		{
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(error = %err, "Relevance filter failed; keeping all candidates.");

				return all;
			},
		};

		match parse_relevant(&raw, candidates.len()) {
			Some(kept) => {
				tracing::debug!(
					candidates = candidates.len(),
					kept = kept.len(),
					"Relevance filter applied."
				);

				kept
			},
			None => {
				tracing::warn!("Relevance filter returned invalid JSON; keeping all candidates.");

				all
			},
		}
	}
}

fn build_relevance_prompt(query: &str, candidates: &[Document]) -> String {
	let mut menu = String::new();

	for (idx, doc) in candidates.iter().enumerate() {
		menu.push_str(&format!("{}. {}\n", idx + 1, doc.display_title()));

		if doc.has_content() {
			menu.push_str(&format!("   {}\n", doc.content.trim().replace('\n', " ")));
		}
	}

	format!(
		"[{RELEVANCE_MARKER}]\n\
You decide which notes from a search result actually answer the user's request.\n\
Keep a note only when it is about what the user asked for. A note that merely shares a word \
with the request is not relevant.\n\n\
USER REQUEST:\n{query}\n\n\
CANDIDATES:\n{menu}\n\
Respond with JSON only, in the form {{\"relevant\": [1, 3]}}, listing the numbers of the \
relevant notes. Use an empty list when none are relevant."
	)
}

/// Parses `{"relevant": [...]}` with 1-based entries into sorted, deduplicated 0-based indices.
/// Entries outside `1..=count` are dropped.
fn parse_relevant(raw: &str, count: usize) -> Option<Vec<usize>> {
	let value = json::extract_json_object(raw)?;
	let output: RelevanceOutput = serde_json::from_value(value).ok()?;
	let mut kept: Vec<usize> = output
		.relevant
		.iter()
		.filter_map(json::lenient_i64)
		.filter(|number| *number >= 1 && (*number as u64) <= count as u64)
		.map(|number| number as usize - 1)
		.collect();

	kept.sort_unstable();
	kept.dedup();

	Some(kept)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_one_based_indices_and_drops_out_of_range() {
		assert_eq!(parse_relevant(r#"{"relevant": [3, 1, 9, 0, 1]}"#, 3), Some(vec![0, 2]));
	}

	#[test]
	fn explicit_empty_list_keeps_nothing() {
		assert_eq!(parse_relevant("```json\n{\"relevant\": []}\n```", 4), Some(Vec::new()));
	}

	#[test]
	fn unreadable_output_is_rejected() {
		assert_eq!(parse_relevant("Notes 1 and 2 look relevant.", 2), None);
		assert_eq!(parse_relevant(r#"{"keep": [1]}"#, 2), None);
	}
}
