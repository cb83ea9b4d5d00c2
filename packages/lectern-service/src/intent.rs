//! Phase one: classify what the user wants to do next.

use lectern_domain::{
	chat::{self, ChatMessage},
	intent::Intent,
	session::{Focus, Session},
};

use crate::{LecternService, LlmOptions};

/// Marks intent-resolution prompts.
pub const INTENT_MARKER: &str = "INTENT RESOLVER";

const ACTION_CATALOG: &str = "\
ACTIONS:
- SEARCH: look for notes on a new topic. Set \"query\" to a concise search query.
- FOCUS: the user picks ONE of the listed notes, by number, by title, or by description. Set \
\"target\" to its number from the list.
- AGGREGATE: the user wants several or all listed notes used together (\"all of them\", \
\"compare them\", \"both\"). With no notes listed, set \"query\" to what should be gathered.
- ANSWER: a follow-up on the focused note or on the previous answer.
- BROWSE: the user wants to see the current list of notes again.
- META_ANALYSIS: the user asks about this conversation itself (what was said, a summary of \
the chat, what they asked before).
- CLARIFY: the request cannot be acted on without more information.

RULES:
- A singular reference to a listed note (\"the second one\", \"the one about taxes\") is FOCUS.
- A plural or group reference (\"these\", \"all\", \"every note\") is AGGREGATE.
- A question that continues the focused note or the previous answer is ANSWER, not SEARCH.
- A request about a topic not covered by the listed or focused notes is SEARCH.
- Questions about the conversation itself are META_ANALYSIS.

EXPLICITNESS:
- HIGH: a directly executable command with an unambiguous scope.
- MEDIUM: the goal is clear but the scope is ambiguous.
- LOW: vague or exploratory.";

const OUTPUT_SHAPE: &str = "\
Respond with one JSON object only:
{\"action\": \"SEARCH|FOCUS|AGGREGATE|ANSWER|BROWSE|META_ANALYSIS|CLARIFY\", \"target\": 1, \
\"query\": \"string\", \"scope\": \"ALL|SINGLE|NONE\", \"explicitness\": \"HIGH|MEDIUM|LOW\", \
\"confidence\": 0.0, \"reasoning\": \"string\"}
Omit \"target\" unless the action is FOCUS. Omit \"query\" unless the action is SEARCH or \
AGGREGATE.";

impl LecternService {
	/// Resolves the next action with one deterministic LLM call. Call or validation failures fall
	/// back to [`Intent::fallback`].
	pub async fn resolve_intent(
		&self,
		query: &str,
		history: &[ChatMessage],
		session: &Session,
	) -> Intent {
		let window = self.cfg.conversation.history_window as usize;
		let prompt = build_intent_prompt(query, chat::recent(history, window), session);
		let raw = match self
			.providers
			.llm
			.generate(&self.cfg.providers.llm, &prompt, &LlmOptions::deterministic())
			.await
		{
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(
					session_id = session.id(),
					error = %err,
					"Intent resolution failed; using rule-based fallback."
				);

				return Intent::fallback(query, session);
			},
		};

		match Intent::parse(&raw, query) {
			Ok(intent) => {
				tracing::info!(
					session_id = session.id(),
					action = intent.action.name(),
					scope = intent.scope.as_str(),
					explicitness = intent.explicitness.as_str(),
					confidence = intent.confidence,
					reasoning = %intent.reasoning,
					"Intent resolved."
				);

				intent
			},
			Err(reason) => {
				tracing::warn!(
					session_id = session.id(),
					reason = reason.as_str(),
					"Intent output rejected; using rule-based fallback."
				);

				Intent::fallback(query, session)
			},
		}
	}
}

pub(crate) fn describe_session(session: &Session) -> String {
	match session.focus() {
		Some(Focus::Single(doc)) => {
			let mut out = format!("FOCUSED_NOTE: \"{}\"", doc.display_title());

			if session.candidates().len() > 1 {
				out.push_str(&format!(
					" (item #{} of the list below)\n{}",
					session.focus_index(),
					numbered_titles(session)
				));
			}

			out
		},
		Some(Focus::Aggregated { .. }) => format!(
			"FOCUSED_NOTE: all {} listed notes combined\n{}",
			session.candidates().len(),
			numbered_titles(session)
		),
		None if !session.candidates().is_empty() =>
			format!("BROWSING_MODE: these notes are listed\n{}", numbered_titles(session)),
		None => "INITIAL_STATE: no notes have been found or selected yet.".to_string(),
	}
}

fn numbered_titles(session: &Session) -> String {
	session
		.candidates()
		.iter()
		.enumerate()
		.map(|(idx, doc)| format!("{}. {}", idx + 1, doc.display_title()))
		.collect::<Vec<_>>()
		.join("\n")
}

fn build_intent_prompt(query: &str, history: &[ChatMessage], session: &Session) -> String {
	let transcript = chat::render_transcript(history);
	let transcript = if transcript.is_empty() { "(none)\n".to_string() } else { transcript };

	format!(
		"[{INTENT_MARKER}]\n\
You classify the next step of a conversation about the user's personal notes. You never answer \
the request yourself.\n\n\
SESSION:\n{}\n\n\
RECENT CONVERSATION:\n{transcript}\n\
USER MESSAGE:\n{query}\n\n\
{ACTION_CATALOG}\n\n\
{OUTPUT_SHAPE}",
		describe_session(session)
	)
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use lectern_domain::document::Document;

	use super::*;

	#[test]
	fn describes_each_session_shape() {
		let mut session = Session::new("s", "u");

		assert!(describe_session(&session).starts_with("INITIAL_STATE"));

		let a = Document::new(Uuid::new_v4(), "Alpha");
		let b = Document::new(Uuid::new_v4(), "Beta");

		session.to_browsing(vec![a.clone(), b]);

		let browsing = describe_session(&session);

		assert!(browsing.starts_with("BROWSING_MODE"));
		assert!(browsing.contains("1. Alpha\n2. Beta"));

		session.to_focused(a);

		assert!(describe_session(&session).starts_with("FOCUSED_NOTE: \"Alpha\" (item #1"));
	}

	#[test]
	fn prompt_carries_query_and_history() {
		let session = Session::new("s", "u");
		let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
		let prompt = build_intent_prompt("find my taxes", &history, &session);

		assert!(prompt.starts_with("[INTENT RESOLVER]"));
		assert!(prompt.contains("user: hi\nassistant: hello\n"));
		assert!(prompt.contains("USER MESSAGE:\nfind my taxes"));
	}
}
