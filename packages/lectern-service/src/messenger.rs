//! Non-answer replies in the user's language.
//!
//! Every notice is phrased by the LLM from the recent conversation. The English texts below are
//! used only when that call fails.

use lectern_domain::{
	chat::{self, ChatMessage, Role},
	document::CandidateView,
	language,
};

use crate::{LecternService, LlmOptions};

/// Marks messenger prompts.
pub const MESSENGER_MARKER: &str = "ADAPTIVE MESSENGER";

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
	/// Several notes match and the request did not say which.
	Ambiguity { candidates: Vec<CandidateView> },
	/// Show the current candidates again.
	Browse { candidates: Vec<CandidateView> },
	NotFound,
	Clarify,
	/// A selection outside `1..=count`.
	InvalidSelection { count: usize },
	/// A follow-up with no focus and no candidates to fall back on.
	LostContext,
	/// Nothing has been searched yet.
	NothingLoaded,
}
impl Notice {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Ambiguity { .. } => "ambiguity",
			Self::Browse { .. } => "browse",
			Self::NotFound => "not_found",
			Self::Clarify => "clarify",
			Self::InvalidSelection { .. } => "invalid_selection",
			Self::LostContext => "lost_context",
			Self::NothingLoaded => "nothing_loaded",
		}
	}

	fn candidates(&self) -> &[CandidateView] {
		match self {
			Self::Ambiguity { candidates } | Self::Browse { candidates } => candidates,
			_ => &[],
		}
	}

	fn task(&self) -> String {
		match self {
			Self::Ambiguity { candidates } => format!(
				"Several notes match the request. List them exactly as numbered below and ask which \
one the user means, mentioning they can also ask for all of them.\n{}",
				numbered(candidates)
			),
			Self::Browse { candidates } => format!(
				"Show the notes currently on the table, exactly as numbered below, and invite the \
user to pick one or ask a question.\n{}",
				numbered(candidates)
			),
			Self::NotFound => "No notes matched the request. Say so briefly and suggest rephrasing \
or searching for something else."
				.to_string(),
			Self::Clarify => "The request is unclear. Ask one short question to find out what the \
user is looking for in their notes."
				.to_string(),
			Self::InvalidSelection { count: 0 } => "The user picked a note by number, but there is \
no list to choose from. Suggest searching first."
				.to_string(),
			Self::InvalidSelection { count } => format!(
				"The user picked a number that is not on the list. Ask them to choose a number \
between 1 and {count}."
			),
			Self::LostContext => "The note under discussion is no longer available. Apologize \
briefly and ask the user to search for it again."
				.to_string(),
			Self::NothingLoaded => "No notes have been searched or opened yet. Invite the user to \
describe what they are looking for."
				.to_string(),
		}
	}

	/// English text for when the LLM call fails.
	pub fn fallback_text(&self) -> String {
		match self {
			Self::Ambiguity { candidates } => format!(
				"I found {} notes that might match. Which one do you mean?\n\n{}\n\nReply with a \
number, or say \"all of them\" to use every note.",
				candidates.len(),
				numbered(candidates)
			),
			Self::Browse { candidates } => format!(
				"Here are the notes we're looking at:\n\n{}\n\nPick a number or ask me a question \
about them.",
				numbered(candidates)
			),
			Self::NotFound => "I couldn't find any notes matching that. Could you try describing \
it differently?"
				.to_string(),
			Self::Clarify =>
				"Could you tell me a bit more about what you're looking for in your notes?"
					.to_string(),
			Self::InvalidSelection { count: 0 } =>
				"There's no list to choose from yet. Tell me what you're looking for and I'll \
search your notes."
					.to_string(),
			Self::InvalidSelection { count } => format!(
				"That number isn't on the list. Please choose a number between 1 and {count}."
			),
			Self::LostContext => "I've lost track of which note we were discussing. Could you \
search for it again?"
				.to_string(),
			Self::NothingLoaded => "We haven't looked at any notes yet. What would you like me to \
find?"
				.to_string(),
		}
	}
}

impl LecternService {
	pub async fn compose_notice(
		&self,
		notice: &Notice,
		query: &str,
		history: &[ChatMessage],
	) -> String {
		let window = self.cfg.conversation.history_window as usize;
		let messages = build_messenger_messages(notice, query, chat::recent(history, window));
		let options = LlmOptions::with_temperature(self.cfg.conversation.messenger_temperature);

		match self.providers.llm.chat(&self.cfg.providers.llm, &messages, &options).await {
			Ok(reply) => ensure_listed(reply.trim(), notice.candidates()),
			Err(err) => {
				tracing::warn!(
					notice = notice.kind(),
					error = %err,
					"Messenger call failed; using English fallback."
				);

				notice.fallback_text()
			},
		}
	}
}

fn numbered(candidates: &[CandidateView]) -> String {
	candidates
		.iter()
		.enumerate()
		.map(|(idx, view)| format!("{}. {}", idx + 1, view.title))
		.collect::<Vec<_>>()
		.join("\n")
}

fn build_messenger_messages(
	notice: &Notice,
	query: &str,
	history: &[ChatMessage],
) -> Vec<ChatMessage> {
	let language = match language::language_hint(query) {
		Some(name) => format!("The latest message appears to be written in {name}."),
		None => "Detect the language from the latest message and the conversation.".to_string(),
	};
	let mut messages = vec![ChatMessage::system(format!(
		"[{MESSENGER_MARKER}]\n\
You are the conversational voice of a personal notes assistant. Write a short, friendly reply \
in the same language the user is writing in. {language} Never invent note contents."
	))];

	messages.extend(history.iter().filter(|message| message.role != Role::System).cloned());
	messages.push(ChatMessage::user(format!(
		"LATEST USER MESSAGE:\n{query}\n\nTASK:\n{}",
		notice.task()
	)));

	messages
}

/// Appends the numbered list when the phrased reply left out any candidate title.
fn ensure_listed(reply: &str, candidates: &[CandidateView]) -> String {
	if candidates.iter().all(|view| reply.contains(view.title.as_str())) {
		return reply.to_string();
	}

	format!("{reply}\n\n{}", numbered(candidates))
}
