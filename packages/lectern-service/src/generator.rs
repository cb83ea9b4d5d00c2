//! Phase three: answer from the grounded notes.

use lectern_domain::{
	chat::ChatMessage,
	context::GroundedContext,
	intent::Scope,
};

use crate::{LecternService, LlmOptions};

/// Reply used when answer generation fails. Generation is never retried.
pub const ANSWER_APOLOGY: &str =
	"Sorry, I couldn't put together an answer right now. Please try again in a moment.";
/// Marks grounded answer prompts.
pub const GROUNDED_MARKER: &str = "GROUNDED REFERENCE";
/// Marks history-only answer instructions.
pub const HISTORY_ONLY_MARKER: &str = "CONVERSATION ONLY";

const EXECUTION_RULES: &str = "\
EXECUTION RULES:
1. Answer the request directly. Do not describe what the notes are about unless asked.
2. Extract the relevant facts from ALL notes above, not only the first one.
3. When the answer involves numbers, show the calculation steps.
4. Always finish with a final, concrete answer.
5. Do not add numbered citation markers such as [1] or (source 2); sources are attached \
separately.
6. When the user asks for \"all\" or \"every\" item, be exhaustive and list each one.
7. Use only the notes above. If they do not contain the answer, say so plainly.
8. Reply in the language the user is writing in.";

impl LecternService {
	pub async fn generate_from_grounded_context(
		&self,
		query: &str,
		ctx: &GroundedContext,
		history: &[ChatMessage],
	) -> String {
		let messages = build_answer_messages(query, ctx, history);
		let options = LlmOptions::default();

		match self.providers.llm.chat(&self.cfg.providers.llm, &messages, &options).await {
			Ok(reply) => reply.trim().to_string(),
			Err(err) => {
				tracing::error!(
					scope = ctx.scope.as_str(),
					notes = ctx.notes.len(),
					error = %err,
					"Answer generation failed."
				);

				ANSWER_APOLOGY.to_string()
			},
		}
	}
}

fn build_answer_messages(
	query: &str,
	ctx: &GroundedContext,
	history: &[ChatMessage],
) -> Vec<ChatMessage> {
	let mut messages = history.to_vec();

	if ctx.scope == Scope::None {
		messages.push(ChatMessage::system(format!(
			"[{HISTORY_ONLY_MARKER}] Answer only from the conversation history above. No notes are \
provided for this question. Reply in the language the user is writing in."
		)));
		messages.push(ChatMessage::user(query));
	} else {
		messages.push(ChatMessage::user(build_grounded_prompt(query, ctx)));
	}

	messages
}

pub fn build_grounded_prompt(query: &str, ctx: &GroundedContext) -> String {
	let mut out = String::from("CONTEXT MENU:\n");

	for (idx, candidate) in ctx.candidates.iter().enumerate() {
		out.push_str(&format!("{}. {}\n", idx + 1, candidate.title));
	}

	if ctx.focus_index > 0 {
		let title = ctx
			.candidates
			.get(ctx.focus_index - 1)
			.map(|candidate| candidate.title.as_str())
			.unwrap_or_default();

		out.push_str(&format!(
			"The user selected item #{}: \"{title}\". Answer about that note.\n",
			ctx.focus_index
		));
	} else if ctx.scope == Scope::All {
		out.push_str("The user asked about all listed notes together.\n");
	}

	out.push_str(&format!("\n{GROUNDED_MARKER}:\n"));

	for note in &ctx.notes {
		out.push_str(&format!(
			"--- START OF NOTE: {title} ---\n{content}\n--- END OF NOTE: {title} ---\n\n",
			title = note.title,
			content = note.content.trim()
		));
	}

	out.push_str(EXECUTION_RULES);
	out.push_str(&format!("\n\nUSER REQUEST:\n{query}"));

	out
}
