use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::System => "system",
			Self::User => "user",
			Self::Assistant => "assistant",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: Role,
	pub content: String,
}
impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: Role::System, content: content.into() }
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self { role: Role::User, content: content.into() }
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self { role: Role::Assistant, content: content.into() }
	}
}

/// The trailing `window` messages of `history`.
pub fn recent(history: &[ChatMessage], window: usize) -> &[ChatMessage] {
	&history[history.len().saturating_sub(window)..]
}

pub fn render_transcript(history: &[ChatMessage]) -> String {
	let mut out = String::new();

	for message in history {
		if message.role == Role::System {
			continue;
		}

		out.push_str(message.role.as_str());
		out.push_str(": ");
		out.push_str(message.content.trim());
		out.push('\n');
	}

	out
}
