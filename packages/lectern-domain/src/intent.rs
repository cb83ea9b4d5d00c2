//! What the user wants to do this turn.
//!
//! The resolver model answers with loosely shaped JSON. It is validated into [`Intent`] right
//! after parsing; anything that does not validate is replaced by [`Intent::fallback`], which only
//! looks at the session and therefore always makes progress.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{json, session::Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
	All,
	Single,
	None,
}
impl Scope {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::All => "ALL",
			Self::Single => "SINGLE",
			Self::None => "NONE",
		}
	}

	fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_uppercase().as_str() {
			"ALL" => Some(Self::All),
			"SINGLE" => Some(Self::Single),
			"NONE" => Some(Self::None),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Explicitness {
	/// A directly executable command.
	High,
	/// A clear goal with an ambiguous scope.
	Medium,
	/// Vague or exploratory.
	Low,
}
impl Explicitness {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::High => "HIGH",
			Self::Medium => "MEDIUM",
			Self::Low => "LOW",
		}
	}

	fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_uppercase().as_str() {
			"HIGH" => Some(Self::High),
			"MEDIUM" => Some(Self::Medium),
			"LOW" => Some(Self::Low),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
	Search { query: String },
	/// `target` is a 0-based candidate index. It is not range checked here.
	Focus { target: i64 },
	/// `query` seeds a search when there are no candidates to aggregate.
	Aggregate { query: Option<String> },
	Answer,
	Browse,
	MetaAnalysis,
	Clarify,
}
impl Action {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Search { .. } => "SEARCH",
			Self::Focus { .. } => "FOCUS",
			Self::Aggregate { .. } => "AGGREGATE",
			Self::Answer => "ANSWER",
			Self::Browse => "BROWSE",
			Self::MetaAnalysis => "META_ANALYSIS",
			Self::Clarify => "CLARIFY",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRejectReason {
	MissingJsonObject,
	InvalidShape,
	UnknownAction,
	MissingTarget,
}
impl IntentRejectReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::MissingJsonObject => "missing_json_object",
			Self::InvalidShape => "invalid_shape",
			Self::UnknownAction => "unknown_action",
			Self::MissingTarget => "missing_target",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
	pub action: Action,
	pub scope: Scope,
	pub explicitness: Explicitness,
	pub confidence: f32,
	/// Model rationale. Logged, never shown to the user.
	pub reasoning: String,
}
impl Intent {
	/// Validates model output. `utterance` stands in for a missing SEARCH query.
	pub fn parse(raw: &str, utterance: &str) -> Result<Self, IntentRejectReason> {
		let value = json::extract_json_object(raw).ok_or(IntentRejectReason::MissingJsonObject)?;

		Self::from_value(value, utterance)
	}

	pub fn from_value(value: Value, utterance: &str) -> Result<Self, IntentRejectReason> {
		let raw: RawIntent =
			serde_json::from_value(value).map_err(|_| IntentRejectReason::InvalidShape)?;
		let query = raw
			.query
			.as_deref()
			.map(str::trim)
			.filter(|query| !query.is_empty())
			.map(str::to_string);
		let action = match raw.action.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str()
		{
			"SEARCH" =>
				Action::Search { query: query.unwrap_or_else(|| utterance.trim().to_string()) },
			"FOCUS" => {
				let target = raw
					.target
					.as_ref()
					.and_then(json::lenient_i64)
					.ok_or(IntentRejectReason::MissingTarget)?;

				// The model counts from 1, the same way the candidate menu is numbered.
				Action::Focus {
					target: target.checked_sub(1).ok_or(IntentRejectReason::InvalidShape)?,
				}
			},
			"AGGREGATE" => Action::Aggregate { query },
			"ANSWER" => Action::Answer,
			"BROWSE" => Action::Browse,
			"META_ANALYSIS" => Action::MetaAnalysis,
			"CLARIFY" => Action::Clarify,
			_ => return Err(IntentRejectReason::UnknownAction),
		};
		let scope = raw.scope.as_deref().and_then(Scope::parse).unwrap_or(match action {
			Action::Aggregate { .. } => Scope::All,
			Action::MetaAnalysis | Action::Browse | Action::Clarify => Scope::None,
			_ => Scope::Single,
		});
		let explicitness =
			raw.explicitness.as_deref().and_then(Explicitness::parse).unwrap_or(Explicitness::Medium);
		let confidence = raw
			.confidence
			.as_ref()
			.and_then(|value| match value {
				Value::Number(number) => number.as_f64(),
				Value::String(text) => text.trim().parse().ok(),
				_ => None,
			})
			.filter(|value| value.is_finite())
			.map(|value| value.clamp(0.0, 1.0) as f32)
			.unwrap_or(0.5);

		Ok(Self {
			action,
			scope,
			explicitness,
			confidence,
			reasoning: raw.reasoning.unwrap_or_default(),
		})
	}

	/// Session-only decision used when the resolver call fails or its output does not validate.
	pub fn fallback(utterance: &str, session: &Session) -> Self {
		let (action, scope) = if session.is_empty() {
			(Action::Search { query: utterance.to_string() }, Scope::Single)
		} else if session.focused_document().is_some() {
			(Action::Answer, Scope::Single)
		} else {
			(Action::Browse, Scope::None)
		};

		Self {
			action,
			scope,
			explicitness: Explicitness::Medium,
			confidence: 0.0,
			reasoning: "Rule-based fallback.".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct RawIntent {
	action: String,
	#[serde(default)]
	target: Option<Value>,
	#[serde(default)]
	query: Option<String>,
	#[serde(default)]
	scope: Option<String>,
	#[serde(default)]
	explicitness: Option<String>,
	#[serde(default)]
	confidence: Option<Value>,
	#[serde(default)]
	reasoning: Option<String>,
}
