use regex::Regex;
use serde_json::Value;

const FENCED_BLOCK: &str = r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```";

/// Pulls the first JSON object out of model output that may wrap it in a fenced block or prose.
pub fn extract_json_object(text: &str) -> Option<Value> {
	let trimmed = text.trim();

	if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
		return Some(value);
	}
	if let Some(inner) = Regex::new(FENCED_BLOCK)
		.ok()
		.and_then(|re| re.captures(trimmed))
		.and_then(|caps| caps.get(1))
		&& let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(inner.as_str())
	{
		return Some(value);
	}

	let start = trimmed.find('{')?;
	let end = trimmed.rfind('}')?;

	if end <= start {
		return None;
	}

	match serde_json::from_str::<Value>(&trimmed[start..=end]) {
		Ok(value @ Value::Object(_)) => Some(value),
		_ => None,
	}
}

/// Reads an integer that the model may have emitted as a number, a float, or a numeric string.
pub fn lenient_i64(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number
			.as_i64()
			.or_else(|| number.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64)),
		Value::String(text) => text.trim().trim_start_matches('#').parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_bare_object() {
		let value = extract_json_object(r#"{"action":"SEARCH"}"#).expect("object");

		assert_eq!(value["action"], "SEARCH");
	}

	#[test]
	fn parses_fenced_object() {
		let text = "Here you go:\n```json\n{\"relevant\": [1, 2]}\n```\nDone.";
		let value = extract_json_object(text).expect("object");

		assert_eq!(value["relevant"][1], 2);
	}

	#[test]
	fn parses_object_surrounded_by_prose() {
		let value = extract_json_object("Sure! {\"action\": \"BROWSE\"} hope that helps").expect("object");

		assert_eq!(value["action"], "BROWSE");
	}

	#[test]
	fn rejects_non_objects() {
		assert!(extract_json_object("[1, 2, 3]").is_none());
		assert!(extract_json_object("no json here").is_none());
		assert!(extract_json_object("} {").is_none());
	}

	#[test]
	fn reads_lenient_integers() {
		assert_eq!(lenient_i64(&serde_json::json!(2)), Some(2));
		assert_eq!(lenient_i64(&serde_json::json!(3.0)), Some(3));
		assert_eq!(lenient_i64(&serde_json::json!("#4")), Some(4));
		assert_eq!(lenient_i64(&serde_json::json!(1.5)), None);
		assert_eq!(lenient_i64(&serde_json::json!(null)), None);
	}
}
