/// English name of the language `text` is written in, when detection is reliable.
pub fn language_hint(text: &str) -> Option<&'static str> {
	let info = whatlang::detect(text)?;

	if !info.is_reliable() {
		return None;
	}

	Some(info.lang().eng_name())
}
