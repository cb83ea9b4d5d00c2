mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Conversation, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Qdrant,
	Search, Service, Session, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		ParseFailure::Toml(source) => Error::ParseConfig { path: path.to_path_buf(), source },
		ParseFailure::Invalid(err) => err,
	})
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	parse(raw).map_err(|err| match err {
		ParseFailure::Toml(source) =>
			Error::ParseConfig { path: std::path::PathBuf::from("<inline>"), source },
		ParseFailure::Invalid(err) => err,
	})
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, value) in [
		("search.db_threshold", cfg.search.db_threshold),
		("search.logic_threshold", cfg.search.logic_threshold),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.snippet_chars == 0 {
		return Err(Error::Validation {
			message: "search.snippet_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.session.ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "session.ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.session.max_sessions == 0 {
		return Err(Error::Validation {
			message: "session.max_sessions must be greater than zero.".to_string(),
		});
	}
	if cfg.conversation.history_window == 0 {
		return Err(Error::Validation {
			message: "conversation.history_window must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("providers.llm.temperature", cfg.providers.llm.temperature),
		("conversation.messenger_temperature", cfg.conversation.messenger_temperature),
	] {
		if !value.is_finite() || !(0.0..=2.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number in the range 0.0-2.0."),
			});
		}
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("llm", &cfg.providers.llm.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

enum ParseFailure {
	Toml(toml::de::Error),
	Invalid(Error),
}

fn parse(raw: &str) -> std::result::Result<Config, ParseFailure> {
	let mut cfg: Config = toml::from_str(raw).map_err(ParseFailure::Toml)?;

	normalize(&mut cfg);

	validate(&cfg).map_err(ParseFailure::Invalid)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.embedding
		.task_type_field
		.as_deref()
		.map(|field| field.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.embedding.task_type_field = None;
	}
}
