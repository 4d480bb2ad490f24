mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Language, Matcher, Postgres, Service, Storage};

use std::{fs, path::Path};

pub const QUERY_MODES: [&str; 3] = ["plain", "phrase", "websearch"];
pub const UPPER_BOUNDS: [&str; 2] = ["registry_head", "language_watermark"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	validate_matcher(&cfg.matcher)?;

	if cfg.language.min_len == 0 {
		return Err(Error::Validation {
			message: "language.min_len must be greater than zero.".to_string(),
		});
	}
	if !cfg.language.min_confidence.is_finite() {
		return Err(Error::Validation {
			message: "language.min_confidence must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.language.min_confidence) {
		return Err(Error::Validation {
			message: "language.min_confidence must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.language.batch_size <= 0 {
		return Err(Error::Validation {
			message: "language.batch_size must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

/// Validates matcher settings on their own so CLI overrides can be re-checked after they are
/// applied on top of the file.
pub fn validate_matcher(matcher: &Matcher) -> Result<()> {
	if matcher.version.trim().is_empty() {
		return Err(Error::Validation { message: "matcher.version must be non-empty.".to_string() });
	}
	if matcher.version.chars().any(char::is_whitespace) {
		return Err(Error::Validation {
			message: "matcher.version must not contain whitespace.".to_string(),
		});
	}
	if !QUERY_MODES.contains(&matcher.query_mode.as_str()) {
		return Err(Error::Validation {
			message: "matcher.query_mode must be one of plain, phrase, or websearch.".to_string(),
		});
	}
	if !UPPER_BOUNDS.contains(&matcher.upper_bound.as_str()) {
		return Err(Error::Validation {
			message: "matcher.upper_bound must be one of registry_head or language_watermark."
				.to_string(),
		});
	}
	if matcher.scan_batch_size <= 0 {
		return Err(Error::Validation {
			message: "matcher.scan_batch_size must be greater than zero.".to_string(),
		});
	}
	if matcher.advance_max_attempts == 0 {
		return Err(Error::Validation {
			message: "matcher.advance_max_attempts must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.matcher.version = cfg.matcher.version.trim().to_string();
	cfg.matcher.query_mode = cfg.matcher.query_mode.trim().to_ascii_lowercase();
	cfg.matcher.upper_bound = cfg.matcher.upper_bound.trim().to_ascii_lowercase();

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
