use std::{fmt, str::FromStr};

/// How a term name is turned into a tsquery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryMode {
	#[default]
	Plain,
	Phrase,
	Websearch,
}
impl QueryMode {
	pub fn as_str(self) -> &'static str {
		match self {
			QueryMode::Plain => "plain",
			QueryMode::Phrase => "phrase",
			QueryMode::Websearch => "websearch",
		}
	}

	/// Postgres function building the tsquery. Only these three names are ever interpolated into
	/// SQL.
	pub fn tsquery_fn(self) -> &'static str {
		match self {
			QueryMode::Plain => "plainto_tsquery",
			QueryMode::Phrase => "phraseto_tsquery",
			QueryMode::Websearch => "websearch_to_tsquery",
		}
	}
}

impl fmt::Display for QueryMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for QueryMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"plain" => Ok(QueryMode::Plain),
			"phrase" => Ok(QueryMode::Phrase),
			"websearch" => Ok(QueryMode::Websearch),
			other => Err(format!("Unknown query mode {other:?}.")),
		}
	}
}

/// Where a term pass stops scanning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpperBound {
	/// The largest registry id ever committed.
	RegistryHead,
	/// The registry head, capped at the language labeler's cursor.
	#[default]
	LanguageWatermark,
}
impl UpperBound {
	pub fn as_str(self) -> &'static str {
		match self {
			UpperBound::RegistryHead => "registry_head",
			UpperBound::LanguageWatermark => "language_watermark",
		}
	}
}

impl FromStr for UpperBound {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"registry_head" => Ok(UpperBound::RegistryHead),
			"language_watermark" => Ok(UpperBound::LanguageWatermark),
			other => Err(format!("Unknown upper bound {other:?}.")),
		}
	}
}
