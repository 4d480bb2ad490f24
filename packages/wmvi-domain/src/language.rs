use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_script::{Script, UnicodeScript};
use whatlang::{Detector, Lang};

static URL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"(?i)https?://\S+|www\.\S+|\b[a-z0-9-]+(?:\.[a-z0-9-]+)+/\S*").ok()
});
static HANDLE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"@\w+").ok());

const CANDIDATES: [Lang; 6] = [Lang::Eng, Lang::Fra, Lang::Spa, Lang::Deu, Lang::Ita, Lang::Por];

/// Language flag of a post. `Unknown` is stored as NULL and keeps the post out of the search
/// surface until it is labeled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LanguageFlag {
	English,
	NotEnglish,
	#[default]
	Unknown,
}
impl LanguageFlag {
	pub fn as_option(self) -> Option<bool> {
		match self {
			LanguageFlag::English => Some(true),
			LanguageFlag::NotEnglish => Some(false),
			LanguageFlag::Unknown => None,
		}
	}
}

impl From<Option<bool>> for LanguageFlag {
	fn from(value: Option<bool>) -> Self {
		match value {
			Some(true) => LanguageFlag::English,
			Some(false) => LanguageFlag::NotEnglish,
			None => LanguageFlag::Unknown,
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct LanguageThresholds {
	/// Minimum length in chars of the cleaned text.
	pub min_len: usize,
	pub min_alpha: usize,
	pub min_confidence: f64,
}
impl Default for LanguageThresholds {
	fn default() -> Self {
		Self { min_len: 24, min_alpha: 8, min_confidence: 0.65 }
	}
}

impl From<&wmvi_config::Language> for LanguageThresholds {
	fn from(cfg: &wmvi_config::Language) -> Self {
		Self {
			min_len: cfg.min_len,
			min_alpha: cfg.min_alpha,
			min_confidence: cfg.min_confidence,
		}
	}
}

/// Returns `Some(true)` for confidently English text, `Some(false)` for confidently
/// non-English text, and `None` when the text is too short or ambiguous to label.
pub fn detect_is_en(text: &str, thresholds: &LanguageThresholds) -> Option<bool> {
	let cleaned = strip_noise(text);

	if cleaned.chars().count() < thresholds.min_len {
		return None;
	}
	if cleaned.chars().filter(|ch| ch.is_alphabetic()).count() < thresholds.min_alpha {
		return None;
	}

	// The detector only knows Latin-script languages.
	if mostly_non_latin(&cleaned) {
		return Some(false);
	}

	let info = Detector::with_allowlist(CANDIDATES.to_vec()).detect(&cleaned)?;

	if info.confidence() < thresholds.min_confidence {
		return None;
	}

	Some(info.lang() == Lang::Eng)
}

/// Drops URLs and @handles, keeps hashtag words without the marker, and collapses whitespace.
pub fn strip_noise(text: &str) -> String {
	let normalized: String = text.nfkc().collect();
	let mut cleaned = normalized;

	if let Some(re) = URL_RE.as_ref() {
		cleaned = re.replace_all(&cleaned, " ").into_owned();
	}
	if let Some(re) = HANDLE_RE.as_ref() {
		cleaned = re.replace_all(&cleaned, " ").into_owned();
	}

	cleaned.replace('#', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn mostly_non_latin(text: &str) -> bool {
	let mut latin = 0usize;
	let mut other = 0usize;

	for ch in text.chars().filter(|ch| ch.is_alphabetic()) {
		match ch.script() {
			Script::Latin => latin += 1,
			Script::Common | Script::Inherited => {},
			_ => other += 1,
		}
	}

	other > latin
}
