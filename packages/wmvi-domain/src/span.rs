//! Approximate location of a term inside a matched post.
//!
//! The database decides whether a post matches. This module only finds where, so that the hit
//! can carry a span. Stemming is approximated by suffix stripping plus a prefix comparison, which
//! covers the common plural and verb forms that the `english` text search configuration folds
//! together. When no occurrence can be located the hit is stored without a span.

use unicode_segmentation::UnicodeSegmentation;

const SUFFIXES: [&str; 4] = ["ing", "ed", "es", "s"];
const MIN_STEM_CHARS: usize = 3;
const MIN_PREFIX_STEM_CHARS: usize = 4;

/// Half-open range of char offsets into the post text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchSpan {
	pub start: i32,
	pub end: i32,
}

struct Word {
	start: usize,
	end: usize,
	stem: String,
}

/// Returns every non-overlapping occurrence of the term's words appearing consecutively in
/// `text`, in order of appearance.
pub fn locate_spans(text: &str, term: &str) -> Vec<MatchSpan> {
	let needle: Vec<String> = term.unicode_words().map(stem).collect();

	if needle.is_empty() {
		return Vec::new();
	}

	let words = words_with_char_offsets(text);
	let mut spans = Vec::new();
	let mut idx = 0;

	while idx + needle.len() <= words.len() {
		let window = &words[idx..idx + needle.len()];
		let hit = window.iter().zip(&needle).all(|(word, token)| stems_match(&word.stem, token));

		if !hit {
			idx += 1;

			continue;
		}

		let (Ok(start), Ok(end)) =
			(i32::try_from(window[0].start), i32::try_from(window[needle.len() - 1].end))
		else {
			break;
		};

		spans.push(MatchSpan { start, end });

		idx += needle.len();
	}

	spans
}

fn words_with_char_offsets(text: &str) -> Vec<Word> {
	let mut out = Vec::new();
	let mut byte_pos = 0;
	let mut char_pos = 0;

	for (byte_start, word) in text.unicode_word_indices() {
		char_pos += text[byte_pos..byte_start].chars().count();
		byte_pos = byte_start;

		let len = word.chars().count();

		out.push(Word { start: char_pos, end: char_pos + len, stem: stem(word) });
	}

	out
}

fn stem(word: &str) -> String {
	let mut lowered = word.to_lowercase();

	if !lowered.chars().all(char::is_alphabetic) {
		return lowered;
	}

	for suffix in SUFFIXES {
		if let Some(rest) = lowered.strip_suffix(suffix)
			&& rest.chars().count() >= MIN_STEM_CHARS
		{
			lowered = rest.to_string();

			break;
		}
	}

	if let Some(rest) = lowered.strip_suffix('e')
		&& rest.chars().count() >= MIN_STEM_CHARS
	{
		lowered = rest.to_string();
	}

	lowered
}

fn stems_match(word: &str, token: &str) -> bool {
	if word == token {
		return true;
	}

	token.chars().count() >= MIN_PREFIX_STEM_CHARS && word.starts_with(token)
}
