use unicode_normalization::UnicodeNormalization;

pub const MAX_TERM_CHARS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermRejectReason {
	Empty,
	TooLong,
	DisallowedControlChar,
	DisallowedZeroWidthChar,
	NoAlphanumeric,
}
impl TermRejectReason {
	pub fn as_str(self) -> &'static str {
		match self {
			TermRejectReason::Empty => "empty",
			TermRejectReason::TooLong => "too_long",
			TermRejectReason::DisallowedControlChar => "control_char",
			TermRejectReason::DisallowedZeroWidthChar => "zero_width_char",
			TermRejectReason::NoAlphanumeric => "no_alphanumeric",
		}
	}
}

/// Checks that a term name can be handed to the full-text query functions. Terms whose query
/// reduces to nothing after stemming (stop words only) are detected by the database instead.
pub fn term_gate(name: &str) -> Result<(), TermRejectReason> {
	let normalized: String = name.nfkc().collect();
	let trimmed = normalized.trim();

	if trimmed.is_empty() {
		return Err(TermRejectReason::Empty);
	}
	if trimmed.chars().count() > MAX_TERM_CHARS {
		return Err(TermRejectReason::TooLong);
	}
	if trimmed.chars().any(char::is_control) {
		return Err(TermRejectReason::DisallowedControlChar);
	}
	if trimmed.chars().any(is_zero_width) {
		return Err(TermRejectReason::DisallowedZeroWidthChar);
	}
	if !trimmed.chars().any(char::is_alphanumeric) {
		return Err(TermRejectReason::NoAlphanumeric);
	}

	Ok(())
}

fn is_zero_width(ch: char) -> bool {
	matches!(
		ch,
		'\u{00AD}' | '\u{034F}' | '\u{180E}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'
			| '\u{FEFF}'
	)
}
