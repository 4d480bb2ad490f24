pub mod language;
pub mod platform;
pub mod query;
pub mod span;
pub mod term_gate;

pub use language::{LanguageFlag, LanguageThresholds, detect_is_en};
pub use platform::{Platform, PostKey, UnknownPlatform};
pub use query::{QueryMode, UpperBound};
pub use span::{MatchSpan, locate_spans};
pub use term_gate::{TermRejectReason, term_gate};
