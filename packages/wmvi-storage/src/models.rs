use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistryEntry {
	pub id: i64,
	pub platform: String,
	pub key1: String,
	pub key2: String,
	pub composite_key: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct VaccineTerm {
	pub id: i64,
	pub name: String,
	pub r#type: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TermMatchState {
	pub term_id: i64,
	pub matcher_version: String,
	pub last_checked_post_id: Option<i64>,
	pub last_run_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostTermMatch {
	pub post_id: i64,
	pub term_id: i64,
	pub matcher_version: String,
	pub span_start: Option<i32>,
	pub span_end: Option<i32>,
	pub occurrences: i32,
	pub matched_at: OffsetDateTime,
}

/// A hit waiting to be persisted. The matcher version is supplied by the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
	pub post_id: i64,
	pub term_id: i64,
	pub span: Option<wmvi_domain::MatchSpan>,
	pub occurrences: i32,
}

/// A row of `post_search_en`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchHit {
	pub post_id: i64,
	pub platform: String,
	pub text: Option<String>,
}

/// A row of `posts_all`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
	pub post_id: i64,
	pub platform: String,
	pub key1: String,
	pub key2: String,
	pub text: Option<String>,
	pub is_en: Option<bool>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TermStatsRow {
	pub term_id: i64,
	pub name: String,
	pub last_checked_post_id: Option<i64>,
	pub match_count: i64,
}
