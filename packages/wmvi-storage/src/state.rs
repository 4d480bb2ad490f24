//! Per (term, matcher version) scan progress.
//!
//! `last_checked_post_id` is the watermark: every registry id at or below it has been scanned for
//! the term under that version. It only moves forward, and every write is a compare-and-set so a
//! second runner racing on the same row cannot drag it backward.

use crate::{Error, Result, db::Db, models::TermMatchState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
	Advanced { to: i64 },
	/// A concurrent runner already stored a larger watermark.
	Superseded { stored: i64 },
}

/// Returns the stored watermark, creating an empty state row on first use. `None` means the term
/// has never been scanned under `version`.
pub async fn get_or_init_watermark(db: &Db, term_id: i64, version: &str) -> Result<Option<i64>> {
	sqlx::query(
		"\
INSERT INTO term_match_state (term_id, matcher_version, last_checked_post_id)
VALUES ($1, $2, NULL)
ON CONFLICT (term_id, matcher_version) DO NOTHING",
	)
	.bind(term_id)
	.bind(version)
	.execute(&db.pool)
	.await?;

	let watermark: Option<i64> = sqlx::query_scalar(
		"\
SELECT last_checked_post_id
FROM term_match_state
WHERE term_id = $1 AND matcher_version = $2",
	)
	.bind(term_id)
	.bind(version)
	.fetch_optional(&db.pool)
	.await?
	.flatten();

	Ok(watermark)
}

pub async fn get_state(db: &Db, term_id: i64, version: &str) -> Result<Option<TermMatchState>> {
	let row = sqlx::query_as::<_, TermMatchState>(
		"\
SELECT term_id, matcher_version, last_checked_post_id, last_run_at
FROM term_match_state
WHERE term_id = $1 AND matcher_version = $2",
	)
	.bind(term_id)
	.bind(version)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Moves the watermark to `new_id` unless a larger value is already stored.
pub async fn advance_watermark(
	db: &Db,
	term_id: i64,
	version: &str,
	new_id: i64,
) -> Result<Advance> {
	if new_id < 0 {
		return Err(Error::InvalidArgument(format!(
			"Watermark must be non-negative, got {new_id}."
		)));
	}

	let updated: Option<i64> = sqlx::query_scalar(
		"\
UPDATE term_match_state
SET last_checked_post_id = $3, last_run_at = now()
WHERE term_id = $1
	AND matcher_version = $2
	AND (last_checked_post_id IS NULL OR last_checked_post_id <= $3)
RETURNING last_checked_post_id",
	)
	.bind(term_id)
	.bind(version)
	.bind(new_id)
	.fetch_optional(&db.pool)
	.await?
	.flatten();

	if let Some(to) = updated {
		return Ok(Advance::Advanced { to });
	}

	let stored = get_state(db, term_id, version).await?.ok_or_else(|| {
		Error::NotFound(format!("No match state for term {term_id} under {version:?}."))
	})?;

	match stored.last_checked_post_id {
		Some(stored) => Ok(Advance::Superseded { stored }),
		None => Err(Error::Conflict(format!(
			"Match state for term {term_id} under {version:?} rejected an advance to {new_id}."
		))),
	}
}

/// Records a pass that found nothing new to scan.
pub async fn touch(db: &Db, term_id: i64, version: &str) -> Result<()> {
	sqlx::query(
		"\
UPDATE term_match_state
SET last_run_at = now()
WHERE term_id = $1 AND matcher_version = $2",
	)
	.bind(term_id)
	.bind(version)
	.execute(&db.pool)
	.await?;

	Ok(())
}
