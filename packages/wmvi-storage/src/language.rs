//! Language flags on native rows and the labeler's cursor over `posts_all`.

use sqlx::PgConnection;

use wmvi_domain::{LanguageFlag, Platform, PostKey};

use crate::{Result, db::Db, models::PostRow};

const LABEL_STATE_ID: &str = "global";

/// Largest registry id the labeler has finished with, or 0 before its first run.
pub async fn language_watermark(db: &Db) -> Result<i64> {
	sqlx::query(
		"\
INSERT INTO lang_label_state (id, last_checked_post_id)
VALUES ($1, 0)
ON CONFLICT (id) DO NOTHING",
	)
	.bind(LABEL_STATE_ID)
	.execute(&db.pool)
	.await?;

	let watermark: i64 =
		sqlx::query_scalar("SELECT last_checked_post_id FROM lang_label_state WHERE id = $1")
			.bind(LABEL_STATE_ID)
			.fetch_one(&db.pool)
			.await?;

	Ok(watermark)
}

/// Moves the labeler cursor forward; a smaller value leaves it where it is. Returns the stored
/// cursor.
pub async fn advance_language_watermark(db: &Db, new_id: i64) -> Result<i64> {
	let stored: i64 = sqlx::query_scalar(
		"\
INSERT INTO lang_label_state (id, last_checked_post_id, last_run_at)
VALUES ($1, $2, now())
ON CONFLICT (id) DO UPDATE
SET last_checked_post_id = GREATEST(lang_label_state.last_checked_post_id, EXCLUDED.last_checked_post_id),
	last_run_at = now()
RETURNING last_checked_post_id",
	)
	.bind(LABEL_STATE_ID)
	.bind(new_id)
	.fetch_one(&db.pool)
	.await?;

	Ok(stored)
}

/// Up to `limit` posts in `(after, hi]` with text and no language flag, in id order. `platform`
/// narrows the read to one source.
pub async fn unlabeled_posts(
	db: &Db,
	after: i64,
	hi: i64,
	platform: Option<Platform>,
	limit: i64,
) -> Result<Vec<PostRow>> {
	let rows = sqlx::query_as::<_, PostRow>(
		"\
SELECT post_id, platform, key1, key2, text, is_en
FROM posts_all
WHERE post_id > $1
	AND post_id <= $2
	AND ($3::text IS NULL OR platform = $3)
	AND is_en IS NULL
	AND text IS NOT NULL
ORDER BY post_id
LIMIT $4",
	)
	.bind(after)
	.bind(hi)
	.bind(platform.map(Platform::as_str))
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Number of posts up to `upto` that have text but no language flag.
pub async fn count_unlabeled(db: &Db, upto: i64) -> Result<i64> {
	let count: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM posts_all
WHERE post_id <= $1
	AND is_en IS NULL
	AND text IS NOT NULL",
	)
	.bind(upto)
	.fetch_one(&db.pool)
	.await?;

	Ok(count)
}

/// Sets the flag of one native row by registry id. Returns whether a row was updated.
pub async fn set_language_by_post_id(
	conn: &mut PgConnection,
	platform: Platform,
	post_id: i64,
	flag: LanguageFlag,
) -> Result<bool> {
	// The table name comes from a closed enum, never from input.
	let sql = format!("UPDATE {} SET is_en = $1 WHERE post_id = $2", platform.table());
	let result =
		sqlx::query(sql.as_str()).bind(flag.as_option()).bind(post_id).execute(&mut *conn).await?;

	Ok(result.rows_affected() > 0)
}

/// Writes a batch of labels in one transaction. Returns how many native rows changed.
pub async fn apply_labels(db: &Db, labels: &[(Platform, i64, LanguageFlag)]) -> Result<u64> {
	if labels.is_empty() {
		return Ok(0);
	}

	let mut tx = db.pool.begin().await?;
	let mut updated = 0;

	for (platform, post_id, flag) in labels {
		if set_language_by_post_id(&mut tx, *platform, *post_id, *flag).await? {
			updated += 1;
		}
	}

	tx.commit().await?;

	Ok(updated)
}

/// Sets the flag of the post with natural key `key`. Returns whether the post exists.
pub async fn set_language(db: &Db, key: &PostKey, flag: LanguageFlag) -> Result<bool> {
	let post_id: Option<i64> = sqlx::query_scalar(
		"SELECT id FROM post_registry WHERE platform = $1 AND key1 = $2 AND key2 = $3",
	)
	.bind(key.platform.as_str())
	.bind(key.key1.as_str())
	.bind(key.key2.as_str())
	.fetch_optional(&db.pool)
	.await?;
	let Some(post_id) = post_id else {
		return Ok(false);
	};
	let mut conn = db.pool.acquire().await?;

	set_language_by_post_id(&mut conn, key.platform, post_id, flag).await
}
