use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
	Result,
	db::Db,
	models::{NewMatch, PostTermMatch},
};

// Six binds per row keeps one statement well under the 65535 parameter limit.
const INSERT_CHUNK_ROWS: usize = 5_000;

/// Inserts hits for `version`, skipping any (post, term, version) already recorded. Returns the
/// number of new rows.
pub async fn upsert_matches(
	conn: &mut PgConnection,
	version: &str,
	batch: &[NewMatch],
) -> Result<u64> {
	let mut inserted = 0;

	for chunk in batch.chunks(INSERT_CHUNK_ROWS) {
		let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
			"INSERT INTO post_term_matches (post_id, term_id, matcher_version, span_start, span_end, occurrences) ",
		);

		builder.push_values(chunk, |mut row, hit| {
			row.push_bind(hit.post_id)
				.push_bind(hit.term_id)
				.push_bind(version)
				.push_bind(hit.span.map(|span| span.start))
				.push_bind(hit.span.map(|span| span.end))
				.push_bind(hit.occurrences);
		});
		builder.push(" ON CONFLICT (post_id, term_id, matcher_version) DO NOTHING");

		inserted += builder.build().execute(&mut *conn).await?.rows_affected();
	}

	Ok(inserted)
}

/// [`upsert_matches`] in its own transaction: either the whole batch is durable or none of it.
pub async fn persist_matches(db: &Db, version: &str, batch: &[NewMatch]) -> Result<u64> {
	if batch.is_empty() {
		return Ok(0);
	}

	let mut tx = db.pool.begin().await?;
	let inserted = upsert_matches(&mut tx, version, batch).await?;

	tx.commit().await?;

	Ok(inserted)
}

/// Hits of a term in post id order, optionally restricted to one matcher version.
pub async fn matches_for_term(
	db: &Db,
	term_id: i64,
	version: Option<&str>,
) -> Result<Vec<PostTermMatch>> {
	let rows = sqlx::query_as::<_, PostTermMatch>(
		"\
SELECT post_id, term_id, matcher_version, span_start, span_end, occurrences, matched_at
FROM post_term_matches
WHERE term_id = $1 AND ($2::text IS NULL OR matcher_version = $2)
ORDER BY post_id, matcher_version",
	)
	.bind(term_id)
	.bind(version)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn matches_for_post(
	db: &Db,
	post_id: i64,
	version: Option<&str>,
) -> Result<Vec<PostTermMatch>> {
	let rows = sqlx::query_as::<_, PostTermMatch>(
		"\
SELECT post_id, term_id, matcher_version, span_start, span_end, occurrences, matched_at
FROM post_term_matches
WHERE post_id = $1 AND ($2::text IS NULL OR matcher_version = $2)
ORDER BY term_id, matcher_version",
	)
	.bind(post_id)
	.bind(version)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
