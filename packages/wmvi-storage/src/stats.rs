use crate::{Result, db::Db, models::TermStatsRow};

/// Match count and watermark per term for `version`, ordered by term id. An empty `term_ids`
/// selects every term.
pub async fn term_stats(db: &Db, version: &str, term_ids: &[i64]) -> Result<Vec<TermStatsRow>> {
	let rows = sqlx::query_as::<_, TermStatsRow>(
		"\
WITH match_counts AS (
	SELECT term_id, COUNT(*) AS match_count
	FROM post_term_matches
	WHERE matcher_version = $1
	GROUP BY term_id
)
SELECT
	t.id AS term_id,
	t.name,
	s.last_checked_post_id,
	COALESCE(mc.match_count, 0) AS match_count
FROM vaccine_terms t
LEFT JOIN term_match_state s ON s.term_id = t.id AND s.matcher_version = $1
LEFT JOIN match_counts mc ON mc.term_id = t.id
WHERE cardinality($2::bigint[]) = 0 OR t.id = ANY($2::bigint[])
ORDER BY t.id",
	)
	.bind(version)
	.bind(term_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
