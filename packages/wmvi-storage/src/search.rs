//! Reads of the `post_search_en` view: English posts with a stemmed `tsv_en` vector.

use wmvi_domain::QueryMode;

use crate::{Result, db::Db, models::SearchHit};

/// English posts in `(lo, hi]` whose vector matches `term`, in id order.
pub async fn search_range(
	db: &Db,
	mode: QueryMode,
	term: &str,
	lo: i64,
	hi: i64,
) -> Result<Vec<SearchHit>> {
	if hi <= lo {
		return Ok(Vec::new());
	}

	let sql = format!(
		"\
SELECT post_id, platform, text
FROM post_search_en
WHERE post_id > $1
	AND post_id <= $2
	AND tsv_en @@ {}('english', $3)
ORDER BY post_id",
		mode.tsquery_fn()
	);
	let rows = sqlx::query_as::<_, SearchHit>(sql.as_str())
		.bind(lo)
		.bind(hi)
		.bind(term)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

/// Whether `term` produces an empty tsquery, for example when it consists only of stop words.
/// Such a query matches nothing.
pub async fn query_is_empty(db: &Db, mode: QueryMode, term: &str) -> Result<bool> {
	let sql = format!("SELECT numnode({}('english', $1)) = 0", mode.tsquery_fn());
	let empty: bool = sqlx::query_scalar(sql.as_str()).bind(term).fetch_one(&db.pool).await?;

	Ok(empty)
}
