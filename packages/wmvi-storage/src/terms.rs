use crate::{Error, Result, db::Db, models::VaccineTerm};

/// All terms ordered by id. A non-blank `filter` keeps names containing it, ignoring case.
pub async fn list_terms(db: &Db, filter: Option<&str>) -> Result<Vec<VaccineTerm>> {
	let filter = filter.map(str::trim).filter(|value| !value.is_empty());
	let rows = match filter {
		Some(pattern) =>
			sqlx::query_as::<_, VaccineTerm>(
				"\
SELECT id, name, type
FROM vaccine_terms
WHERE name ILIKE '%' || $1 || '%'
ORDER BY id",
			)
			.bind(escape_like(pattern))
			.fetch_all(&db.pool)
			.await?,
		None =>
			sqlx::query_as::<_, VaccineTerm>("SELECT id, name, type FROM vaccine_terms ORDER BY id")
				.fetch_all(&db.pool)
				.await?,
	};

	Ok(rows)
}

/// Existing terms among `ids`, ordered by id. Unknown ids are dropped.
pub async fn terms_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<VaccineTerm>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, VaccineTerm>(
		"SELECT id, name, type FROM vaccine_terms WHERE id = ANY($1::bigint[]) ORDER BY id",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Terms whose name equals one of `names` after trimming, ordered by id. Blank names are ignored.
pub async fn terms_by_names(db: &Db, names: &[String]) -> Result<Vec<VaccineTerm>> {
	let cleaned = names
		.iter()
		.map(|name| name.trim().to_string())
		.filter(|name| !name.is_empty())
		.collect::<Vec<_>>();

	if cleaned.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, VaccineTerm>(
		"SELECT id, name, type FROM vaccine_terms WHERE name = ANY($1::text[]) ORDER BY id",
	)
	.bind(&cleaned)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Adds a term, or returns the existing one with the same name.
pub async fn insert_term(db: &Db, name: &str, r#type: Option<&str>) -> Result<VaccineTerm> {
	let name = name.trim();

	if name.is_empty() {
		return Err(Error::InvalidArgument("Term name must be non-empty.".to_string()));
	}

	let inserted = sqlx::query_as::<_, VaccineTerm>(
		"\
INSERT INTO vaccine_terms (name, type)
VALUES ($1, $2)
ON CONFLICT (name) DO NOTHING
RETURNING id, name, type",
	)
	.bind(name)
	.bind(r#type)
	.fetch_optional(&db.pool)
	.await?;

	if let Some(term) = inserted {
		return Ok(term);
	}

	sqlx::query_as::<_, VaccineTerm>("SELECT id, name, type FROM vaccine_terms WHERE name = $1")
		.bind(name)
		.fetch_optional(&db.pool)
		.await?
		.ok_or_else(|| Error::Conflict(format!("Term {name:?} was removed concurrently.")))
}

/// Removes a term together with its scan state and matches.
pub async fn delete_term(db: &Db, id: i64) -> Result<bool> {
	let result =
		sqlx::query("DELETE FROM vaccine_terms WHERE id = $1").bind(id).execute(&db.pool).await?;

	Ok(result.rows_affected() > 0)
}

fn escape_like(pattern: &str) -> String {
	let mut out = String::with_capacity(pattern.len());

	for ch in pattern.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
