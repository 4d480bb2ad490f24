//! Global post identity.
//!
//! Ids come from a sequence, but a new id is only drawn while holding the row lock on
//! `post_registry_head`, and the lock is held until the registering transaction commits. Two
//! registrations therefore never commit out of id order, so any reader that observes id `n` has
//! already been able to observe every id below `n`. The head itself only grows.

use sqlx::PgConnection;

use wmvi_domain::PostKey;

use crate::{Result, db::Db, models::RegistryEntry};

/// Registers `key`, returning the existing id when the natural key is already known. An entry
/// registered this way is replaced with a fresh id by the first `ingest::insert_post` for the
/// key.
pub async fn register(db: &Db, key: &PostKey) -> Result<i64> {
	let mut tx = db.pool.begin().await?;
	let id = register_tx(&mut tx, key).await?;

	tx.commit().await?;

	Ok(id)
}

/// Same as [`register`], inside a caller-owned transaction. The head lock is held until that
/// transaction ends.
pub async fn register_tx(conn: &mut PgConnection, key: &PostKey) -> Result<i64> {
	if let Some(id) = lookup_id(&mut *conn, key).await? {
		return Ok(id);
	}

	sqlx::query("SELECT max_id FROM post_registry_head WHERE singleton FOR UPDATE")
		.execute(&mut *conn)
		.await?;

	let inserted: Option<i64> = sqlx::query_scalar(
		"\
INSERT INTO post_registry (platform, key1, key2, composite_key)
VALUES ($1, $2, $3, $4)
ON CONFLICT (platform, key1, key2) DO NOTHING
RETURNING id",
	)
	.bind(key.platform.as_str())
	.bind(key.key1.as_str())
	.bind(key.key2.as_str())
	.bind(key.composite())
	.fetch_optional(&mut *conn)
	.await?;
	let Some(id) = inserted else {
		// Registered concurrently between the lookup and the insert.
		return lookup_id(&mut *conn, key).await?.ok_or_else(|| {
			crate::Error::Conflict(format!("Registry entry {} vanished.", key.composite()))
		});
	};

	sqlx::query("UPDATE post_registry_head SET max_id = GREATEST(max_id, $1) WHERE singleton")
		.bind(id)
		.execute(&mut *conn)
		.await?;

	Ok(id)
}

/// Removes the mapping. The native row and every match of the post go with it.
pub async fn deregister(db: &Db, key: &PostKey) -> Result<bool> {
	let result =
		sqlx::query("DELETE FROM post_registry WHERE platform = $1 AND key1 = $2 AND key2 = $3")
			.bind(key.platform.as_str())
			.bind(key.key1.as_str())
			.bind(key.key2.as_str())
			.execute(&db.pool)
			.await?;

	Ok(result.rows_affected() > 0)
}

/// Removes one entry by id inside a caller-owned transaction.
pub(crate) async fn remove_tx(conn: &mut PgConnection, id: i64) -> Result<bool> {
	let result =
		sqlx::query("DELETE FROM post_registry WHERE id = $1").bind(id).execute(&mut *conn).await?;

	Ok(result.rows_affected() > 0)
}

/// Largest id ever committed, or 0 for an empty registry. Deleting posts never lowers it.
pub async fn latest_post_id(db: &Db) -> Result<i64> {
	let head: Option<i64> =
		sqlx::query_scalar("SELECT max_id FROM post_registry_head WHERE singleton")
			.fetch_optional(&db.pool)
			.await?;

	Ok(head.unwrap_or(0))
}

pub async fn lookup(db: &Db, key: &PostKey) -> Result<Option<RegistryEntry>> {
	let row = sqlx::query_as::<_, RegistryEntry>(
		"\
SELECT id, platform, key1, key2, composite_key, created_at
FROM post_registry
WHERE platform = $1 AND key1 = $2 AND key2 = $3",
	)
	.bind(key.platform.as_str())
	.bind(key.key1.as_str())
	.bind(key.key2.as_str())
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn entry_by_id(db: &Db, id: i64) -> Result<Option<RegistryEntry>> {
	let row = sqlx::query_as::<_, RegistryEntry>(
		"\
SELECT id, platform, key1, key2, composite_key, created_at
FROM post_registry
WHERE id = $1",
	)
	.bind(id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub(crate) async fn lookup_id(conn: &mut PgConnection, key: &PostKey) -> Result<Option<i64>> {
	let id = sqlx::query_scalar(
		"SELECT id FROM post_registry WHERE platform = $1 AND key1 = $2 AND key2 = $3",
	)
	.bind(key.platform.as_str())
	.bind(key.key1.as_str())
	.bind(key.key2.as_str())
	.fetch_optional(&mut *conn)
	.await?;

	Ok(id)
}
