use sqlx::{PgPool, postgres::PgPoolOptions};

use wmvi_domain::Platform;

use crate::{Result, schema};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &wmvi_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let lock_id: i64 = 7_120_311;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in schema::split_statements(&sql) {
			sqlx::query(statement.as_str()).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}

	/// Platforms whose table lacks a GIN index on `tsv_en`. Matching still works without one,
	/// only slower.
	pub async fn missing_search_indexes(&self) -> Result<Vec<Platform>> {
		let mut missing = Vec::new();

		for platform in Platform::ALL {
			let indexed: bool = sqlx::query_scalar(
				"\
SELECT EXISTS (
	SELECT 1
	FROM pg_indexes
	WHERE schemaname = current_schema()
		AND tablename = $1
		AND indexdef ILIKE '%USING gin%tsv_en%'
)",
			)
			.bind(platform.table())
			.fetch_one(&self.pool)
			.await?;

			if !indexed {
				missing.push(platform);
			}
		}

		Ok(missing)
	}
}
