//! Scratch Postgres databases for integration tests.
//!
//! Every [`TestDatabase`] is a fresh `wmvi_test_<uuid>` database on the server named by
//! `WMVI_PG_DSN`. It is dropped by [`TestDatabase::cleanup`], or from `Drop` when a test panics
//! before reaching it.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

pub const DSN_ENV: &str = "WMVI_PG_DSN";

// Databases that exist on any stock server and can host CREATE/DROP DATABASE.
const MAINTENANCE_DATABASES: [&str; 2] = ["postgres", "template1"];

pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|source| Error::InvalidDsn { env: DSN_ENV, source })?;
		let (maintenance, mut conn) = open_maintenance(&base).await?;
		let name = format!("wmvi_test_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|source| Error::Create { name: name.clone(), source })?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, dropped: false })
	}

	/// Connection settings for the scratch database, ready for `Db::connect`.
	pub fn postgres_config(&self, pool_max_conns: u32) -> wmvi_config::Postgres {
		wmvi_config::Postgres { dsn: self.dsn.clone(), pool_max_conns }
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.name, &self.maintenance).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = std::mem::take(&mut self.name);
		let maintenance = self.maintenance.clone();
		// The test's runtime may already be shutting down, so the drop gets its own.
		let handle = thread::spawn(move || {
			let runtime =
				tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|err| {
					eprintln!("Could not drop test database {name}: {err}.");
				});

			if let Ok(runtime) = runtime
				&& let Err(err) = runtime.block_on(drop_database(&name, &maintenance))
			{
				eprintln!("{err}.");
			}
		});

		let _ = handle.join();
	}
}

/// The server DSN for database tests, or `None` when they should be skipped.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

async fn open_maintenance(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut failures = Vec::new();

	for database in MAINTENANCE_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => failures.push(format!("{database}: {err}")),
		}
	}

	Err(Error::NoMaintenanceDatabase(failures.join("; ")))
}

async fn drop_database(name: &str, maintenance: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(maintenance)
		.await
		.map_err(|source| Error::Drop { name: name.to_string(), source })?;

	// Pools left open by the test would block the drop.
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str())
		.await
		.map_err(|source| Error::Drop { name: name.to_string(), source })?;

	Ok(())
}
