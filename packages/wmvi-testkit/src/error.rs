pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{env} is not a valid Postgres DSN: {source}")]
	InvalidDsn { env: &'static str, source: sqlx::Error },
	#[error("No maintenance database is reachable: {0}")]
	NoMaintenanceDatabase(String),
	#[error("Failed to create database {name}: {source}")]
	Create { name: String, source: sqlx::Error },
	#[error("Failed to drop database {name}: {source}")]
	Drop { name: String, source: sqlx::Error },
}
