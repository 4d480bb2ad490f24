use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read WMVI config {path:?}: {source}")]
	ReadConfig { path: PathBuf, source: std::io::Error },
	#[error("Invalid TOML in WMVI config {path:?}: {source}")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	#[error("{message}")]
	Validation { message: String },
}
