pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Validation(String),
	#[error("Term {term_id} skipped: {reason}.")]
	InvalidTerm { term_id: i64, reason: &'static str },
	#[error(
		"Watermark regression for term {term_id}: stored watermark {watermark} is above the registry head {head}."
	)]
	WatermarkRegression { term_id: i64, watermark: i64, head: i64 },
	#[error(transparent)]
	Storage(#[from] wmvi_storage::Error),
}
