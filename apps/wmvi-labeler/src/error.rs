pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unknown platform {platform:?} for post {post_id}.")]
	UnknownPlatform { post_id: i64, platform: String },
	#[error(transparent)]
	Storage(#[from] wmvi_storage::Error),
}
