use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub matcher: Matcher,
	#[serde(default)]
	pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Matcher {
	/// Opaque tag persisted with every watermark and match row. A new tag starts a fresh,
	/// independent scan of the registry.
	pub version: String,
	/// One of "plain", "phrase", or "websearch". Part of the matcher version's identity: changing
	/// it without changing `version` makes earlier matches incomparable.
	#[serde(default = "default_query_mode")]
	pub query_mode: String,
	/// Maximum number of registry ids covered by one QUERY/PERSIST/ADVANCE cycle.
	#[serde(default = "default_scan_batch_size")]
	pub scan_batch_size: i64,
	#[serde(default = "default_per_term_sleep_ms")]
	pub per_term_sleep_ms: u64,
	#[serde(default = "default_loop_sleep_ms")]
	pub loop_sleep_ms: u64,
	/// One of "registry_head" or "language_watermark". Defaults to "language_watermark" so posts
	/// stored without a language flag are scanned once the labeler resolves them.
	#[serde(default = "default_upper_bound")]
	pub upper_bound: String,
	#[serde(default = "default_advance_max_attempts")]
	pub advance_max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Language {
	#[serde(default = "default_min_len")]
	pub min_len: usize,
	#[serde(default = "default_min_alpha")]
	pub min_alpha: usize,
	#[serde(default = "default_min_confidence")]
	pub min_confidence: f64,
	#[serde(default = "default_language_batch_size")]
	pub batch_size: i64,
	#[serde(default = "default_loop_sleep_ms")]
	pub loop_sleep_ms: u64,
}
impl Default for Language {
	fn default() -> Self {
		Self {
			min_len: default_min_len(),
			min_alpha: default_min_alpha(),
			min_confidence: default_min_confidence(),
			batch_size: default_language_batch_size(),
			loop_sleep_ms: default_loop_sleep_ms(),
		}
	}
}

fn default_query_mode() -> String {
	"plain".to_string()
}

fn default_scan_batch_size() -> i64 {
	50_000
}

fn default_per_term_sleep_ms() -> u64 {
	50
}

fn default_loop_sleep_ms() -> u64 {
	60_000
}

fn default_upper_bound() -> String {
	"language_watermark".to_string()
}

fn default_advance_max_attempts() -> u32 {
	3
}

fn default_min_len() -> usize {
	24
}

fn default_min_alpha() -> usize {
	8
}

fn default_min_confidence() -> f64 {
	0.65
}

fn default_language_batch_size() -> i64 {
	2_000
}
