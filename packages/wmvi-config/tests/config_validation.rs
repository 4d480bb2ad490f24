use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use wmvi_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with_matcher(key: &str, value: Value) -> String {
	let mut value_root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value_root.as_table_mut().expect("Template config must be a table.");
	let matcher = root
		.get_mut("matcher")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [matcher].");

	matcher.insert(key.to_string(), value);

	toml::to_string(&value_root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("wmvi_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn template_config_is_valid() {
	let cfg = base_config();

	assert!(wmvi_config::validate(&cfg).is_ok());
	assert_eq!(cfg.matcher.version, "tsv_en_plainto_v1");
}

#[test]
fn wmvi_example_toml_is_valid() {
	let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../wmvi.example.toml");
	let cfg = wmvi_config::load(&path).expect("Example config must load.");

	assert_eq!(cfg.matcher.query_mode, "plain");
	assert_eq!(cfg.matcher.upper_bound, "language_watermark");
}

#[test]
fn missing_config_file_reports_read_error() {
	let mut path = env::temp_dir();

	path.push("wmvi_config_test_does_not_exist.toml");

	let err = wmvi_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn malformed_toml_reports_parse_error() {
	let path = write_temp_config("[service\nlog_level = ".to_string());
	let result = wmvi_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn query_mode_must_be_known() {
	let payload = sample_toml_with_matcher("query_mode", Value::String("regex".to_string()));
	let path = write_temp_config(payload);
	let result = wmvi_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected query_mode validation error.");

	assert!(
		err.to_string().contains("matcher.query_mode must be one of plain, phrase, or websearch."),
		"Unexpected error: {err}"
	);
}

#[test]
fn query_mode_is_normalized() {
	let payload = sample_toml_with_matcher("query_mode", Value::String(" Phrase ".to_string()));
	let path = write_temp_config(payload);
	let result = wmvi_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected normalized config to load.");

	assert_eq!(cfg.matcher.query_mode, "phrase");
}

#[test]
fn matcher_version_must_be_non_empty() {
	let mut cfg = base_config();

	cfg.matcher.version = "  ".to_string();

	let err = wmvi_config::validate(&cfg).expect_err("Expected matcher.version error.");

	assert!(
		err.to_string().contains("matcher.version must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn matcher_version_rejects_whitespace() {
	let mut cfg = base_config();

	cfg.matcher.version = "tsv en".to_string();

	let err = wmvi_config::validate_matcher(&cfg.matcher)
		.expect_err("Expected matcher.version whitespace error.");

	assert!(
		err.to_string().contains("matcher.version must not contain whitespace."),
		"Unexpected error: {err}"
	);
}

#[test]
fn scan_batch_size_must_be_positive() {
	let mut cfg = base_config();

	cfg.matcher.scan_batch_size = 0;

	let err = wmvi_config::validate(&cfg).expect_err("Expected scan_batch_size error.");

	assert!(
		err.to_string().contains("matcher.scan_batch_size must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn upper_bound_must_be_known() {
	let mut cfg = base_config();

	cfg.matcher.upper_bound = "max_id".to_string();

	let err = wmvi_config::validate(&cfg).expect_err("Expected upper_bound error.");

	assert!(
		err.to_string().contains("matcher.upper_bound must be one of"),
		"Unexpected error: {err}"
	);
}

#[test]
fn language_confidence_must_be_in_range() {
	let mut cfg = base_config();

	cfg.language.min_confidence = 1.5;

	let err = wmvi_config::validate(&cfg).expect_err("Expected min_confidence error.");

	assert!(
		err.to_string().contains("language.min_confidence must be in the range 0.0-1.0."),
		"Unexpected error: {err}"
	);

	cfg.language.min_confidence = f64::NAN;

	let err = wmvi_config::validate(&cfg).expect_err("Expected min_confidence finite error.");

	assert!(
		err.to_string().contains("language.min_confidence must be a finite number."),
		"Unexpected error: {err}"
	);
}

#[test]
fn language_section_defaults_when_absent() {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");

	value.as_table_mut().expect("Template config must be a table.").remove("language");

	let cfg: Config = toml::from_str(&toml::to_string(&value).expect("Failed to render config."))
		.expect("Config without [language] must parse.");

	assert_eq!(cfg.language.min_len, 24);
	assert_eq!(cfg.language.batch_size, 2_000);
	assert!(wmvi_config::validate(&cfg).is_ok());
}

#[test]
fn upper_bound_defaults_to_language_watermark() {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let matcher = value
		.get_mut("matcher")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [matcher].");

	matcher.remove("upper_bound");

	let cfg: Config = toml::from_str(&toml::to_string(&value).expect("Failed to render config."))
		.expect("Config without upper_bound must parse.");

	assert_eq!(cfg.matcher.upper_bound, "language_watermark");
}
