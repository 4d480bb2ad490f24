//! Incremental term matching.
//!
//! A pass over one term reads its watermark `W`, captures the upper bound `M` once, and scans
//! `(W, M]` in chunks. Each chunk is queried, its hits are persisted, and only then is the
//! watermark moved to the chunk's end. A failure before the move leaves the chunk to be scanned
//! again by the next pass, which is harmless because hits are deduplicated.

use std::{collections::HashSet, future::Future, time::Duration};

use serde::Serialize;

use wmvi_cli::backoff_for_attempt;
use wmvi_domain::{QueryMode, UpperBound, locate_spans, term_gate};
use wmvi_storage::{
	db::Db,
	language, matches,
	models::{NewMatch, SearchHit, VaccineTerm},
	registry, search,
	state::{self, Advance},
	terms,
};

use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct MatcherSettings {
	pub version: String,
	pub query_mode: QueryMode,
	pub upper_bound: UpperBound,
	pub scan_batch_size: i64,
	pub per_term_sleep: Duration,
	pub loop_sleep: Duration,
	pub advance_max_attempts: u32,
}
impl MatcherSettings {
	pub fn from_config(cfg: &wmvi_config::Matcher) -> Result<Self> {
		wmvi_config::validate_matcher(cfg).map_err(|err| Error::Validation(err.to_string()))?;

		Ok(Self {
			version: cfg.version.clone(),
			query_mode: cfg.query_mode.parse().map_err(Error::Validation)?,
			upper_bound: cfg.upper_bound.parse().map_err(Error::Validation)?,
			scan_batch_size: cfg.scan_batch_size,
			per_term_sleep: Duration::from_millis(cfg.per_term_sleep_ms),
			loop_sleep: Duration::from_millis(cfg.loop_sleep_ms),
			advance_max_attempts: cfg.advance_max_attempts,
		})
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassOutcome {
	/// Nothing above the watermark; only `last_run_at` was refreshed.
	UpToDate,
	/// The whole range was scanned and the watermark now equals its upper end.
	Advanced,
	/// Another runner moved the watermark past this pass; the pass stopped early.
	Superseded { stored: i64 },
	/// The watermark is past the labeler cursor but not past the registry head. Nothing is
	/// scanned until the labeler catches up.
	AwaitingLabels { labeled: i64 },
	Skipped { reason: String },
	Failed { error: String },
}

/// What one term pass did. `lo` and `hi` bound the scanned range `(lo, hi]`; they are equal when
/// nothing was scanned.
#[derive(Clone, Debug, Serialize)]
pub struct TermPassReport {
	pub term_id: i64,
	pub term: String,
	pub lo: i64,
	pub hi: i64,
	pub chunks: u32,
	pub matched: u64,
	pub inserted: u64,
	pub outcome: PassOutcome,
}
impl TermPassReport {
	fn new(term: &VaccineTerm) -> Self {
		Self {
			term_id: term.id,
			term: term.name.clone(),
			lo: 0,
			hi: 0,
			chunks: 0,
			matched: 0,
			inserted: 0,
			outcome: PassOutcome::UpToDate,
		}
	}
}

/// Upper ends captured once at the start of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanBounds {
	/// The registry head.
	pub head: i64,
	/// Where this pass may scan up to; equal to `head` unless capped by the labeler cursor.
	pub upper: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassPlan {
	Regression,
	AwaitingLabels,
	UpToDate,
	Scan { lo: i64, hi: i64 },
}

pub struct Engine {
	db: Db,
	settings: MatcherSettings,
}
impl Engine {
	pub fn new(db: Db, settings: MatcherSettings) -> Self {
		Self { db, settings }
	}

	pub fn db(&self) -> &Db {
		&self.db
	}

	pub fn settings(&self) -> &MatcherSettings {
		&self.settings
	}

	/// Warns about platform tables that would make matching slow.
	pub async fn check_indexes(&self) -> Result<()> {
		let missing = self.db.missing_search_indexes().await?;

		if missing.is_empty() {
			tracing::info!("All tsv_en GIN indexes found.");
		} else {
			let tables = missing.iter().map(|platform| platform.table()).collect::<Vec<_>>();

			tracing::warn!(
				tables = %tables.join(", "),
				"Missing tsv_en GIN indexes; term matching may be slow."
			);
		}

		Ok(())
	}

	/// Warns when scanning to the registry head would pass over posts whose language is still
	/// unresolved. Those posts are never revisited once the labeler marks them English.
	pub async fn check_upper_bound(&self) -> Result<()> {
		if self.settings.upper_bound != UpperBound::RegistryHead {
			return Ok(());
		}

		let head = registry::latest_post_id(&self.db).await?;
		let unlabeled = language::count_unlabeled(&self.db, head).await?;

		if unlabeled > 0 {
			tracing::warn!(
				unlabeled,
				head,
				"upper_bound = registry_head with unlabeled posts; posts labeled English later will not be matched."
			);
		}

		Ok(())
	}

	/// The registry head and the largest id a pass may scan up to right now.
	pub async fn capture_bounds(&self) -> Result<ScanBounds> {
		let head = registry::latest_post_id(&self.db).await?;
		let upper = match self.settings.upper_bound {
			UpperBound::RegistryHead => head,
			UpperBound::LanguageWatermark => {
				let labeled = language::language_watermark(&self.db).await?;

				head.min(labeled)
			},
		};

		Ok(ScanBounds { head, upper })
	}

	/// One pass over every term. Fails only when the term list cannot be loaded; per-term
	/// failures are logged and reported.
	pub async fn run_once(&self) -> Result<Vec<TermPassReport>> {
		let terms = terms::list_terms(&self.db, None).await?;

		tracing::info!(
			terms = terms.len(),
			matcher_version = %self.settings.version,
			"Starting term matcher pass."
		);

		Ok(self.run_terms(&terms).await)
	}

	pub async fn run_for_term_ids(&self, ids: &[i64]) -> Result<Vec<TermPassReport>> {
		let terms = terms::terms_by_ids(&self.db, &dedup_preserving_order(ids)).await?;

		if terms.is_empty() {
			tracing::warn!(?ids, "No terms found for the given ids.");
		}

		Ok(self.run_terms(&terms).await)
	}

	pub async fn run_for_term_names(&self, names: &[String]) -> Result<Vec<TermPassReport>> {
		let terms = terms::terms_by_names(&self.db, names).await?;

		if terms.is_empty() {
			tracing::warn!(?names, "No terms found for the given names.");
		}

		Ok(self.run_terms(&terms).await)
	}

	/// Runs passes until `shutdown` resolves. A failed pass is retried after an exponential
	/// backoff instead of the regular sleep.
	pub async fn run_loop<F>(&self, shutdown: F) -> Result<()>
	where
		F: Future<Output = ()>,
	{
		let mut shutdown = std::pin::pin!(shutdown);
		let mut failures: u32 = 0;

		loop {
			let delay = tokio::select! {
				_ = &mut shutdown => break,
				result = self.run_once() => match result {
					Ok(reports) => {
						failures = 0;

						log_pass_summary(&reports);

						self.settings.loop_sleep
					},
					Err(err) => {
						failures = failures.saturating_add(1);

						let backoff = backoff_for_attempt(failures);

						tracing::error!(
							error = %err,
							attempt = failures,
							backoff_ms = backoff.as_millis() as u64,
							"Term matcher pass failed."
						);

						backoff
					},
				},
			};

			tokio::select! {
				_ = &mut shutdown => break,
				_ = tokio::time::sleep(delay) => {},
			}
		}

		tracing::info!("Term matcher stopped.");

		Ok(())
	}

	async fn run_terms(&self, terms: &[VaccineTerm]) -> Vec<TermPassReport> {
		let mut reports = Vec::with_capacity(terms.len());

		for (idx, term) in terms.iter().enumerate() {
			reports.push(self.run_term(term).await);

			if idx + 1 < terms.len() && !self.settings.per_term_sleep.is_zero() {
				tokio::time::sleep(self.settings.per_term_sleep).await;
			}
		}

		reports
	}

	/// One pass for one term. Never fails; errors end up in the report's outcome.
	pub async fn run_term(&self, term: &VaccineTerm) -> TermPassReport {
		let mut report = TermPassReport::new(term);

		match self.scan_term(term, &mut report).await {
			Ok(()) => {
				tracing::info!(
					term_id = term.id,
					term = %term.name,
					lo = report.lo,
					hi = report.hi,
					matched = report.matched,
					inserted = report.inserted,
					"Term pass finished."
				);
			},
			Err(Error::InvalidTerm { reason, .. }) => {
				tracing::warn!(term_id = term.id, term = %term.name, reason, "Skipping invalid term.");

				report.outcome = PassOutcome::Skipped { reason: reason.to_string() };
			},
			Err(err) => {
				tracing::error!(term_id = term.id, term = %term.name, error = %err, "Term pass failed.");

				report.outcome = PassOutcome::Failed { error: err.to_string() };
			},
		}

		report
	}

	async fn scan_term(&self, term: &VaccineTerm, report: &mut TermPassReport) -> Result<()> {
		let name = term.name.trim();

		term_gate(name)
			.map_err(|reason| Error::InvalidTerm { term_id: term.id, reason: reason.as_str() })?;

		if search::query_is_empty(&self.db, self.settings.query_mode, name).await? {
			return Err(Error::InvalidTerm { term_id: term.id, reason: "empty_query" });
		}

		let version = self.settings.version.as_str();
		let watermark = state::get_or_init_watermark(&self.db, term.id, version).await?;
		let bounds = self.capture_bounds().await?;
		let upper = bounds.upper;
		let (lo, hi) = match plan_pass(watermark, bounds) {
			PassPlan::Regression => {
				return Err(Error::WatermarkRegression {
					term_id: term.id,
					watermark: watermark.unwrap_or(0),
					head: bounds.head,
				});
			},
			PassPlan::AwaitingLabels => {
				let at = watermark.unwrap_or(0);

				tracing::info!(
					term_id = term.id,
					watermark = at,
					labeled = upper,
					"Watermark is ahead of the language labeler; waiting for labels."
				);

				report.lo = at;
				report.hi = at;
				report.outcome = PassOutcome::AwaitingLabels { labeled: upper };

				state::touch(&self.db, term.id, version).await?;

				return Ok(());
			},
			PassPlan::UpToDate => {
				report.lo = upper;
				report.hi = upper;

				state::touch(&self.db, term.id, version).await?;

				return Ok(());
			},
			PassPlan::Scan { lo, hi } => (lo, hi),
		};

		report.lo = lo;
		report.hi = lo;

		for (chunk_lo, chunk_hi) in chunk_ranges(lo, hi, self.settings.scan_batch_size) {
			let hits = search::search_range(
				&self.db,
				self.settings.query_mode,
				name,
				chunk_lo,
				chunk_hi,
			)
			.await?;
			let batch = build_matches(term.id, name, &hits);
			let inserted = matches::persist_matches(&self.db, version, &batch).await?;

			report.matched += batch.len() as u64;
			report.inserted += inserted;
			report.chunks += 1;

			match self.advance_with_retry(term.id, chunk_hi).await? {
				Advance::Advanced { .. } => {
					report.hi = chunk_hi;
				},
				Advance::Superseded { stored } => {
					tracing::warn!(
						term_id = term.id,
						stored,
						attempted = chunk_hi,
						"Watermark already moved past this pass; stopping."
					);

					report.hi = chunk_hi;
					report.outcome = PassOutcome::Superseded { stored };

					return Ok(());
				},
			}
		}

		report.outcome = PassOutcome::Advanced;

		Ok(())
	}

	// Hits for the chunk are already durable, so retrying the move is always safe.
	async fn advance_with_retry(&self, term_id: i64, to: i64) -> Result<Advance> {
		let version = self.settings.version.as_str();
		let max_attempts = self.settings.advance_max_attempts.max(1);
		let mut attempt = 1;

		loop {
			match state::advance_watermark(&self.db, term_id, version, to).await {
				Ok(advance) => return Ok(advance),
				Err(err) if attempt < max_attempts => {
					let backoff = backoff_for_attempt(attempt);

					tracing::warn!(
						term_id,
						to,
						attempt,
						error = %err,
						"Watermark advance failed; retrying."
					);

					tokio::time::sleep(backoff).await;

					attempt += 1;
				},
				Err(err) => return Err(err.into()),
			}
		}
	}
}

/// Decides what a pass does given the stored watermark and the captured bounds. Only a watermark
/// above the registry head is a regression; one that is merely ahead of the labeler waits.
pub fn plan_pass(watermark: Option<i64>, bounds: ScanBounds) -> PassPlan {
	let lo = watermark.unwrap_or(0);
	let upper = bounds.upper;

	if bounds.head < lo {
		PassPlan::Regression
	} else if upper < lo {
		PassPlan::AwaitingLabels
	} else if upper == lo {
		PassPlan::UpToDate
	} else {
		PassPlan::Scan { lo, hi: upper }
	}
}

/// Splits `(lo, hi]` into consecutive `(a, b]` pieces of at most `size` ids.
pub fn chunk_ranges(lo: i64, hi: i64, size: i64) -> Vec<(i64, i64)> {
	let size = size.max(1);
	let mut out = Vec::new();
	let mut start = lo;

	while start < hi {
		let end = start.saturating_add(size).min(hi);

		out.push((start, end));

		start = end;
	}

	out
}

/// Turns search hits into match rows, one per post, each carrying the first located span.
pub fn build_matches(term_id: i64, term: &str, hits: &[SearchHit]) -> Vec<NewMatch> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(hits.len());

	for hit in hits {
		if !seen.insert(hit.post_id) {
			continue;
		}

		let spans = hit.text.as_deref().map(|text| locate_spans(text, term)).unwrap_or_default();

		out.push(NewMatch {
			post_id: hit.post_id,
			term_id,
			span: spans.first().copied(),
			occurrences: i32::try_from(spans.len()).unwrap_or(i32::MAX),
		});
	}

	out
}

fn dedup_preserving_order(ids: &[i64]) -> Vec<i64> {
	let mut seen = HashSet::new();

	ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn log_pass_summary(reports: &[TermPassReport]) {
	let failed = reports
		.iter()
		.filter(|report| matches!(report.outcome, PassOutcome::Failed { .. }))
		.count();
	let inserted = reports.iter().map(|report| report.inserted).sum::<u64>();

	tracing::info!(terms = reports.len(), failed, inserted, "Term matcher pass complete.");
}
