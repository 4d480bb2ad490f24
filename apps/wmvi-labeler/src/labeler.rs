//! English labeling of posts stored with an unknown language.
//!
//! The labeler owns a single cursor in `lang_label_state`. A pass captures the registry head,
//! labels every unflagged post above the cursor up to that head, and then moves the cursor to
//! the head. Posts the detector cannot decide stay unflagged and out of the search surface until
//! a recheck pass, which revisits them below the cursor without moving it.

use std::{future::Future, time::Duration};

use wmvi_cli::backoff_for_attempt;
use wmvi_domain::{LanguageFlag, LanguageThresholds, Platform, detect_is_en};
use wmvi_storage::{db::Db, language, models::PostRow, registry};

use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct LabelerSettings {
	pub thresholds: LanguageThresholds,
	pub batch_size: i64,
	pub loop_sleep: Duration,
}
impl LabelerSettings {
	pub fn from_config(cfg: &wmvi_config::Language) -> Self {
		Self {
			thresholds: LanguageThresholds::from(cfg),
			batch_size: cfg.batch_size.max(1),
			loop_sleep: Duration::from_millis(cfg.loop_sleep_ms),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelReport {
	/// Cursor before the pass.
	pub from: i64,
	/// Cursor after the pass.
	pub to: i64,
	pub scanned: u64,
	pub english: u64,
	pub not_english: u64,
	pub unknown: u64,
	pub updated: u64,
}

pub struct Labeler {
	db: Db,
	settings: LabelerSettings,
}
impl Labeler {
	pub fn new(db: Db, settings: LabelerSettings) -> Self {
		Self { db, settings }
	}

	pub fn db(&self) -> &Db {
		&self.db
	}

	pub async fn run_once(&self) -> Result<LabelReport> {
		let from = language::language_watermark(&self.db).await?;
		let head = registry::latest_post_id(&self.db).await?;
		let mut report = LabelReport { from, to: from, ..Default::default() };

		if head <= from {
			tracing::info!(cursor = from, head, "Language labels are up to date.");

			return Ok(report);
		}

		self.label_range(from, head, None, &mut report).await?;

		report.to = language::advance_language_watermark(&self.db, head).await?;

		tracing::info!(
			from = report.from,
			to = report.to,
			scanned = report.scanned,
			english = report.english,
			not_english = report.not_english,
			unknown = report.unknown,
			updated = report.updated,
			"Language labeling pass finished."
		);

		Ok(report)
	}

	/// Classifies again the posts at or below the cursor that are still unflagged, optionally for
	/// one platform only. The cursor does not move.
	pub async fn recheck(&self, platform: Option<Platform>) -> Result<LabelReport> {
		let cursor = language::language_watermark(&self.db).await?;
		let mut report = LabelReport { from: cursor, to: cursor, ..Default::default() };

		self.label_range(0, cursor, platform, &mut report).await?;

		tracing::info!(
			cursor,
			platform = platform.map(Platform::as_str).unwrap_or("all"),
			scanned = report.scanned,
			english = report.english,
			not_english = report.not_english,
			unknown = report.unknown,
			updated = report.updated,
			"Language recheck finished."
		);

		if report.english > 0 {
			tracing::warn!(
				english = report.english,
				"Rechecked posts labeled English are matched only by terms whose watermark has not passed them."
			);
		}

		Ok(report)
	}

	/// Runs passes until `shutdown` resolves, backing off after failed passes.
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
					Ok(_) => {
						failures = 0;

						self.settings.loop_sleep
					},
					Err(err) => {
						failures = failures.saturating_add(1);

						let backoff = backoff_for_attempt(failures);

						tracing::error!(
							error = %err,
							attempt = failures,
							backoff_ms = backoff.as_millis() as u64,
							"Language labeling pass failed."
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

		tracing::info!("Language labeler stopped.");

		Ok(())
	}

	// Keyset pagination over `(after, upto]`; undecided rows stay unflagged, so the id is the only
	// safe position to resume from.
	async fn label_range(
		&self,
		after: i64,
		upto: i64,
		platform: Option<Platform>,
		report: &mut LabelReport,
	) -> Result<()> {
		let mut cursor = after;

		loop {
			let rows = language::unlabeled_posts(
				&self.db,
				cursor,
				upto,
				platform,
				self.settings.batch_size,
			)
			.await?;
			let Some(last) = rows.last() else {
				break;
			};

			cursor = last.post_id;

			let labels = classify(&rows, &self.settings.thresholds, report)?;

			report.updated += language::apply_labels(&self.db, &labels).await?;

			tracing::debug!(cursor, batch = rows.len(), "Labeled batch.");

			if (rows.len() as i64) < self.settings.batch_size {
				break;
			}
		}

		Ok(())
	}
}

/// Decides a flag for every row and returns the decided ones as writes. Undecided rows are only
/// counted.
pub fn classify(
	rows: &[PostRow],
	thresholds: &LanguageThresholds,
	report: &mut LabelReport,
) -> Result<Vec<(Platform, i64, LanguageFlag)>> {
	let mut labels = Vec::with_capacity(rows.len());

	for row in rows {
		report.scanned += 1;

		let flag = row
			.text
			.as_deref()
			.map(|text| LanguageFlag::from(detect_is_en(text, thresholds)))
			.unwrap_or_default();

		match flag {
			LanguageFlag::English => report.english += 1,
			LanguageFlag::NotEnglish => report.not_english += 1,
			LanguageFlag::Unknown => {
				report.unknown += 1;

				continue;
			},
		}

		let platform = row.platform.parse::<Platform>().map_err(|_| Error::UnknownPlatform {
			post_id: row.post_id,
			platform: row.platform.clone(),
		})?;

		labels.push((platform, row.post_id, flag));
	}

	Ok(labels)
}
