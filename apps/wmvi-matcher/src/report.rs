//! Read-only views of terms and scan coverage.

use std::{collections::HashSet, fmt::Write};

use serde::Serialize;

use wmvi_storage::{
	db::Db,
	models::{TermStatsRow, VaccineTerm},
	registry, stats, terms,
};

use crate::Result;

const NAME_WIDTH: usize = 30;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TermStats {
	pub term_id: i64,
	pub name: String,
	pub match_count: i64,
	pub last_checked_post_id: Option<i64>,
	/// Share of the registry scanned for this term, 0.0 to 1.0.
	pub coverage: f64,
	pub max_post_id: i64,
}

/// Stats for the selected terms, or for every term when no selector is given. Ids and names are
/// combined; unknown ones are ignored.
pub async fn load_stats(
	db: &Db,
	version: &str,
	term_ids: &[i64],
	term_names: &[String],
) -> Result<Vec<TermStats>> {
	let mut ids = term_ids.to_vec();

	if !term_names.is_empty() {
		ids.extend(terms::terms_by_names(db, term_names).await?.into_iter().map(|term| term.id));
	}

	let mut seen = HashSet::new();

	ids.retain(|id| seen.insert(*id));

	if ids.is_empty() && (!term_ids.is_empty() || !term_names.is_empty()) {
		return Ok(Vec::new());
	}

	let head = registry::latest_post_id(db).await?;
	let rows = stats::term_stats(db, version, &ids).await?;

	Ok(build_stats(rows, head))
}

pub fn build_stats(rows: Vec<TermStatsRow>, max_post_id: i64) -> Vec<TermStats> {
	rows.into_iter()
		.map(|row| {
			let coverage = match row.last_checked_post_id {
				Some(checked) if max_post_id > 0 =>
					(checked as f64 / max_post_id as f64).clamp(0.0, 1.0),
				_ => 0.0,
			};

			TermStats {
				term_id: row.term_id,
				name: row.name,
				match_count: row.match_count,
				last_checked_post_id: row.last_checked_post_id,
				coverage,
				max_post_id,
			}
		})
		.collect()
}

/// The `limit` terms with the most matches; ties go to the lower id.
pub fn top_stats(mut stats: Vec<TermStats>, limit: usize) -> Vec<TermStats> {
	stats.sort_by(|a, b| b.match_count.cmp(&a.match_count).then(a.term_id.cmp(&b.term_id)));
	stats.truncate(limit);

	stats
}

pub fn render_terms(terms: &[VaccineTerm]) -> String {
	if terms.is_empty() {
		return "No terms found.\n".to_string();
	}

	let mut out = String::new();

	for term in terms {
		let _ = writeln!(out, "{:6}  {}", term.id, term.name);
	}

	out
}

pub fn render_stats(stats: &[TermStats]) -> String {
	if stats.is_empty() {
		return "No stats available (no terms or no state).\n".to_string();
	}

	let mut out = String::new();
	let _ = writeln!(
		out,
		"{:>7}  {:<NAME_WIDTH$}  {:>8}  {:>12}  {:>9}",
		"term_id", "name", "matches", "last_checked", "coverage%"
	);

	for row in stats {
		let _ = writeln!(
			out,
			"{:>7}  {:<NAME_WIDTH$}  {:>8}  {:>12}  {:>9.1}",
			row.term_id,
			truncate_name(&row.name),
			row.match_count,
			row.last_checked_post_id.unwrap_or(0),
			row.coverage * 100.0
		);
	}

	out
}

pub fn render_top(stats: &[TermStats]) -> String {
	if stats.is_empty() {
		return "No stats available.\n".to_string();
	}

	let mut out = String::new();
	let _ = writeln!(
		out,
		"{:>4}  {:>7}  {:<NAME_WIDTH$}  {:>8}  {:>9}",
		"rank", "term_id", "name", "matches", "coverage%"
	);

	for (idx, row) in stats.iter().enumerate() {
		let _ = writeln!(
			out,
			"{:>4}  {:>7}  {:<NAME_WIDTH$}  {:>8}  {:>9.1}",
			idx + 1,
			row.term_id,
			truncate_name(&row.name),
			row.match_count,
			row.coverage * 100.0
		);
	}

	out
}

fn truncate_name(name: &str) -> String {
	name.chars().take(NAME_WIDTH).collect()
}
