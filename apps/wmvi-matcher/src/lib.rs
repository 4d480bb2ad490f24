pub mod engine;
pub mod report;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use engine::{Engine, MatcherSettings, TermPassReport};
use wmvi_storage::{db::Db, terms};

#[derive(Debug, Parser)]
#[command(
	version = wmvi_cli::VERSION,
	rename_all = "kebab",
	styles = wmvi_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Overrides `matcher.version`.
	#[arg(long, value_name = "VERSION")]
	pub matcher_version: Option<String>,
	#[arg(long, value_name = "MS")]
	pub per_term_sleep_ms: Option<u64>,
	#[arg(long, value_name = "MS")]
	pub loop_sleep_ms: Option<u64>,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab")]
pub enum Command {
	/// Runs passes over every term until interrupted.
	RunLoop,
	/// Runs a single pass over every term.
	RunOnce,
	/// Runs a single pass over the given term ids.
	RunIds {
		#[arg(long = "term-id", num_args = 1.., required = true)]
		term_ids: Vec<i64>,
	},
	/// Runs a single pass over the given term names.
	RunNames {
		#[arg(long = "term-name", num_args = 1.., required = true)]
		term_names: Vec<String>,
	},
	/// Lists terms, optionally filtered by a case-insensitive substring.
	PrintTerms {
		#[arg(long)]
		filter: Option<String>,
	},
	/// Shows match counts and scan coverage per term for this matcher version.
	Stats {
		#[arg(long = "term-id", num_args = 1..)]
		term_ids: Vec<i64>,
		#[arg(long = "term-name", num_args = 1..)]
		term_names: Vec<String>,
		#[arg(long)]
		json: bool,
	},
	/// Shows the terms with the most matches for this matcher version.
	StatsTop {
		#[arg(long, default_value_t = 20)]
		limit: usize,
		#[arg(long)]
		json: bool,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let mut config = wmvi_config::load(&args.config)?;

	apply_overrides(&mut config.matcher, &args);
	wmvi_cli::init_tracing(&config.service.log_level);

	let settings = MatcherSettings::from_config(&config.matcher)?;
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let engine = Engine::new(db, settings);

	match args.command {
		Command::RunLoop => {
			preflight(&engine).await?;
			engine.run_loop(wmvi_cli::shutdown_signal()).await?;
		},
		Command::RunOnce => {
			preflight(&engine).await?;

			let reports = engine.run_once().await?;

			log_reports(&reports);
		},
		Command::RunIds { term_ids } => {
			preflight(&engine).await?;

			let reports = engine.run_for_term_ids(&term_ids).await?;

			log_reports(&reports);
		},
		Command::RunNames { term_names } => {
			preflight(&engine).await?;

			let reports = engine.run_for_term_names(&term_names).await?;

			log_reports(&reports);
		},
		Command::PrintTerms { filter } => {
			let terms = terms::list_terms(engine.db(), filter.as_deref()).await?;

			print!("{}", report::render_terms(&terms));
		},
		Command::Stats { term_ids, term_names, json } => {
			let stats = report::load_stats(
				engine.db(),
				&engine.settings().version,
				&term_ids,
				&term_names,
			)
			.await?;

			if json {
				println!("{}", serde_json::to_string_pretty(&stats)?);
			} else {
				print!("{}", report::render_stats(&stats));
			}
		},
		Command::StatsTop { limit, json } => {
			let stats =
				report::load_stats(engine.db(), &engine.settings().version, &[], &[]).await?;
			let top = report::top_stats(stats, limit);

			if json {
				println!("{}", serde_json::to_string_pretty(&top)?);
			} else {
				print!("{}", report::render_top(&top));
			}
		},
	}

	Ok(())
}

async fn preflight(engine: &Engine) -> color_eyre::Result<()> {
	engine.check_indexes().await?;
	engine.check_upper_bound().await?;

	Ok(())
}

fn apply_overrides(matcher: &mut wmvi_config::Matcher, args: &Args) {
	if let Some(version) = args.matcher_version.as_deref() {
		matcher.version = version.trim().to_string();
	}
	if let Some(ms) = args.per_term_sleep_ms {
		matcher.per_term_sleep_ms = ms;
	}
	if let Some(ms) = args.loop_sleep_ms {
		matcher.loop_sleep_ms = ms;
	}
}

fn log_reports(reports: &[TermPassReport]) {
	let scanned = reports.iter().map(|report| (report.hi - report.lo).max(0)).sum::<i64>();
	let inserted = reports.iter().map(|report| report.inserted).sum::<u64>();

	tracing::info!(terms = reports.len(), scanned, inserted, "Matcher run finished.");
}
