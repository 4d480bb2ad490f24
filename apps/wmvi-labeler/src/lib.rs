pub mod labeler;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use labeler::{Labeler, LabelerSettings};
use wmvi_domain::Platform;
use wmvi_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = wmvi_cli::VERSION,
	rename_all = "kebab",
	styles = wmvi_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab")]
pub enum Command {
	/// Labels posts until interrupted.
	RunLoop,
	/// Labels every post registered so far, then exits.
	RunOnce,
	/// Classifies again the unflagged posts the cursor has already passed. The cursor stays put.
	Recheck {
		/// Only recheck posts from this platform, e.g. podcast_episode.
		#[arg(long, value_name = "PLATFORM")]
		platform: Option<Platform>,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = wmvi_config::load(&args.config)?;

	wmvi_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let labeler = Labeler::new(db, LabelerSettings::from_config(&config.language));

	match args.command {
		Command::RunLoop => labeler.run_loop(wmvi_cli::shutdown_signal()).await?,
		Command::RunOnce => {
			labeler.run_once().await?;
		},
		Command::Recheck { platform } => {
			labeler.recheck(platform).await?;
		},
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use wmvi_domain::Platform;

	use super::{Args, Command};

	#[test]
	fn recheck_takes_an_optional_platform() {
		let args = Args::parse_from(["wmvi-labeler", "-c", "wmvi.toml", "recheck"]);

		assert!(matches!(args.command, Command::Recheck { platform: None }));

		let args = Args::parse_from([
			"wmvi-labeler",
			"-c",
			"wmvi.toml",
			"recheck",
			"--platform",
			"podcast_episode",
		]);

		assert!(matches!(
			args.command,
			Command::Recheck { platform: Some(Platform::PodcastEpisode) }
		));
	}

	#[test]
	fn recheck_rejects_unknown_platforms() {
		let err = Args::try_parse_from([
			"wmvi-labeler",
			"-c",
			"wmvi.toml",
			"recheck",
			"--platform",
			"myspace",
		])
		.expect_err("Unknown platforms must be rejected.");

		assert!(err.to_string().contains("myspace"), "Unexpected error: {err}");
	}
}
