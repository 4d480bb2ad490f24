use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = wmvi_matcher::Args::parse();
	wmvi_matcher::run(args).await
}
