use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = wmvi_labeler::Args::parse();
	wmvi_labeler::run(args).await
}
