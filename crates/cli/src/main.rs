use anyhow::{Context, Result};
use clap::Parser;
use dglab_cli::{app, cli::Cli, config::BotConfig, logging};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let config = BotConfig::resolve(&cli).context("loading configuration")?;
	app::run(config).await
}
