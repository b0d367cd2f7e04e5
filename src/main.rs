//! `catalog-mcp` binary: parse configuration, install logging, and serve until shutdown.

// crates.io
use clap::Parser;
// self
use catalog_mcp::{config::Config, obs, server};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let config = Config::parse();

	obs::init_logging(&config.log_level, config.log_format)?;

	tracing::info!(?config, "starting catalog MCP server");

	server::serve(config).await?;

	Ok(())
}
