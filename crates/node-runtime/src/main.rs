use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use node_runtime::{run_node, Args, NodeConfig};

fn main() -> Result<()> {
    let config = NodeConfig::load(Args::parse())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let report = run_node(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
