use anyhow::Result;
use clap::Parser;

use edubot::{cli::Cli, runtime::Orchestrator, utils::init_logger};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    let orchestrator = Orchestrator::new(cli)?;
    orchestrator.run().await
}
