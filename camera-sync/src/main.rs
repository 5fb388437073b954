use anyhow::Result;
use camera_sync::cli::{run, Cli};
use camera_sync::logging::init_tracing;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs)?;
    tracing::info!("CLI application startup: tracing initialised, arguments parsed");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
