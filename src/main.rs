use std::path::PathBuf;

use clap::Parser;

/// Model routing and settings service for the CLI Proxy API desktop manager
#[derive(Parser, Debug)]
#[command(name = "cliproxy-router", version, about, long_about = None)]
struct Cli {
    /// Settings file to use instead of the per-user default
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cliproxy_router::run(cli.config).await
}
