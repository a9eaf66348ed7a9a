mod cli;
mod fetch;
mod selection;
mod x11;

use clap::Parser;
use cli::Cli;
use fetch::FetchConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the selection bytes.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match FetchConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("clipfetch: {e}");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = fetch::run(config).await {
        tracing::error!(error = %e, "fetch failed");
        eprintln!("clipfetch: {e}");
        std::process::exit(e.exit_code());
    }
}
