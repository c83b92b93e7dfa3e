//! tidings - retrieval progress and decision reporting CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tidings_cli::{Cli, Commands, Settings, cmd};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;

    // Logs go to stderr so stdout stays machine-readable.
    let filter = match std::env::var_os("RUST_LOG") {
        None if settings.verbose => EnvFilter::new("tidings_core=debug,tidings_cli=debug"),
        _ => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate { plan } => cmd::simulate::simulate(&plan, &settings),
        Commands::Config => cmd::config::config(&settings),
    }
}
