use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tcprobe::cli::Cli;
use tcprobe::logging::{self, LogConfig};
use tcprobe::output;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(LogConfig::from_verbosity(cli.verbose, cli.quiet));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match &cli.command {
        tcprobe::cli::Commands::Scan(_) => "scan",
        tcprobe::cli::Commands::History(_) => "history",
        tcprobe::cli::Commands::Config(_) => "config",
    };
    cli.run().await.with_context(|| format!("{} failed", command))
}
