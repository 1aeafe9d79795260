//! hopline command-line entry point.
//!
//! - `hopline resolve <host>` - Race the configured resolvers
//! - `hopline select` - Pick an endpoint with the configured policy
//! - `hopline dial <target>` - Tunnel stdin/stdout to `target`

use std::process::ExitCode;

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
