//! Tiergate administrative CLI

use std::process::ExitCode;

use clap::Parser;
use tiergate_app::{config, observability};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    config::load_dotenv();

    let cli = cli::Cli::parse();

    if let Err(error) = observability::init(&cli.logging) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
