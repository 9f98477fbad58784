use clap::{Parser, Subcommand};
use tiergate_app::config::LoggingConfig;

mod credential;
mod db;

#[derive(Debug, Parser)]
#[command(name = "tiergate-app", about = "Tiergate credential CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Credential(credential::CredentialCommand),
    Db(db::DbCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Credential(command) => credential::run(command).await,
            Commands::Db(command) => db::run(command).await,
        }
    }
}
