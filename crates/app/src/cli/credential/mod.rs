use clap::{Args, Subcommand};
use serde::Serialize;
use tiergate::UserContext;
use tiergate_app::{config::AppConfig, context::AppContext};

mod delete;
mod get;
mod issue;
mod list;
mod revoke;
mod revoke_all;
mod validate;

#[derive(Debug, Args)]
pub(crate) struct CredentialCommand {
    #[command(subcommand)]
    command: CredentialSubcommand,
}

#[derive(Debug, Subcommand)]
enum CredentialSubcommand {
    /// Issue an ephemeral credential, or a named one when `--name` is given
    Issue(issue::IssueArgs),
    /// List named credentials
    List(list::ListArgs),
    /// Show one named credential
    Get(get::GetArgs),
    /// Revoke one named credential
    Revoke(revoke::RevokeArgs),
    /// Revoke every credential of a user
    RevokeAll(revoke_all::RevokeAllArgs),
    /// Validate a bearer credential
    Validate(validate::ValidateArgs),
    /// Remove a credential record from the store
    Delete(delete::DeleteArgs),
}

pub(crate) async fn run(command: CredentialCommand) -> Result<(), String> {
    match command.command {
        CredentialSubcommand::Issue(args) => issue::run(args).await,
        CredentialSubcommand::List(args) => list::run(args).await,
        CredentialSubcommand::Get(args) => get::run(args).await,
        CredentialSubcommand::Revoke(args) => revoke::run(args).await,
        CredentialSubcommand::RevokeAll(args) => revoke_all::run(args).await,
        CredentialSubcommand::Validate(args) => validate::run(args).await,
        CredentialSubcommand::Delete(args) => delete::run(args).await,
    }
}

/// Identity claims of the acting user, as an upstream authenticator would supply them.
#[derive(Debug, Args)]
pub(crate) struct UserArgs {
    /// Username of the acting user
    #[arg(long)]
    username: String,

    /// Unique id of the acting user
    #[arg(long, default_value = "")]
    uid: String,

    /// Group of the acting user; repeat for several
    #[arg(long = "group")]
    groups: Vec<String>,
}

impl UserArgs {
    pub(crate) fn into_user(self) -> UserContext {
        UserContext::authenticated(self.username, self.uid, self.groups)
    }
}

pub(crate) async fn connect(config: &AppConfig) -> Result<AppContext, String> {
    AppContext::from_config(config)
        .await
        .map_err(|error| format!("failed to initialise: {error}"))
}

pub(crate) fn print_json(value: &impl Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|error| format!("failed to encode output: {error}"))?;

    println!("{json}");

    Ok(())
}
