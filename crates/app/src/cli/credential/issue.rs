use clap::Args;
use tiergate::{CredentialRequest, expiration::parse_expiration};
use tiergate_app::config::AppConfig;

use super::{UserArgs, connect, print_json};

#[derive(Debug, Args)]
pub(crate) struct IssueArgs {
    #[command(flatten)]
    app: AppConfig,

    #[command(flatten)]
    user: UserArgs,

    /// Record the credential under this name
    #[arg(long)]
    name: Option<String>,

    /// Free-text description of a named credential
    #[arg(long, requires = "name")]
    description: Option<String>,

    /// Lifetime such as `30m`, `2h` or `1h30m`; `0` or empty uses the default
    #[arg(long, default_value = "")]
    expiration: String,
}

pub(crate) async fn run(args: IssueArgs) -> Result<(), String> {
    let expiration = parse_expiration(&args.expiration)
        .map_err(|error| format!("invalid expiration: {error}"))?;

    let ctx = connect(&args.app).await?;
    let user = args.user.into_user();

    let result = match args.name {
        Some(name) => {
            let request = CredentialRequest {
                name: Some(name),
                description: args.description,
                expiration,
            };

            ctx.credentials.issue_named(&user, request).await
        }
        None => ctx.credentials.issue_ephemeral(&user, expiration).await,
    };

    ctx.close().await;

    let issued = result.map_err(|error| format!("failed to issue credential: {error}"))?;

    print_json(&issued)?;

    if let Some(warning) = &issued.warning {
        eprintln!("warning: {warning}");
    }

    eprintln!("store this credential now; it is only shown once");

    Ok(())
}
