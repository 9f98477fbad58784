use clap::Args;
use tiergate_app::config::AppConfig;

use super::{UserArgs, connect};

#[derive(Debug, Args)]
pub(crate) struct RevokeArgs {
    #[command(flatten)]
    app: AppConfig,

    #[command(flatten)]
    user: UserArgs,

    /// Credential id
    #[arg(long)]
    id: String,
}

pub(crate) async fn run(args: RevokeArgs) -> Result<(), String> {
    let ctx = connect(&args.app).await?;

    let result = ctx
        .credentials
        .revoke_one(&args.user.into_user(), &args.id)
        .await;

    ctx.close().await;

    result.map_err(|error| format!("failed to revoke credential: {error}"))?;

    println!("revoked: {}", args.id);

    Ok(())
}
