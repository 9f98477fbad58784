use clap::Args;
use tiergate_app::config::AppConfig;

use super::{UserArgs, connect};

#[derive(Debug, Args)]
pub(crate) struct RevokeAllArgs {
    #[command(flatten)]
    app: AppConfig,

    #[command(flatten)]
    user: UserArgs,
}

pub(crate) async fn run(args: RevokeAllArgs) -> Result<(), String> {
    let ctx = connect(&args.app).await?;

    let result = ctx.credentials.revoke_all(&args.user.into_user()).await;

    ctx.close().await;

    let revoked = result.map_err(|error| format!("failed to revoke credentials: {error}"))?;

    println!("namespace: {}", revoked.namespace);
    println!("identity_recreated: {}", revoked.identity_recreated);
    println!("records_expired: {}", revoked.records_expired);

    Ok(())
}
