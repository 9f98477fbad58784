use clap::Args;
use tiergate_app::config::AppConfig;

use super::{UserArgs, connect, print_json};

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    #[command(flatten)]
    app: AppConfig,

    #[command(flatten)]
    user: UserArgs,
}

pub(crate) async fn run(args: ListArgs) -> Result<(), String> {
    let ctx = connect(&args.app).await?;

    let result = ctx.credentials.list(&args.user.into_user()).await;

    ctx.close().await;

    let records = result.map_err(|error| format!("failed to list credentials: {error}"))?;

    print_json(&records)
}
