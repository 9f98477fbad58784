use clap::Args;
use tiergate_app::config::AppConfig;

use super::{UserArgs, connect, print_json};

#[derive(Debug, Args)]
pub(crate) struct GetArgs {
    #[command(flatten)]
    app: AppConfig,

    #[command(flatten)]
    user: UserArgs,

    /// Credential id
    #[arg(long)]
    id: String,
}

pub(crate) async fn run(args: GetArgs) -> Result<(), String> {
    let ctx = connect(&args.app).await?;

    let result = ctx
        .credentials
        .get_one(&args.user.into_user(), &args.id)
        .await;

    ctx.close().await;

    let record = result.map_err(|error| format!("failed to get credential: {error}"))?;

    print_json(&record)
}
