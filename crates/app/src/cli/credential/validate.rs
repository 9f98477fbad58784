use clap::Args;
use tiergate_app::config::AppConfig;

use super::{connect, print_json};

#[derive(Debug, Args)]
pub(crate) struct ValidateArgs {
    #[command(flatten)]
    app: AppConfig,

    /// Bearer credential to validate
    #[arg(long, env = "TIERGATE_TOKEN", hide_env_values = true)]
    token: String,
}

pub(crate) async fn run(args: ValidateArgs) -> Result<(), String> {
    let ctx = connect(&args.app).await?;

    let user = ctx.credentials.validate(&args.token).await;

    ctx.close().await;

    if !user.is_authenticated {
        return Err("credential is not valid".to_string());
    }

    print_json(&user)
}
