use clap::Args;
use tiergate_app::{config::DatabaseConfig, store};

#[derive(Debug, Args)]
pub(crate) struct MigrateArgs {
    #[command(flatten)]
    database: DatabaseConfig,
}

pub(crate) async fn run(args: MigrateArgs) -> Result<(), String> {
    let store = store::connect(&args.database.database_url, args.database.pool_settings())
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let result = store
        .migrate()
        .await
        .map_err(|error| format!("failed to run migrations: {error}"));

    store.close().await;
    result?;

    println!("migrations applied");

    Ok(())
}
