use clap::Args;
use tiergate_app::{config::DatabaseConfig, store};

#[derive(Debug, Args)]
pub(crate) struct DeleteArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Tier namespace holding the record
    #[arg(long)]
    namespace: String,

    /// Owner of the record
    #[arg(long)]
    username: String,

    /// Credential id
    #[arg(long)]
    id: String,
}

/// Removes the record only; the credential stays valid until it expires.
pub(crate) async fn run(args: DeleteArgs) -> Result<(), String> {
    let store = store::connect(&args.database.database_url, args.database.pool_settings())
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let result = store
        .delete(&args.namespace, &args.username, &args.id)
        .await;

    store.close().await;

    result.map_err(|error| format!("failed to delete credential record: {error}"))?;

    println!("deleted: {}", args.id);

    Ok(())
}
