//! Code server binary.

use std::sync::Arc;

use codes::CodeDb;
use codes::server::{CliArgs, CodeServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = CliArgs::parse_args();
    let config = args.load_config()?;
    tracing::info!(
        code_length = config.code_length,
        storage = ?config.storage,
        "opening code store"
    );

    let db = CodeDb::open(config).await?;
    let server = CodeServer::new(Arc::new(db), args.server_config());
    server.run().await
}
