pub mod object;
pub mod recover;
pub mod serve;

use anyhow::Result;
use objstore_config::Config;
use objstore_core::{ObjectId, ObjectRef};
use objstore_engine::{ObjectStore, RecoveryReport};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::cli::{Commands, Target};

/// Dispatch a command. `recovery` is what opening the store repaired, if it
/// was opened with recovery.
pub async fn run(
    command: Commands,
    store: Arc<ObjectStore>,
    recovery: Option<RecoveryReport>,
    config: &Config,
) -> Result<()> {
    match command {
        Commands::Serve { host, port } => serve::handle(store, config, host, port).await,
        Commands::Put { path, file } => object::put(&store, &path, &file).await,
        Commands::Get { target, output } => object::get(&store, &target, output.as_deref()).await,
        Commands::Update { target, file } => object::update(&store, &target, &file).await,
        Commands::Delete { target } => object::delete(&store, &target).await,
        Commands::Stat { target } => object::stat(&store, &target).await,
        Commands::List => object::list(&store).await,
        Commands::Recover => recover::handle(recovery),
    }
}

/// Turn a CLI target into an explicit reference. Without `--id` or `--path`
/// the token is probed as an id first, then as a path.
pub async fn resolve_target(store: &ObjectStore, target: &Target) -> Result<ObjectRef> {
    if target.by_id {
        return Ok(ObjectRef::Id(ObjectId::parse(&target.token)?));
    }
    if target.by_path {
        return Ok(ObjectRef::path(target.token.clone()));
    }
    let record = store.resolve_token(&target.token).await?;
    Ok(ObjectRef::Id(record.object_id))
}

/// Read a file, or stdin when `path` is "-".
pub async fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut data = Vec::new();
        tokio::io::stdin().read_to_end(&mut data).await?;
        Ok(data)
    } else {
        Ok(tokio::fs::read(path).await?)
    }
}
