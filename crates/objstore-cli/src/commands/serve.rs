use anyhow::Result;
use objstore_config::Config;
use objstore_engine::ObjectStore;
use objstore_server::ObjectServer;
use std::sync::Arc;

pub async fn handle(
    store: Arc<ObjectStore>,
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    ObjectServer::new(store, config.server.max_body_bytes)
        .serve(&host, port)
        .await
}
