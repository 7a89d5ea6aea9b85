use std::sync::Arc;

use objstore_engine::ObjectStore;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::router::build_router;

pub struct ObjectServer {
    pub store: Arc<ObjectStore>,
    pub max_body_bytes: usize,
}

impl ObjectServer {
    pub fn new(store: Arc<ObjectStore>, max_body_bytes: usize) -> Self {
        Self {
            store,
            max_body_bytes,
        }
    }

    /// Serve until ctrl-c, then drain in-flight requests.
    pub async fn serve(&self, host: &str, port: u16) -> anyhow::Result<()> {
        let app = build_router(self.store.clone(), self.max_body_bytes);

        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr).await?;

        info!("objstore listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("objstore server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
