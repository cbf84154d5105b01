use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::buffer::EventBuffer;
use crate::config::Config;
use crate::drain::DrainLoop;
use crate::router;
use crate::store::memory::MemoryStore;
use crate::store::print::PrintStore;
use crate::store::{CollectionConfig, DocumentStore};
use crate::time::SystemTime;

fn create_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore + Send + Sync>> {
    let configs: Vec<CollectionConfig> = match &config.processor_config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    if config.print_store {
        Ok(Arc::new(PrintStore::new(configs)))
    } else {
        Ok(Arc::new(MemoryStore::new(configs)))
    }
}

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = create_store(&config).expect("failed to create document store");
    let buffer = Arc::new(EventBuffer::new());

    let drain = DrainLoop::new(
        buffer.clone(),
        store,
        Arc::new(SystemTime {}),
        config.drain_period.0,
    );
    tokio::spawn(drain.run());

    let app = router::router(buffer, config.export_prometheus);

    tracing::info!(
        "listening on {:?}",
        listener.local_addr().expect("failed to read local address")
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("failed to serve")
}
