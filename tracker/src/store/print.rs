use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::info;

use crate::api::TrackerError;
use crate::store::{Batch, BatchSummary, CollectionConfig, DocumentStore};

/// Debug store: logs every operation instead of writing it anywhere.
pub struct PrintStore {
    configs: Vec<CollectionConfig>,
}

impl PrintStore {
    pub fn new(configs: Vec<CollectionConfig>) -> Self {
        Self { configs }
    }
}

#[async_trait]
impl DocumentStore for PrintStore {
    async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, TrackerError> {
        Ok(self.configs.clone())
    }

    async fn execute_batch(&self, batch: Batch) -> Result<BatchSummary, TrackerError> {
        let span = tracing::span!(tracing::Level::INFO, "batch of operations");
        let _enter = span.enter();

        histogram!("tracker_batch_size").record(batch.len() as f64);
        counter!("tracker_operations_written_total").increment(batch.len() as u64);

        let attempted = batch.len();
        for operation in batch.into_operations() {
            info!("operation: {operation:?}");
        }

        Ok(BatchSummary {
            attempted,
            failures: Vec::new(),
        })
    }
}
