use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use tracing::{error, info, warn};

use crate::buffer::EventBuffer;
use crate::prometheus::report_dropped_events;
use crate::resolver::ProcessorCache;
use crate::store::{Batch, DocumentStore};
use crate::time::TimeSource;

/// The single background worker turning buffered hits into store writes.
///
/// One cycle per period: drain the buffer, re-read the collection
/// configuration, run every event through its site's processors, submit the
/// accumulated batch once. Each cycle runs to completion (including the
/// blocking submission) before the next sleep starts, so the loop never
/// overlaps itself; a slow store stretches the period instead.
pub struct DrainLoop {
    buffer: Arc<EventBuffer>,
    store: Arc<dyn DocumentStore + Send + Sync>,
    timesource: Arc<dyn TimeSource + Send + Sync>,
    period: Duration,
}

impl DrainLoop {
    pub fn new(
        buffer: Arc<EventBuffer>,
        store: Arc<dyn DocumentStore + Send + Sync>,
        timesource: Arc<dyn TimeSource + Send + Sync>,
        period: Duration,
    ) -> Self {
        Self {
            buffer,
            store,
            timesource,
            period,
        }
    }

    /// Run forever. Only process shutdown stops the loop.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.period);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// One drain cycle. Errors are contained to the smallest scope: a bad
    /// event, a bad processor or a failed batch item never aborts the cycle,
    /// and a failed cycle never aborts the loop.
    pub async fn run_cycle(&self) {
        let events = self.buffer.drain();
        if events.is_empty() {
            return;
        }

        // Re-read configuration every cycle so collection changes take
        // effect within one period.
        let configs = match self.store.collection_configs().await {
            Ok(configs) => configs,
            Err(err) => {
                // At-most-once: this cycle's events are already out of the
                // buffer and are lost.
                error!("unable to read collection configuration: {err}");
                report_dropped_events("config_unavailable", events.len() as u64);
                return;
            }
        };

        let mut cache = ProcessorCache::new(&configs, self.timesource.clone());
        let mut batch = Batch::new();
        for event in &events {
            let Some(site_id) = event.site_id() else {
                report_dropped_events("missing_site_id", 1);
                continue;
            };
            for processor in cache.resolve(site_id) {
                processor.process(event, &mut batch);
            }
        }
        counter!("tracker_events_processed_total").increment(events.len() as u64);

        if batch.is_empty() {
            return;
        }

        info!("tracking batch started (indexing {} operations)", batch.len());
        histogram!("tracker_batch_size").record(batch.len() as f64);

        match self.store.execute_batch(batch).await {
            Ok(summary) if summary.has_failures() => {
                counter!("tracker_batch_items_failed_total")
                    .increment(summary.failures.len() as u64);
                warn!(
                    "there have been failures during indexing: {}",
                    summary.failure_message()
                );
            }
            Ok(_) => {}
            Err(err) => {
                counter!("tracker_batch_failed_total").increment(1);
                warn!("batch submission failed, operations lost: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::DrainLoop;
    use crate::api::TrackerError;
    use crate::buffer::EventBuffer;
    use crate::event::TrackedEvent;
    use crate::store::memory::MemoryStore;
    use crate::store::{
        Batch, BatchSummary, CollectionConfig, DocumentStore, ProcessorDeclaration,
    };
    use crate::time::FixedTime;

    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, TrackerError> {
            Err(TrackerError::ConfigUnavailable("store offline".to_string()))
        }

        async fn execute_batch(&self, _batch: Batch) -> Result<BatchSummary, TrackerError> {
            Err(TrackerError::BatchSubmissionError("store offline".to_string()))
        }
    }

    fn hit(pairs: &[(&str, &str)]) -> TrackedEvent {
        TrackedEvent::from_params(HashMap::from_iter(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        ))
    }

    fn drain_loop(store: Arc<dyn DocumentStore + Send + Sync>) -> (Arc<EventBuffer>, DrainLoop) {
        let buffer = Arc::new(EventBuffer::new());
        let drain = DrainLoop::new(
            buffer.clone(),
            store,
            Arc::new(FixedTime {
                time: datetime!(2015-03-14 09:26:53 UTC),
            }),
            Duration::from_secs(10),
        );
        (buffer, drain)
    }

    #[tokio::test]
    async fn events_without_a_site_id_emit_no_operations() {
        let store = Arc::new(MemoryStore::new(vec![CollectionConfig {
            collection: "stats".to_string(),
            site_id: "s1".to_string(),
            processors: vec![ProcessorDeclaration {
                kind: "popular_product".to_string(),
                settings: HashMap::new(),
            }],
        }]));
        let (buffer, drain) = drain_loop(store.clone());

        buffer.add(hit(&[("page.product.id", "p1"), ("page.store_id", "st1")]));
        drain.run_cycle().await;

        assert_eq!(store.document_count("stats"), 0);
    }

    #[tokio::test]
    async fn a_failing_store_never_panics_the_cycle() {
        let (buffer, drain) = drain_loop(Arc::new(BrokenStore));

        buffer.add(hit(&[("page.site_id", "s1")]));
        drain.run_cycle().await;

        // The cycle swallowed the failure; the buffer is drained and usable.
        buffer.add(hit(&[("page.site_id", "s1")]));
        drain.run_cycle().await;
    }

    #[tokio::test]
    async fn empty_cycles_do_not_touch_the_store() {
        let (_buffer, drain) = drain_loop(Arc::new(BrokenStore));
        // No events buffered: the broken store is never asked for configs.
        drain.run_cycle().await;
    }
}
