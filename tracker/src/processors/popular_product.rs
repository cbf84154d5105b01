use std::sync::Arc;

use serde_json::json;

use crate::event::TrackedEvent;
use crate::processors::{Processor, ProcessorSettings};
use crate::store::{Batch, MergeFunction, WriteOperation};
use crate::time::TimeSource;

const PRODUCT_ID_KEY: &str = "page.product.id";
const STORE_ID_KEY: &str = "page.store_id";
const ORDER_ID_KEY: &str = "page.order.id";

const ORDER_ITEM_PREFIX: &str = "page.order.items.";
const ORDER_ITEM_SUFFIX: &str = ".product_id";

const VIEW_EVENT: &str = "product_view";
const ORDER_EVENT: &str = "product_order";

/// Maintains daily per-product counters.
///
/// A product page hit increments a `product_view` counter; an order hit
/// increments one `product_order` counter per line item. Counter documents
/// are keyed `{product}|{store}|{event_type}|{date}` and grouped under the
/// parent key `{product}|{store}`.
pub struct PopularProduct {
    settings: ProcessorSettings,
    timesource: Arc<dyn TimeSource + Send + Sync>,
}

impl PopularProduct {
    pub fn new(settings: ProcessorSettings, timesource: Arc<dyn TimeSource + Send + Sync>) -> Self {
        Self {
            settings,
            timesource,
        }
    }

    /// `page.order.items.<n>.product_id`
    fn is_order_item_key(key: &str) -> bool {
        key.strip_prefix(ORDER_ITEM_PREFIX)
            .and_then(|rest| rest.strip_suffix(ORDER_ITEM_SUFFIX))
            .is_some_and(|item| !item.is_empty())
    }

    fn push_counter(&self, batch: &mut Batch, product_id: &str, store_id: &str, event_type: &str) {
        let date = self.timesource.current_date();
        let parent = format!("{product_id}|{store_id}");
        let id = format!("{parent}|{event_type}|{date}");

        let create = json!({
            "_parent": parent,
            "product_id": product_id,
            "store_id": store_id,
            "event_type": event_type,
            "count": 1,
            "date": date,
        });

        batch.push(WriteOperation::Upsert {
            collection: self.settings.collection.clone(),
            id,
            parent: Some(parent),
            merge: MergeFunction::IncrementCounter {
                field: "count".to_string(),
            },
            create,
        });
    }
}

impl Processor for PopularProduct {
    fn process(&self, event: &TrackedEvent, batch: &mut Batch) {
        // Both shapes need a store; without one the hit is silently skipped.
        let Some(store_id) = event.get(STORE_ID_KEY) else {
            return;
        };

        if let Some(product_id) = event.get(PRODUCT_ID_KEY) {
            self.push_counter(batch, product_id, store_id, VIEW_EVENT);
        } else if event.get(ORDER_ID_KEY).is_some() {
            for (key, product_id) in event.iter() {
                if Self::is_order_item_key(key) {
                    self.push_counter(batch, product_id, store_id, ORDER_EVENT);
                }
            }
        }
    }
}
