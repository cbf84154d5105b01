use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::api::TrackerError;
use crate::event::TrackedEvent;
use crate::store::{Batch, ProcessorDeclaration};
use crate::time::TimeSource;

pub mod customer_session;
pub mod popular_product;

pub use customer_session::CustomerSession;
pub use popular_product::PopularProduct;

/// Transforms one event into zero or more write operations appended to the
/// current cycle's batch. Implementations must not fail on malformed or
/// incomplete events; they skip them silently, that is expected noise.
pub trait Processor: Send + Sync {
    fn process(&self, event: &TrackedEvent, batch: &mut Batch);
}

/// Closed registry of processor kinds. Configuration names one of these;
/// anything else is rejected at resolution time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessorKind {
    CustomerSession,
    PopularProduct,
}

impl FromStr for ProcessorKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer_session" => Ok(ProcessorKind::CustomerSession),
            "popular_product" => Ok(ProcessorKind::PopularProduct),
            other => Err(TrackerError::UnknownProcessorKind(other.to_string())),
        }
    }
}

/// Settings handed to a processor at construction: the target collection plus
/// the free-form extras declared on the collection.
#[derive(Clone, Debug)]
pub struct ProcessorSettings {
    pub collection: String,
    pub extra: HashMap<String, Value>,
}

/// Build a processor from its declaration. The collection name is injected
/// implicitly unless the declaration carries an explicit `collection`
/// setting.
pub fn build_processor(
    declaration: &ProcessorDeclaration,
    collection: &str,
    timesource: Arc<dyn TimeSource + Send + Sync>,
) -> Result<Box<dyn Processor>, TrackerError> {
    let kind = declaration.kind.parse::<ProcessorKind>()?;

    let explicit = declaration
        .settings
        .get("collection")
        .and_then(Value::as_str);
    let settings = ProcessorSettings {
        collection: explicit.unwrap_or(collection).to_string(),
        extra: declaration.settings.clone(),
    };

    Ok(match kind {
        ProcessorKind::CustomerSession => Box::new(CustomerSession::new(settings, timesource)),
        ProcessorKind::PopularProduct => Box::new(PopularProduct::new(settings, timesource)),
    })
}
