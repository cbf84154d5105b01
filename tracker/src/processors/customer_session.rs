use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::event::TrackedEvent;
use crate::processors::{Processor, ProcessorSettings};
use crate::store::{Batch, MergeFunction, WriteOperation};
use crate::time::TimeSource;

/// Key prefixes never indexed into the session page structure.
const EXCLUDED_PREFIXES: [&str; 5] = ["page.rum", "page.u", "page.r", "page.r2", "page.order"];

/// Pages kept per session before it is flagged as spam.
const MAX_SESSION_PAGES: usize = 100;

/// Aggregates page visits into one session document per `session.uid`.
///
/// Each hit appends one page entry to the session's `pages` list, capped at
/// [`MAX_SESSION_PAGES`]; past the cap the session is marked `is_spam` and
/// stops growing.
pub struct CustomerSession {
    settings: ProcessorSettings,
    timesource: Arc<dyn TimeSource + Send + Sync>,
}

impl CustomerSession {
    pub fn new(settings: ProcessorSettings, timesource: Arc<dyn TimeSource + Send + Sync>) -> Self {
        Self {
            settings,
            timesource,
        }
    }

    /// Rebuild nested structure from the flat dotted keys, dropping the
    /// excluded prefixes.
    fn nested_params(event: &TrackedEvent) -> Map<String, Value> {
        let mut root = Map::new();
        for (key, value) in event.iter() {
            if EXCLUDED_PREFIXES
                .iter()
                .any(|prefix| key.starts_with(prefix))
            {
                continue;
            }
            Self::assign(&mut root, key, value);
        }
        root
    }

    fn assign(root: &mut Map<String, Value>, key: &str, value: &str) {
        let segments: Vec<&str> = key.split('.').collect();
        let Some((leaf, path)) = segments.split_last() else {
            return;
        };

        let mut container = root;
        for segment in path {
            let slot = container
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot.as_object_mut() {
                Some(nested) => container = nested,
                // A scalar already occupies this segment; drop the variable
                // rather than clobbering it.
                None => return,
            }
        }
        container.insert((*leaf).to_string(), Value::String(value.to_string()));
    }
}

impl Processor for CustomerSession {
    fn process(&self, event: &TrackedEvent, batch: &mut Batch) {
        // Hits without a session are expected noise, not errors.
        let Some(session_uid) = event.session_uid() else {
            return;
        };

        let params = Self::nested_params(event);
        let page = params
            .get("page")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let create = json!({
            "session_id": session_uid,
            "session_date": self.timesource.current_time(),
            "pages": [page.clone()],
        });

        batch.push(WriteOperation::Upsert {
            collection: self.settings.collection.clone(),
            id: session_uid.to_string(),
            parent: None,
            merge: MergeFunction::AppendCapped {
                field: "pages".to_string(),
                entry: page,
                cap: MAX_SESSION_PAGES,
                overflow_flag: "is_spam".to_string(),
            },
            create,
        });
    }
}
