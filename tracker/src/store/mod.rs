use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::TrackerError;

pub mod memory;
pub mod print;

/// Store-side merge behavior applied when an upserted document already
/// exists. A closed set instead of free-form update scripts: the store
/// executes the branch, the pipeline only describes it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum MergeFunction {
    /// Add 1 to an integer field.
    IncrementCounter { field: String },

    /// Append `entry` to an array field while it holds fewer than `cap`
    /// elements. Once full, set `overflow_flag` instead and stop appending.
    /// The flag is terminal; there is no path back.
    AppendCapped {
        field: String,
        entry: Value,
        cap: usize,
        overflow_flag: String,
    },
}

/// One write against a named collection, keyed by a caller-chosen id.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum WriteOperation {
    /// Plain insert, replacing any existing document under the same id.
    Create {
        collection: String,
        id: String,
        document: Value,
    },

    /// Upsert-with-merge: store `create` when the id is absent, otherwise
    /// apply `merge` to the stored document.
    Upsert {
        collection: String,
        id: String,
        /// Optional parent-grouping key for hierarchical aggregations.
        parent: Option<String>,
        merge: MergeFunction,
        create: Value,
    },
}

impl WriteOperation {
    pub fn collection(&self) -> &str {
        match self {
            WriteOperation::Create { collection, .. }
            | WriteOperation::Upsert { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOperation::Create { id, .. } | WriteOperation::Upsert { id, .. } => id,
        }
    }
}

/// Write operations accumulated during one drain cycle. Owned exclusively by
/// that cycle: filled by the processors, submitted once, then discarded.
#[derive(Debug, Default)]
pub struct Batch {
    operations: Vec<WriteOperation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: WriteOperation) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<WriteOperation> {
        self.operations
    }
}

/// One failed item out of a batch. Failures are reported, never retried.
#[derive(Clone, Debug)]
pub struct FailedWrite {
    pub collection: String,
    pub id: String,
    pub reason: String,
}

/// Outcome of one batch submission.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub attempted: usize,
    pub failures: Vec<FailedWrite>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failure_message(&self) -> String {
        self.failures
            .iter()
            .map(|failure| {
                format!(
                    "[{}/{}]: {}",
                    failure.collection, failure.id, failure.reason
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One processor declared on a collection: a registered kind name plus
/// arbitrary extra settings merged into the processor at construction.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProcessorDeclaration {
    pub kind: String,
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

/// Per-collection tracking metadata: the tenant owning the collection and the
/// processors feeding it. Held by the document store, read-mostly.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CollectionConfig {
    pub collection: String,
    pub site_id: String,
    #[serde(default)]
    pub processors: Vec<ProcessorDeclaration>,
}

/// The document store boundary. The pipeline only needs two things from it:
/// the per-collection processor configuration (re-read once per drain cycle
/// so changes take effect within one period) and atomic submission of one
/// cycle's batch.
#[async_trait]
pub trait DocumentStore {
    async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, TrackerError>;

    /// Submit the batch in a single call. Per-item failures are reported in
    /// the summary and must not abort the rest of the batch; only a failure
    /// of the submission itself is an `Err`.
    async fn execute_batch(&self, batch: Batch) -> Result<BatchSummary, TrackerError>;
}

#[cfg(test)]
mod tests {
    use super::{BatchSummary, FailedWrite};

    #[test]
    fn failure_message_names_collection_and_id() {
        let summary = BatchSummary {
            attempted: 3,
            failures: vec![
                FailedWrite {
                    collection: "stats".to_string(),
                    id: "p1|st1|product_view|2015-03-14".to_string(),
                    reason: "count is not an integer".to_string(),
                },
                FailedWrite {
                    collection: "sessions".to_string(),
                    id: "abc".to_string(),
                    reason: "pages is not an array".to_string(),
                },
            ],
        };

        assert!(summary.has_failures());
        let message = summary.failure_message();
        assert!(message.contains("[stats/p1|st1|product_view|2015-03-14]"));
        assert!(message.contains("[sessions/abc]"));
    }
}
