use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::TrackerError;
use crate::store::{
    Batch, BatchSummary, CollectionConfig, DocumentStore, FailedWrite, MergeFunction,
    WriteOperation,
};

/// In-process document store. Applies the same creation-vs-merge branching a
/// search store would run server-side, which makes it the backing store for
/// tests and local runs.
pub struct MemoryStore {
    configs: Mutex<Vec<CollectionConfig>>,
    documents: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new(configs: Vec<CollectionConfig>) -> Self {
        Self {
            configs: Mutex::new(configs),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the collection configuration. The pipeline re-reads it every
    /// cycle, so the change is visible within one drain period.
    pub fn set_configs(&self, configs: Vec<CollectionConfig>) {
        *self.configs.lock().expect("memory store lock poisoned") = configs;
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .expect("memory store lock poisoned")
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.documents
            .lock()
            .expect("memory store lock poisoned")
            .keys()
            .filter(|(owner, _)| owner == collection)
            .count()
    }

    /// Seed a document directly, bypassing merge semantics.
    pub fn insert_document(&self, collection: &str, id: &str, document: Value) {
        self.documents
            .lock()
            .expect("memory store lock poisoned")
            .insert((collection.to_string(), id.to_string()), document);
    }

    fn apply(
        documents: &mut HashMap<(String, String), Value>,
        operation: WriteOperation,
    ) -> Result<(), String> {
        match operation {
            WriteOperation::Create {
                collection,
                id,
                document,
            } => {
                documents.insert((collection, id), document);
                Ok(())
            }
            WriteOperation::Upsert {
                collection,
                id,
                merge,
                create,
                ..
            } => match documents.entry((collection, id)) {
                Entry::Vacant(slot) => {
                    slot.insert(create);
                    Ok(())
                }
                Entry::Occupied(mut slot) => Self::merge(slot.get_mut(), merge),
            },
        }
    }

    fn merge(document: &mut Value, function: MergeFunction) -> Result<(), String> {
        let fields = document
            .as_object_mut()
            .ok_or_else(|| "stored document is not an object".to_string())?;

        match function {
            MergeFunction::IncrementCounter { field } => {
                let count = fields
                    .get(&field)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| format!("field {field} is not an integer"))?;
                fields.insert(field, Value::from(count + 1));
                Ok(())
            }
            MergeFunction::AppendCapped {
                field,
                entry,
                cap,
                overflow_flag,
            } => {
                // Missing field counts as an empty list, same as the
                // original store-side script.
                let entries = fields
                    .entry(field)
                    .or_insert_with(|| Value::Array(Vec::new()))
                    .as_array_mut()
                    .ok_or_else(|| "append target is not an array".to_string())?;
                if entries.len() < cap {
                    entries.push(entry);
                    return Ok(());
                }
                fields.insert(overflow_flag, Value::Bool(true));
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, TrackerError> {
        Ok(self
            .configs
            .lock()
            .expect("memory store lock poisoned")
            .clone())
    }

    async fn execute_batch(&self, batch: Batch) -> Result<BatchSummary, TrackerError> {
        let mut documents = self.documents.lock().expect("memory store lock poisoned");

        let mut summary = BatchSummary {
            attempted: batch.len(),
            failures: Vec::new(),
        };
        for operation in batch.into_operations() {
            let collection = operation.collection().to_string();
            let id = operation.id().to_string();
            if let Err(reason) = Self::apply(&mut documents, operation) {
                summary.failures.push(FailedWrite {
                    collection,
                    id,
                    reason,
                });
            }
        }
        Ok(summary)
    }
}
