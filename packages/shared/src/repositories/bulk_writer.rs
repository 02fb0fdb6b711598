use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

/// Hard ceiling on the number of items one atomic store write may carry.
pub const MAX_TRANSACT_ITEMS: usize = 100;

/// One document edit inside a bulk mutation: set each named attribute to the
/// given string value, or to null when the value is absent. Only display
/// identity ever travels this path, so string/null coverage is all it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
    pub table: String,
    /// Key attributes, in key-schema order (partition key first).
    pub key: Vec<(String, String)>,
    pub sets: Vec<(String, Option<String>)>,
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait BulkSink: Send + Sync {
    /// Commits one chunk atomically. Chunks are independent of each other.
    async fn commit(&self, edits: Vec<DocumentEdit>) -> Result<(), StoreError>;
}

pub struct DynamoDbBulkSink {
    pub client: Client,
}

impl DynamoDbBulkSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BulkSink for DynamoDbBulkSink {
    async fn commit(&self, edits: Vec<DocumentEdit>) -> Result<(), StoreError> {
        if edits.is_empty() {
            return Ok(());
        }
        let mut items = Vec::with_capacity(edits.len());
        for edit in edits {
            let mut update = Update::builder().table_name(&edit.table);
            for (name, value) in &edit.key {
                update = update.key(name, AttributeValue::S(value.clone()));
            }
            let mut clauses = Vec::with_capacity(edit.sets.len());
            for (i, (attr, value)) in edit.sets.iter().enumerate() {
                clauses.push(format!("#a{} = :v{}", i, i));
                update = update.expression_attribute_names(format!("#a{}", i), attr);
                update = update.expression_attribute_values(
                    format!(":v{}", i),
                    match value {
                        Some(v) => AttributeValue::S(v.clone()),
                        None => AttributeValue::Null(true),
                    },
                );
            }
            let update = update
                .update_expression(format!("SET {}", clauses.join(", ")))
                .build()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            items.push(TransactWriteItem::builder().update(update).build());
        }
        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }
}

/// Applies one edit per input document, committing in chunks of the store's
/// atomic-write ceiling. Chunks land sequentially and independently: a crash
/// after K of M chunks leaves exactly K applied, so edits must be idempotent
/// and a retry-from-scratch safe. Availability of a large bulk edit is
/// preferred over atomicity across it.
pub struct BulkWriter {
    sink: std::sync::Arc<dyn BulkSink + Send + Sync>,
    chunk_size: usize,
}

impl BulkWriter {
    pub fn new(sink: std::sync::Arc<dyn BulkSink + Send + Sync>) -> Self {
        BulkWriter {
            sink,
            chunk_size: MAX_TRANSACT_ITEMS,
        }
    }

    pub fn with_chunk_size(sink: std::sync::Arc<dyn BulkSink + Send + Sync>, chunk_size: usize) -> Self {
        BulkWriter { sink, chunk_size }
    }

    pub async fn apply<T, F>(&self, refs: &[T], edit: F) -> Result<(), StoreError>
    where
        F: Fn(&T) -> DocumentEdit,
    {
        if refs.is_empty() {
            return Ok(());
        }
        let chunks = refs.len().div_ceil(self.chunk_size);
        if chunks > 1 {
            info!(
                "Bulk edit of {} documents split into {} chunks of up to {}",
                refs.len(),
                chunks,
                self.chunk_size
            );
        }
        for (i, chunk) in refs.chunks(self.chunk_size).enumerate() {
            let edits: Vec<DocumentEdit> = chunk.iter().map(&edit).collect();
            self.sink.commit(edits).await?;
            debug!("Bulk chunk {}/{} committed", i + 1, chunks);
        }
        Ok(())
    }
}
