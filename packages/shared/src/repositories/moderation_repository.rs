use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, from_items, to_attribute_value, to_item};

use crate::models::moderation::{BanBackup, ModerationDoc};
use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait ModerationRepository: Send + Sync {
    async fn get_doc(&self, target_id: &str) -> Result<ModerationDoc, StoreError>;
    /// Versioned write backing the optimistic read-modify-write cycle:
    /// `expected_version` is the version the caller read; `Conflict` means a
    /// concurrent writer got there first and the caller should re-read.
    async fn put_doc_versioned(
        &self,
        doc: &ModerationDoc,
        expected_version: u64,
    ) -> Result<(), StoreError>;
    async fn delete_doc(&self, target_id: &str) -> Result<(), StoreError>;
    /// Full scan; only the wipe path walks every summary.
    async fn scan_docs(&self) -> Result<Vec<ModerationDoc>, StoreError>;
    async fn get_backup(&self, user_id: &str) -> Result<BanBackup, StoreError>;
    async fn put_backup(&self, backup: &BanBackup) -> Result<(), StoreError>;
    async fn delete_backup(&self, user_id: &str) -> Result<(), StoreError>;
}

pub struct DynamoDbModerationRepository {
    pub client: Client,
    pub moderation_table: String,
    pub backups_table: String,
}

impl DynamoDbModerationRepository {
    pub fn new(client: Client) -> Self {
        let moderation_table = std::env::var("MODERATION_TABLE")
            .expect("MODERATION_TABLE environment variable must be set");
        let backups_table = std::env::var("BAN_BACKUPS_TABLE")
            .expect("BAN_BACKUPS_TABLE environment variable must be set");
        Self {
            client,
            moderation_table,
            backups_table,
        }
    }

    pub fn with_table_names(client: Client, moderation_table: &str, backups_table: &str) -> Self {
        Self {
            client,
            moderation_table: moderation_table.to_string(),
            backups_table: backups_table.to_string(),
        }
    }
}

#[async_trait]
impl ModerationRepository for DynamoDbModerationRepository {
    async fn get_doc(&self, target_id: &str) -> Result<ModerationDoc, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.moderation_table)
            .key(
                "target_id",
                to_attribute_value(target_id)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        match output.item {
            Some(item) => from_item(item).map_err(|e| StoreError::Serialization(e.to_string())),
            None => Err(StoreError::NotFound),
        }
    }

    async fn put_doc_versioned(
        &self,
        doc: &ModerationDoc,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let item = to_item(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let request = self
            .client
            .put_item()
            .table_name(&self.moderation_table)
            .set_item(Some(item));
        let request = if expected_version == 0 {
            // First write for this target: the doc must not exist yet, or
            // must still be at version 0.
            request
                .condition_expression("attribute_not_exists(target_id) OR #v = :v")
                .expression_attribute_names("#v", "version")
                .expression_attribute_values(":v", AttributeValue::N("0".to_string()))
        } else {
            request
                .condition_expression("#v = :v")
                .expression_attribute_names("#v", "version")
                .expression_attribute_values(":v", AttributeValue::N(expected_version.to_string()))
        };
        request.send().await.map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn delete_doc(&self, target_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.moderation_table)
            .key(
                "target_id",
                to_attribute_value(target_id)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn scan_docs(&self) -> Result<Vec<ModerationDoc>, StoreError> {
        let mut docs = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.moderation_table)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(StoreError::from_sdk)?;
            let page: Vec<ModerationDoc> = from_items(output.items.unwrap_or_default())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            docs.extend(page);
            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(docs)
    }

    async fn get_backup(&self, user_id: &str) -> Result<BanBackup, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.backups_table)
            .key(
                "user_id",
                to_attribute_value(user_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        match output.item {
            Some(item) => from_item(item).map_err(|e| StoreError::Serialization(e.to_string())),
            None => Err(StoreError::NotFound),
        }
    }

    async fn put_backup(&self, backup: &BanBackup) -> Result<(), StoreError> {
        let item = to_item(backup).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.backups_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn delete_backup(&self, user_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.backups_table)
            .key(
                "user_id",
                to_attribute_value(user_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }
}
