use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, from_items, to_attribute_value, to_item};

use crate::models::variant::Variant;
use crate::repositories::bulk_writer::DocumentEdit;
use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait VariantRepository: Send + Sync {
    async fn get_variant(&self, variant_id: &str) -> Result<Variant, StoreError>;
    async fn put_variant(&self, variant: &Variant) -> Result<(), StoreError>;
    async fn delete_variant(&self, variant_id: &str) -> Result<(), StoreError>;
    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<Variant>, StoreError>;
    /// Atomic counter bump; no read-modify-write round trip.
    async fn add_popularity(&self, variant_id: &str, delta: i64) -> Result<(), StoreError>;
    async fn add_upvotes(&self, variant_id: &str, delta: i64) -> Result<(), StoreError>;
    /// Bulk-writable rewrite of the denormalized creator identity.
    fn creator_identity_edit(
        &self,
        variant_id: &str,
        creator_id: Option<String>,
        display_name: &str,
    ) -> DocumentEdit;
}

pub struct DynamoDbVariantRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbVariantRepository {
    pub fn new(client: Client) -> Self {
        let table_name =
            std::env::var("VARIANTS_TABLE").expect("VARIANTS_TABLE environment variable must be set");
        Self { client, table_name }
    }

    pub fn with_table_name(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    async fn add_to_counter(
        &self,
        variant_id: &str,
        attribute: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(variant_id.to_string()))
            .update_expression("ADD #c :delta")
            .expression_attribute_names("#c", attribute)
            .expression_attribute_values(":delta", AttributeValue::N(delta.to_string()))
            .condition_expression("attribute_exists(id)")
            .send()
            .await
            .map_err(|e| match StoreError::from_sdk(e) {
                StoreError::Conflict => StoreError::NotFound,
                other => other,
            })?;
        Ok(())
    }
}

#[async_trait]
impl VariantRepository for DynamoDbVariantRepository {
    async fn get_variant(&self, variant_id: &str) -> Result<Variant, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(variant_id)
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

    async fn put_variant(&self, variant: &Variant) -> Result<(), StoreError> {
        let item = to_item(variant).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn delete_variant(&self, variant_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(variant_id)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<Variant>, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("GSI_VariantsByCreator")
            .key_condition_expression("creator_id = :creator")
            .expression_attribute_values(":creator", AttributeValue::S(creator_id.to_string()))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        from_items(output.items.unwrap_or_default())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn add_popularity(&self, variant_id: &str, delta: i64) -> Result<(), StoreError> {
        self.add_to_counter(variant_id, "popularity", delta).await
    }

    async fn add_upvotes(&self, variant_id: &str, delta: i64) -> Result<(), StoreError> {
        self.add_to_counter(variant_id, "num_upvotes", delta).await
    }

    fn creator_identity_edit(
        &self,
        variant_id: &str,
        creator_id: Option<String>,
        display_name: &str,
    ) -> DocumentEdit {
        DocumentEdit {
            table: self.table_name.clone(),
            key: vec![("id".to_string(), variant_id.to_string())],
            sets: vec![
                ("creator_id".to_string(), creator_id),
                (
                    "creator_display_name".to_string(),
                    Some(display_name.to_string()),
                ),
            ],
        }
    }
}
