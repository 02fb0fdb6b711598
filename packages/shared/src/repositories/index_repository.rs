use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_items, to_item};

use crate::models::variant::IndexPage;
use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait IndexRepository: Send + Sync {
    /// All index pages in ascending page order.
    async fn list_pages(&self) -> Result<Vec<IndexPage>, StoreError>;
    /// Versioned write; `Conflict` when a concurrent writer advanced the
    /// page since `expected_version` was read (0 means "must be new").
    async fn put_page_versioned(
        &self,
        page: &IndexPage,
        expected_version: u64,
    ) -> Result<(), StoreError>;
}

pub struct DynamoDbIndexRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbIndexRepository {
    pub fn new(client: Client) -> Self {
        let table_name = std::env::var("VARIANT_INDEX_TABLE")
            .expect("VARIANT_INDEX_TABLE environment variable must be set");
        Self { client, table_name }
    }

    pub fn with_table_name(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

#[async_trait]
impl IndexRepository for DynamoDbIndexRepository {
    async fn list_pages(&self) -> Result<Vec<IndexPage>, StoreError> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        let mut pages: Vec<IndexPage> = from_items(output.items.unwrap_or_default())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        pages.sort_by_key(|p| p.page);
        Ok(pages)
    }

    async fn put_page_versioned(
        &self,
        page: &IndexPage,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let item = to_item(page).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item));
        let request = if expected_version == 0 {
            request
                .condition_expression("attribute_not_exists(#p) OR #v = :v")
                .expression_attribute_names("#p", "page")
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
}
