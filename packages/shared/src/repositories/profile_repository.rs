use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};

use crate::models::user::{PrivateCache, UserProfile};
use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, StoreError>;
    async fn put_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;
    async fn delete_profile(&self, user_id: &str) -> Result<(), StoreError>;
    async fn get_cache(&self, user_id: &str) -> Result<PrivateCache, StoreError>;
    async fn put_cache(&self, cache: &PrivateCache) -> Result<(), StoreError>;
    async fn delete_cache(&self, user_id: &str) -> Result<(), StoreError>;
}

pub struct DynamoDbProfileRepository {
    pub client: Client,
    pub profiles_table: String,
    pub caches_table: String,
}

impl DynamoDbProfileRepository {
    pub fn new(client: Client) -> Self {
        let profiles_table =
            std::env::var("PROFILES_TABLE").expect("PROFILES_TABLE environment variable must be set");
        let caches_table = std::env::var("PRIVATE_CACHES_TABLE")
            .expect("PRIVATE_CACHES_TABLE environment variable must be set");
        Self {
            client,
            profiles_table,
            caches_table,
        }
    }

    pub fn with_table_names(client: Client, profiles_table: &str, caches_table: &str) -> Self {
        Self {
            client,
            profiles_table: profiles_table.to_string(),
            caches_table: caches_table.to_string(),
        }
    }
}

#[async_trait]
impl ProfileRepository for DynamoDbProfileRepository {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.profiles_table)
            .key(
                "id",
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

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let item = to_item(profile).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.profiles_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.profiles_table)
            .key(
                "id",
                to_attribute_value(user_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn get_cache(&self, user_id: &str) -> Result<PrivateCache, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.caches_table)
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

    async fn put_cache(&self, cache: &PrivateCache) -> Result<(), StoreError> {
        let item = to_item(cache).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.caches_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn delete_cache(&self, user_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.caches_table)
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
