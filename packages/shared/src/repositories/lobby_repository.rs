use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, from_items, to_item};

use crate::models::lobby::LobbySlot;
use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait LobbyRepository: Send + Sync {
    async fn get_slot(&self, variant_id: &str, creator_id: &str) -> Result<LobbySlot, StoreError>;
    /// Creates the slot; `Conflict` if the (variant, creator) pair already
    /// has one.
    async fn create_slot(&self, slot: &LobbySlot) -> Result<(), StoreError>;
    async fn delete_slot(&self, variant_id: &str, creator_id: &str) -> Result<(), StoreError>;
    /// Sets both challenger fields together, or clears both together.
    /// Setting fails with `Conflict` when a challenger is already present.
    async fn set_challenger(
        &self,
        variant_id: &str,
        creator_id: &str,
        challenger: Option<(String, String)>,
    ) -> Result<(), StoreError>;
    /// Writes the game id onto the slot; `Conflict` once one is set.
    async fn set_game_doc_id(
        &self,
        variant_id: &str,
        creator_id: &str,
        game_id: &str,
    ) -> Result<(), StoreError>;
    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<LobbySlot>, StoreError>;
    async fn list_by_variant(&self, variant_id: &str) -> Result<Vec<LobbySlot>, StoreError>;
}

pub struct DynamoDbLobbyRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbLobbyRepository {
    pub fn new(client: Client) -> Self {
        let table_name =
            std::env::var("LOBBY_TABLE").expect("LOBBY_TABLE environment variable must be set");
        Self { client, table_name }
    }

    pub fn with_table_name(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    fn slot_key(variant_id: &str, creator_id: &str) -> [(&'static str, AttributeValue); 2] {
        [
            ("variant_id", AttributeValue::S(variant_id.to_string())),
            ("creator_id", AttributeValue::S(creator_id.to_string())),
        ]
    }
}

#[async_trait]
impl LobbyRepository for DynamoDbLobbyRepository {
    async fn get_slot(&self, variant_id: &str, creator_id: &str) -> Result<LobbySlot, StoreError> {
        let mut request = self.client.get_item().table_name(&self.table_name);
        for (name, value) in Self::slot_key(variant_id, creator_id) {
            request = request.key(name, value);
        }
        let output = request.send().await.map_err(StoreError::from_sdk)?;
        match output.item {
            Some(item) => from_item(item).map_err(|e| StoreError::Serialization(e.to_string())),
            None => Err(StoreError::NotFound),
        }
    }

    async fn create_slot(&self, slot: &LobbySlot) -> Result<(), StoreError> {
        let item = to_item(slot).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(variant_id)")
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn delete_slot(&self, variant_id: &str, creator_id: &str) -> Result<(), StoreError> {
        let mut request = self.client.delete_item().table_name(&self.table_name);
        for (name, value) in Self::slot_key(variant_id, creator_id) {
            request = request.key(name, value);
        }
        request.send().await.map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn set_challenger(
        &self,
        variant_id: &str,
        creator_id: &str,
        challenger: Option<(String, String)>,
    ) -> Result<(), StoreError> {
        let mut request = self.client.update_item().table_name(&self.table_name);
        for (name, value) in Self::slot_key(variant_id, creator_id) {
            request = request.key(name, value);
        }
        let request = match challenger {
            Some((challenger_id, challenger_display_name)) => request
                .update_expression("SET challenger_id = :cid, challenger_display_name = :cname")
                .expression_attribute_values(":cid", AttributeValue::S(challenger_id))
                .expression_attribute_values(":cname", AttributeValue::S(challenger_display_name))
                // Both fields move together; a present challenger wins.
                .condition_expression(
                    "attribute_exists(variant_id) AND \
                     (attribute_not_exists(challenger_id) OR challenger_id = :null)",
                )
                .expression_attribute_values(":null", AttributeValue::Null(true)),
            None => request
                .update_expression("SET challenger_id = :null, challenger_display_name = :null")
                .expression_attribute_values(":null", AttributeValue::Null(true))
                .condition_expression("attribute_exists(variant_id)"),
        };
        request.send().await.map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn set_game_doc_id(
        &self,
        variant_id: &str,
        creator_id: &str,
        game_id: &str,
    ) -> Result<(), StoreError> {
        let mut request = self.client.update_item().table_name(&self.table_name);
        for (name, value) in Self::slot_key(variant_id, creator_id) {
            request = request.key(name, value);
        }
        request
            .update_expression("SET game_doc_id = :gid")
            .expression_attribute_values(":gid", AttributeValue::S(game_id.to_string()))
            .condition_expression(
                "attribute_exists(variant_id) AND \
                 (attribute_not_exists(game_doc_id) OR game_doc_id = :null)",
            )
            .expression_attribute_values(":null", AttributeValue::Null(true))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<LobbySlot>, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("GSI_SlotsByCreator")
            .key_condition_expression("creator_id = :creator")
            .expression_attribute_values(":creator", AttributeValue::S(creator_id.to_string()))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        from_items(output.items.unwrap_or_default())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn list_by_variant(&self, variant_id: &str) -> Result<Vec<LobbySlot>, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("variant_id = :vid")
            .expression_attribute_values(":vid", AttributeValue::S(variant_id.to_string()))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        from_items(output.items.unwrap_or_default())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}
