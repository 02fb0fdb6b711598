use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, from_items, to_attribute_value, to_item};

use crate::models::game::{Game, PlayerColor, Winner};
use crate::repositories::bulk_writer::DocumentEdit;
use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait GameRepository: Send + Sync {
    async fn get_game(&self, game_id: &str) -> Result<Game, StoreError>;
    async fn put_game(&self, game: &Game) -> Result<(), StoreError>;
    async fn delete_game(&self, game_id: &str) -> Result<(), StoreError>;
    /// Games in which the user plays the given side, via the side's GSI.
    async fn list_by_side(
        &self,
        user_id: &str,
        side: PlayerColor,
        ongoing_only: bool,
    ) -> Result<Vec<Game>, StoreError>;
    async fn list_ids_by_variant(&self, variant_id: &str) -> Result<Vec<String>, StoreError>;
    /// Flips the one-shot finish flag.
    async fn set_called_finish_game(&self, game_id: &str) -> Result<(), StoreError>;
    /// Ends a game in place: winner, player-to-move sentinel and finish flag
    /// in one write. Used by the moderation paths that bypass the normal
    /// finish trigger.
    async fn terminate(&self, game_id: &str, winner: Winner) -> Result<(), StoreError>;
    /// Bulk-writable rewrite of one side's denormalized identity.
    fn side_identity_edit(
        &self,
        game_id: &str,
        side: PlayerColor,
        user_id: Option<String>,
        display_name: &str,
    ) -> DocumentEdit;
}

pub struct DynamoDbGameRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbGameRepository {
    pub fn new(client: Client) -> Self {
        let table_name =
            std::env::var("GAMES_TABLE").expect("GAMES_TABLE environment variable must be set");
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
impl GameRepository for DynamoDbGameRepository {
    async fn get_game(&self, game_id: &str) -> Result<Game, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(game_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        match output.item {
            Some(item) => from_item(item).map_err(|e| StoreError::Serialization(e.to_string())),
            None => Err(StoreError::NotFound),
        }
    }

    async fn put_game(&self, game: &Game) -> Result<(), StoreError> {
        let item = to_item(game).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn delete_game(&self, game_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(game_id).map_err(|e| StoreError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        Ok(())
    }

    async fn list_by_side(
        &self,
        user_id: &str,
        side: PlayerColor,
        ongoing_only: bool,
    ) -> Result<Vec<Game>, StoreError> {
        let (index_name, key_attr) = match side {
            PlayerColor::White => ("GSI_GamesByWhite", "white_id"),
            PlayerColor::Black => ("GSI_GamesByBlack", "black_id"),
        };
        let mut query = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(index_name)
            .key_condition_expression(format!("{} = :uid", key_attr))
            .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()));
        if ongoing_only {
            query = query
                .filter_expression("player_to_move <> :over")
                .expression_attribute_values(":over", AttributeValue::S("game-over".to_string()));
        }
        let output = query.send().await.map_err(StoreError::from_sdk)?;
        from_items(output.items.unwrap_or_default())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn list_ids_by_variant(&self, variant_id: &str) -> Result<Vec<String>, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name("GSI_GamesByVariant")
            .key_condition_expression("variant_id = :vid")
            .expression_attribute_values(":vid", AttributeValue::S(variant_id.to_string()))
            .projection_expression("id")
            .send()
            .await
            .map_err(StoreError::from_sdk)?;
        let mut ids = Vec::new();
        for item in output.items.unwrap_or_default() {
            if let Some(AttributeValue::S(id)) = item.get("id") {
                ids.push(id.clone());
            }
        }
        Ok(ids)
    }

    async fn set_called_finish_game(&self, game_id: &str) -> Result<(), StoreError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(game_id.to_string()))
            .update_expression("SET called_finish_game = :t")
            .expression_attribute_values(":t", AttributeValue::Bool(true))
            .condition_expression("attribute_exists(id)")
            .send()
            .await
            .map_err(|e| match StoreError::from_sdk(e) {
                StoreError::Conflict => StoreError::NotFound,
                other => other,
            })?;
        Ok(())
    }

    async fn terminate(&self, game_id: &str, winner: Winner) -> Result<(), StoreError> {
        let winner_value: AttributeValue =
            to_attribute_value(winner).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(game_id.to_string()))
            .update_expression("SET winner = :w, player_to_move = :over, called_finish_game = :t")
            .expression_attribute_values(":w", winner_value)
            .expression_attribute_values(":over", AttributeValue::S("game-over".to_string()))
            .expression_attribute_values(":t", AttributeValue::Bool(true))
            .condition_expression("attribute_exists(id)")
            .send()
            .await
            .map_err(|e| match StoreError::from_sdk(e) {
                StoreError::Conflict => StoreError::NotFound,
                other => other,
            })?;
        Ok(())
    }

    fn side_identity_edit(
        &self,
        game_id: &str,
        side: PlayerColor,
        user_id: Option<String>,
        display_name: &str,
    ) -> DocumentEdit {
        let (id_attr, name_attr) = match side {
            PlayerColor::White => ("white_id", "white_display_name"),
            PlayerColor::Black => ("black_id", "black_display_name"),
        };
        DocumentEdit {
            table: self.table_name.clone(),
            key: vec![("id".to_string(), game_id.to_string())],
            sets: vec![
                (id_attr.to_string(), user_id),
                (name_attr.to_string(), Some(display_name.to_string())),
            ],
        }
    }
}
