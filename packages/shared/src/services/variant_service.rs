use std::sync::Arc;

use tracing::{info, warn};

use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::lobby_repository::LobbyRepository;
use crate::repositories::moderation_repository::ModerationRepository;
use crate::repositories::variant_repository::VariantRepository;
use crate::services::errors::rpc_errors::RpcError;
use crate::services::variant_index_service::VariantIndexService;
use crate::services::Caller;

/// Variant deletion and its cascade. The variant document is the
/// source-of-truth delete; everything downstream of it (index entry,
/// moderation doc, games, open slots) is best-effort and logged.
pub struct VariantService {
    variants: Arc<dyn VariantRepository + Send + Sync>,
    games: Arc<dyn GameRepository + Send + Sync>,
    lobby: Arc<dyn LobbyRepository + Send + Sync>,
    moderation: Arc<dyn ModerationRepository + Send + Sync>,
    index: Arc<VariantIndexService>,
}

impl VariantService {
    pub fn new(
        variants: Arc<dyn VariantRepository + Send + Sync>,
        games: Arc<dyn GameRepository + Send + Sync>,
        lobby: Arc<dyn LobbyRepository + Send + Sync>,
        moderation: Arc<dyn ModerationRepository + Send + Sync>,
        index: Arc<VariantIndexService>,
    ) -> Self {
        VariantService {
            variants,
            games,
            lobby,
            moderation,
            index,
        }
    }

    /// RPC entry point: only the creator or a moderator may delete.
    pub async fn delete_variant(&self, caller: &Caller, variant_id: &str) -> Result<(), RpcError> {
        let variant = self.variants.get_variant(variant_id).await.map_err(|e| match e {
            StoreError::NotFound => RpcError::not_found("Variant does not exist"),
            other => other.into(),
        })?;
        let is_creator = variant.creator_id.as_deref() == Some(caller.user_id.as_str());
        if !caller.moderator && !is_creator {
            return Err(RpcError::permission_denied(
                "Only the creator or a moderator may delete a variant",
            ));
        }
        self.delete_with_cascade(variant_id).await.map_err(RpcError::from)
    }

    /// Deletes the variant document, then runs the cascade. Also the path
    /// the wipe flow takes for each collected variant.
    pub async fn delete_with_cascade(&self, variant_id: &str) -> Result<(), StoreError> {
        self.variants.delete_variant(variant_id).await?;
        info!("Variant {} deleted; running cascade", variant_id);

        if let Err(e) = self.index.remove_variant(variant_id).await {
            warn!("Index cleanup failed for variant {}: {}", variant_id, e);
        }
        if let Err(e) = self.moderation.delete_doc(variant_id).await {
            warn!(
                "Moderation doc cleanup failed for variant {}: {}",
                variant_id, e
            );
        }
        match self.games.list_ids_by_variant(variant_id).await {
            Ok(game_ids) => {
                for game_id in game_ids {
                    if let Err(e) = self.games.delete_game(&game_id).await {
                        warn!("Could not delete game {} of variant {}: {}", game_id, variant_id, e);
                    }
                }
            }
            Err(e) => warn!("Could not list games of variant {}: {}", variant_id, e),
        }
        match self.lobby.list_by_variant(variant_id).await {
            Ok(slots) => {
                for slot in slots {
                    if let Err(e) = self.lobby.delete_slot(variant_id, &slot.creator_id).await {
                        warn!(
                            "Could not delete slot ({}, {}): {}",
                            variant_id, slot.creator_id, e
                        );
                    }
                }
            }
            Err(e) => warn!("Could not list slots of variant {}: {}", variant_id, e),
        }
        Ok(())
    }
}
