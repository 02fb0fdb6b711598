use std::sync::Arc;

use tracing::{info, warn};

use crate::models::game::{Game, PlayerColor, RequestedColor};
use crate::models::lobby::LobbySlot;
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::lobby_repository::LobbyRepository;
use crate::repositories::variant_repository::VariantRepository;
use crate::services::errors::rpc_errors::RpcError;
use crate::services::Caller;

/// The lobby handshake: Open -> Challenged -> GameCreated -> Removed, per
/// (variant, creator) slot. Slot writes arrive as client document writes;
/// the methods here re-validate the same invariants the rule layer enforces
/// for those writes, and `create_game` is the server-only step of the
/// handshake.
pub struct LobbyService {
    lobby: Arc<dyn LobbyRepository + Send + Sync>,
    variants: Arc<dyn VariantRepository + Send + Sync>,
    games: Arc<dyn GameRepository + Send + Sync>,
}

impl LobbyService {
    pub fn new(
        lobby: Arc<dyn LobbyRepository + Send + Sync>,
        variants: Arc<dyn VariantRepository + Send + Sync>,
        games: Arc<dyn GameRepository + Send + Sync>,
    ) -> Self {
        LobbyService {
            lobby,
            variants,
            games,
        }
    }

    /// Sets both challenger fields together. Rejected when the slot already
    /// has a challenger or the actor is the slot's own creator.
    pub async fn join_slot(
        &self,
        variant_id: &str,
        slot_creator_id: &str,
        challenger_id: &str,
        challenger_display_name: &str,
    ) -> Result<(), RpcError> {
        if challenger_id == slot_creator_id {
            return Err(RpcError::invalid_argument(
                "A slot creator cannot challenge their own slot",
            ));
        }
        let slot = self.get_slot_or_precondition(variant_id, slot_creator_id).await?;
        if slot.has_challenger() {
            return Err(RpcError::failed_precondition(
                "Slot already has a challenger",
            ));
        }
        self.lobby
            .set_challenger(
                variant_id,
                slot_creator_id,
                Some((
                    challenger_id.to_string(),
                    challenger_display_name.to_string(),
                )),
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict => {
                    RpcError::failed_precondition("Slot already has a challenger")
                }
                other => other.into(),
            })
    }

    /// Clears both challenger fields together. Only the current challenger
    /// may withdraw.
    pub async fn clear_challenger(
        &self,
        variant_id: &str,
        slot_creator_id: &str,
        actor_id: &str,
    ) -> Result<(), RpcError> {
        let slot = self.get_slot_or_precondition(variant_id, slot_creator_id).await?;
        if slot.challenger_id.as_deref() != Some(actor_id) {
            return Err(RpcError::permission_denied(
                "Only the current challenger may withdraw",
            ));
        }
        self.lobby
            .set_challenger(variant_id, slot_creator_id, None)
            .await
            .map_err(RpcError::from)
    }

    /// The creator may remove the slot at any time; the challenger only once
    /// a game exists for it.
    pub async fn remove_slot(
        &self,
        variant_id: &str,
        slot_creator_id: &str,
        actor_id: &str,
    ) -> Result<(), RpcError> {
        let slot = self.get_slot_or_precondition(variant_id, slot_creator_id).await?;
        let is_creator = actor_id == slot_creator_id;
        let is_challenger = slot.challenger_id.as_deref() == Some(actor_id);
        if !is_creator && !(is_challenger && slot.game_doc_id.is_some()) {
            return Err(RpcError::permission_denied(
                "Only the creator, or the challenger of a started slot, may remove it",
            ));
        }
        self.lobby
            .delete_slot(variant_id, slot_creator_id)
            .await
            .map_err(RpcError::from)
    }

    /// Server half of the handshake. The caller must be the slot's creator;
    /// a slot with no game id is a normal transient state for readers, so
    /// everything here is precondition-checked rather than assumed.
    pub async fn create_game(
        &self,
        caller: &Caller,
        variant_id: &str,
        slot_creator_id: &str,
    ) -> Result<String, RpcError> {
        if caller.user_id != slot_creator_id {
            return Err(RpcError::permission_denied(
                "Only the slot creator may start its game",
            ));
        }
        let slot = self.get_slot_or_precondition(variant_id, slot_creator_id).await?;
        let (challenger_id, challenger_name) = match (&slot.challenger_id, &slot.challenger_display_name) {
            (Some(id), Some(name)) => (id.clone(), name.clone()),
            _ => {
                return Err(RpcError::failed_precondition(
                    "Slot has no challenger yet",
                ))
            }
        };
        if slot.game_doc_id.is_some() {
            return Err(RpcError::failed_precondition(
                "A game was already created for this slot",
            ));
        }

        let variant = self.variants.get_variant(variant_id).await.map_err(|e| match e {
            StoreError::NotFound => RpcError::not_found("Variant does not exist"),
            other => other.into(),
        })?;
        let starting_side = variant.starting_side().ok_or_else(|| {
            RpcError::internal("Variant initial state carries no starting-side flag")
        })?;

        let creator_plays_white = match slot.requested_color {
            RequestedColor::White => true,
            RequestedColor::Black => false,
            // Fairness, not unpredictability.
            RequestedColor::Random => rand::random::<bool>(),
        };
        let (white, black) = if creator_plays_white {
            (
                (slot.creator_id.as_str(), slot.creator_display_name.as_str()),
                (challenger_id.as_str(), challenger_name.as_str()),
            )
        } else {
            (
                (challenger_id.as_str(), challenger_name.as_str()),
                (slot.creator_id.as_str(), slot.creator_display_name.as_str()),
            )
        };

        let game = Game::new(
            variant,
            starting_side,
            slot.requested_color,
            white.0,
            white.1,
            black.0,
            black.1,
        );
        self.games.put_game(&game).await.map_err(RpcError::from)?;

        if let Err(e) = self.variants.add_popularity(variant_id, 1).await {
            warn!("Popularity bump failed for variant {}: {}", variant_id, e);
        }

        if let Err(e) = self
            .lobby
            .set_game_doc_id(variant_id, slot_creator_id, &game.id)
            .await
        {
            // A concurrent call won the slot. The game written above has no
            // slot pointing at it, so take it back out.
            warn!(
                "Slot ({}, {}) already carries a game id: {}",
                variant_id, slot_creator_id, e
            );
            if let Err(cleanup) = self.games.delete_game(&game.id).await {
                warn!("Could not remove orphaned game {}: {}", game.id, cleanup);
            }
            return Err(RpcError::failed_precondition(
                "A game was already created for this slot",
            ));
        }

        info!(
            "Game {} created from slot ({}, {})",
            game.id, variant_id, slot_creator_id
        );
        Ok(game.id)
    }

    async fn get_slot_or_precondition(
        &self,
        variant_id: &str,
        slot_creator_id: &str,
    ) -> Result<LobbySlot, RpcError> {
        self.lobby
            .get_slot(variant_id, slot_creator_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    RpcError::failed_precondition("Lobby slot does not exist")
                }
                other => other.into(),
            })
    }
}
