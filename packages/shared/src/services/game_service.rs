use std::sync::Arc;

use tracing::{info, warn};

use crate::models::game::Winner;
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::variant_repository::VariantRepository;
use crate::services::errors::rpc_errors::RpcError;
use crate::services::Caller;

/// Game lifecycle RPCs outside the normal finish path.
pub struct GameService {
    games: Arc<dyn GameRepository + Send + Sync>,
    variants: Arc<dyn VariantRepository + Send + Sync>,
}

impl GameService {
    pub fn new(
        games: Arc<dyn GameRepository + Send + Sync>,
        variants: Arc<dyn VariantRepository + Send + Sync>,
    ) -> Self {
        GameService { games, variants }
    }

    /// Voids a game without statistics: draw, no profile updates, and the
    /// finish flag set so the normal bookkeeping never runs. Callable by a
    /// player of the game or a moderator.
    pub async fn cancel_game(
        &self,
        caller: &Caller,
        game_id: &str,
        reason: &str,
    ) -> Result<(), RpcError> {
        let game = self.games.get_game(game_id).await.map_err(|e| match e {
            StoreError::NotFound => RpcError::not_found("Game does not exist"),
            other => other.into(),
        })?;
        let is_player = game.side_of(&caller.user_id).is_some();
        if !caller.moderator && !is_player {
            return Err(RpcError::permission_denied(
                "Only a player of the game or a moderator may cancel it",
            ));
        }
        if game.called_finish_game || game.is_finished() {
            return Err(RpcError::failed_precondition("Game is already finished"));
        }

        self.games
            .terminate(game_id, Winner::Draw)
            .await
            .map_err(RpcError::from)?;
        info!(
            "Game {} cancelled by {}: {}",
            game_id, caller.user_id, reason
        );
        if let Err(e) = self.variants.add_popularity(&game.variant_id, -1).await {
            warn!(
                "Popularity decrement failed for variant {}: {}",
                game.variant_id, e
            );
        }
        Ok(())
    }
}
