use std::sync::Arc;

use tracing::{error, info, warn};

use crate::models::game::{Game, PlayerColor, Winner};
use crate::models::user::{GameResult, GameSummary};
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::variant_repository::VariantRepository;

/// One-time post-game bookkeeping, triggered by creation of a game-over
/// marker. Safe under at-least-once redelivery: the `called_finish_game`
/// flag is checked before anything runs and flipped as one of the effects.
pub struct GameFinishService {
    games: Arc<dyn GameRepository + Send + Sync>,
    profiles: Arc<dyn ProfileRepository + Send + Sync>,
    variants: Arc<dyn VariantRepository + Send + Sync>,
}

impl GameFinishService {
    pub fn new(
        games: Arc<dyn GameRepository + Send + Sync>,
        profiles: Arc<dyn ProfileRepository + Send + Sync>,
        variants: Arc<dyn VariantRepository + Send + Sync>,
    ) -> Self {
        GameFinishService {
            games,
            profiles,
            variants,
        }
    }

    pub async fn on_game_over_marker(&self, game_id: &str) -> Result<(), StoreError> {
        let game = match self.games.get_game(game_id).await {
            Ok(game) => game,
            Err(StoreError::NotFound) => {
                error!("Game-over marker for missing game {}", game_id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let Some(winner) = game.winner else {
            // The rule layer only allows the marker once a winner is set.
            error!("Game {} has a game-over marker but no winner", game_id);
            return Ok(());
        };
        if game.called_finish_game {
            warn!("Finish already ran for game {}; skipping redelivery", game_id);
            return Ok(());
        }

        // The four effects run together; each is caught and logged on its
        // own so one failing never blocks the others.
        let (flag, white, black, popularity) = tokio::join!(
            self.games.set_called_finish_game(game_id),
            self.update_player(&game, PlayerColor::White, winner),
            self.update_player(&game, PlayerColor::Black, winner),
            self.variants.add_popularity(&game.variant_id, -1),
        );
        if let Err(e) = flag {
            error!("Could not flip finish flag on game {}: {}", game_id, e);
        }
        if let Err(e) = white {
            error!("White-side profile update failed for game {}: {}", game_id, e);
        }
        if let Err(e) = black {
            error!("Black-side profile update failed for game {}: {}", game_id, e);
        }
        if let Err(e) = popularity {
            warn!(
                "Popularity decrement failed for variant {}: {}",
                game.variant_id, e
            );
        }
        info!("Finish bookkeeping ran for game {}", game_id);
        Ok(())
    }

    async fn update_player(
        &self,
        game: &Game,
        side: PlayerColor,
        winner: Winner,
    ) -> Result<(), StoreError> {
        let (player_id, opponent_id, opponent_name) = match side {
            PlayerColor::White => (
                &game.white_id,
                game.black_id.clone(),
                game.black_display_name.clone(),
            ),
            PlayerColor::Black => (
                &game.black_id,
                game.white_id.clone(),
                game.white_display_name.clone(),
            ),
        };
        let Some(player_id) = player_id else {
            // Deleted players have no profile left to update.
            return Ok(());
        };

        let result = match winner {
            Winner::Draw => GameResult::Draw,
            w if w == Winner::from_color(side) => GameResult::Win,
            _ => GameResult::Loss,
        };

        let mut profile = self.profiles.get_profile(player_id).await?;
        profile.record_finished_game(GameSummary {
            game_id: game.id.clone(),
            variant_id: game.variant_id.clone(),
            variant_name: game.variant.name.clone(),
            creation_time_ms: game.time_created.timestamp_millis(),
            side,
            result,
            opponent_id,
            opponent_name,
        });
        self.profiles.put_profile(&profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::PlayerToMove;
    use crate::test_support::InMemoryStore;

    fn service(store: &Arc<InMemoryStore>) -> GameFinishService {
        GameFinishService::new(store.clone(), store.clone(), store.clone())
    }

    fn finished_game(store: &Arc<InMemoryStore>) -> String {
        store.seed_profile("alice-id", "alice", "Alice");
        store.seed_profile("bob-id", "bob", "Bob");
        let variant_id = store.seed_variant("carol-id", "Carol", "Atomic");
        store.bump_popularity(&variant_id, 1);
        let game_id = store.seed_game(&variant_id, ("alice-id", "Alice"), ("bob-id", "Bob"), false);
        let mut game = store.game(&game_id);
        game.winner = Some(Winner::White);
        game.player_to_move = PlayerToMove::GameOver;
        store.replace_game(game);
        game_id
    }

    #[tokio::test]
    async fn test_finish_updates_both_profiles_and_popularity() {
        let store = Arc::new(InMemoryStore::new());
        let game_id = finished_game(&store);

        service(&store).on_game_over_marker(&game_id).await.unwrap();

        let winner = store.profile("alice-id");
        assert_eq!(winner.num_games_played, 1);
        assert_eq!(winner.num_win_points, 1.0);
        assert_eq!(winner.last_5_games[0].result, GameResult::Win);
        assert_eq!(winner.last_5_games[0].opponent_id.as_deref(), Some("bob-id"));
        assert_eq!(winner.last_games_opponent_ids, vec!["bob-id"]);

        let loser = store.profile("bob-id");
        assert_eq!(loser.num_games_played, 1);
        assert_eq!(loser.num_win_points, 0.0);
        assert_eq!(loser.last_5_games[0].result, GameResult::Loss);
        assert_eq!(loser.last_5_games[0].side, PlayerColor::Black);

        assert!(store.game(&game_id).called_finish_game);
        let variant_id = store.game(&game_id).variant_id.clone();
        assert_eq!(store.variant(&variant_id).popularity, 0);
    }

    #[tokio::test]
    async fn test_redelivery_does_not_double_count() {
        let store = Arc::new(InMemoryStore::new());
        let game_id = finished_game(&store);
        let service = service(&store);

        service.on_game_over_marker(&game_id).await.unwrap();
        service.on_game_over_marker(&game_id).await.unwrap();

        let winner = store.profile("alice-id");
        assert_eq!(winner.num_games_played, 1);
        assert_eq!(winner.num_win_points, 1.0);
        assert_eq!(winner.last_5_games.len(), 1);
        let variant_id = store.game(&game_id).variant_id.clone();
        assert_eq!(store.variant(&variant_id).popularity, 0);
    }

    #[tokio::test]
    async fn test_unset_winner_aborts_without_touching_profiles() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_profile("alice-id", "alice", "Alice");
        store.seed_profile("bob-id", "bob", "Bob");
        let variant_id = store.seed_variant("carol-id", "Carol", "Atomic");
        let game_id = store.seed_game(&variant_id, ("alice-id", "Alice"), ("bob-id", "Bob"), false);

        service(&store).on_game_over_marker(&game_id).await.unwrap();

        assert_eq!(store.profile("alice-id").num_games_played, 0);
        assert!(!store.game(&game_id).called_finish_game);
    }

    #[tokio::test]
    async fn test_draw_awards_half_point_each() {
        let store = Arc::new(InMemoryStore::new());
        let game_id = finished_game(&store);
        let mut game = store.game(&game_id);
        game.winner = Some(Winner::Draw);
        store.replace_game(game);

        service(&store).on_game_over_marker(&game_id).await.unwrap();

        assert_eq!(store.profile("alice-id").num_win_points, 0.5);
        assert_eq!(store.profile("bob-id").num_win_points, 0.5);
    }

    #[tokio::test]
    async fn test_profile_failure_does_not_block_other_effects() {
        let store = Arc::new(InMemoryStore::new());
        let game_id = finished_game(&store);
        store.fail_table("profiles");

        service(&store).on_game_over_marker(&game_id).await.unwrap();

        // Profiles untouched, but the flag still flipped and popularity
        // still dropped.
        assert!(store.game(&game_id).called_finish_game);
        let variant_id = store.game(&game_id).variant_id.clone();
        assert_eq!(store.variant(&variant_id).popularity, 0);
    }

    #[tokio::test]
    async fn test_deleted_opponent_is_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let game_id = finished_game(&store);
        let mut game = store.game(&game_id);
        game.black_id = None;
        game.black_display_name = crate::DELETED_USER_DISPLAY_NAME.to_string();
        store.replace_game(game);

        service(&store).on_game_over_marker(&game_id).await.unwrap();

        let winner = store.profile("alice-id");
        assert_eq!(winner.num_games_played, 1);
        // The deleted opponent contributes no cache entry.
        assert!(winner.last_games_opponent_ids.is_empty());
    }
}
