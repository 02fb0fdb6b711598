use std::sync::Arc;

use tracing::{info, warn};

use crate::models::game::PlayerColor;
use crate::repositories::bulk_writer::BulkWriter;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::variant_repository::VariantRepository;
use crate::DELETED_USER_DISPLAY_NAME;

/// Rewrites a user's (id, display name) pair everywhere it is mirrored:
/// creator fields on owned variants, white/black fields on played games.
/// Strictly display identity; nothing authorization-relevant ever travels
/// this path. Each target collection is an independent best-effort pass:
/// a failure on one never blocks the other, and nothing escalates to the
/// triggering event.
pub struct PropagationService {
    variants: Arc<dyn VariantRepository + Send + Sync>,
    games: Arc<dyn GameRepository + Send + Sync>,
    bulk: Arc<BulkWriter>,
}

impl PropagationService {
    pub fn new(
        variants: Arc<dyn VariantRepository + Send + Sync>,
        games: Arc<dyn GameRepository + Send + Sync>,
        bulk: Arc<BulkWriter>,
    ) -> Self {
        PropagationService {
            variants,
            games,
            bulk,
        }
    }

    /// Rename: the id stays, only the display name changes.
    pub async fn propagate_rename(&self, user_id: &str, new_name: &str) {
        self.rewrite_everywhere(user_id, Some(user_id.to_string()), new_name)
            .await;
    }

    /// Deletion: the id is nulled and the name becomes the deleted sentinel.
    pub async fn propagate_deletion(&self, user_id: &str) {
        self.rewrite_everywhere(user_id, None, DELETED_USER_DISPLAY_NAME)
            .await;
    }

    async fn rewrite_everywhere(
        &self,
        user_id: &str,
        new_id: Option<String>,
        display_name: &str,
    ) {
        match self.variants.list_by_creator(user_id).await {
            Ok(variants) => {
                let result = self
                    .bulk
                    .apply(&variants, |v| {
                        self.variants
                            .creator_identity_edit(&v.id, new_id.clone(), display_name)
                    })
                    .await;
                match result {
                    Ok(()) => info!(
                        "Rewrote creator identity on {} variants for user {}",
                        variants.len(),
                        user_id
                    ),
                    Err(e) => warn!("Variant identity rewrite failed for user {}: {}", user_id, e),
                }
            }
            Err(e) => warn!("Could not list variants owned by {}: {}", user_id, e),
        }

        for side in [PlayerColor::White, PlayerColor::Black] {
            match self.games.list_by_side(user_id, side, false).await {
                Ok(games) => {
                    let result = self
                        .bulk
                        .apply(&games, |g| {
                            self.games
                                .side_identity_edit(&g.id, side, new_id.clone(), display_name)
                        })
                        .await;
                    match result {
                        Ok(()) => info!(
                            "Rewrote {:?}-side identity on {} games for user {}",
                            side,
                            games.len(),
                            user_id
                        ),
                        Err(e) => warn!(
                            "{:?}-side game identity rewrite failed for user {}: {}",
                            side, user_id, e
                        ),
                    }
                }
                Err(e) => warn!(
                    "Could not list {:?}-side games for user {}: {}",
                    side, user_id, e
                ),
            }
        }
    }
}
