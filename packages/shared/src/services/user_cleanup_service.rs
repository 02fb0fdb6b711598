use std::sync::Arc;

use tracing::{info, warn};

use crate::repositories::lobby_repository::LobbyRepository;
use crate::repositories::moderation_repository::ModerationRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::propagation_service::PropagationService;

/// Cleanup cascade for an identity-provider account deletion. Every step is
/// best-effort: the account is already gone, so nothing here may fail the
/// event, only log what needs hand repair.
pub struct UserCleanupService {
    profiles: Arc<dyn ProfileRepository + Send + Sync>,
    lobby: Arc<dyn LobbyRepository + Send + Sync>,
    moderation: Arc<dyn ModerationRepository + Send + Sync>,
    propagation: Arc<PropagationService>,
}

impl UserCleanupService {
    pub fn new(
        profiles: Arc<dyn ProfileRepository + Send + Sync>,
        lobby: Arc<dyn LobbyRepository + Send + Sync>,
        moderation: Arc<dyn ModerationRepository + Send + Sync>,
        propagation: Arc<PropagationService>,
    ) -> Self {
        UserCleanupService {
            profiles,
            lobby,
            moderation,
            propagation,
        }
    }

    pub async fn on_account_deleted(&self, user_id: &str) {
        info!("Running deletion cleanup for user {}", user_id);

        // Propagate first, while the creator/player GSI entries still hold
        // the id that locates them.
        self.propagation.propagate_deletion(user_id).await;

        match self.lobby.list_by_creator(user_id).await {
            Ok(slots) => {
                for slot in slots {
                    if let Err(e) = self.lobby.delete_slot(&slot.variant_id, user_id).await {
                        warn!(
                            "Could not delete slot ({}, {}): {}",
                            slot.variant_id, user_id, e
                        );
                    }
                }
            }
            Err(e) => warn!("Could not list slots created by {}: {}", user_id, e),
        }

        if let Err(e) = self.profiles.delete_profile(user_id).await {
            warn!("Could not delete profile of {}: {}", user_id, e);
        }
        if let Err(e) = self.profiles.delete_cache(user_id).await {
            warn!("Could not delete private cache of {}: {}", user_id, e);
        }
        if let Err(e) = self.moderation.delete_backup(user_id).await {
            warn!("Could not delete ban backup of {}: {}", user_id, e);
        }
    }
}
