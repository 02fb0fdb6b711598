use std::sync::Arc;

use tracing::{info, warn};

use crate::blobs::{profile_image_path, BlobStore};
use crate::identity::{IdentityError, IdentityProvider, IdentityUser};
use crate::models::game::{PlayerColor, Winner};
use crate::models::moderation::BanBackup;
use crate::repositories::bulk_writer::BulkWriter;
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::moderation_repository::ModerationRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::variant_repository::VariantRepository;
use crate::services::errors::rpc_errors::RpcError;
use crate::services::propagation_service::PropagationService;
use crate::services::variant_service::VariantService;
use crate::services::Caller;
use crate::DELETED_USER_DISPLAY_NAME;

const MAX_WRITE_ATTEMPTS: u32 = 5;

/// The account moderation lifecycle: reversible ban, its inverse unban, and
/// the irreversible wipe. Every entry point requires a moderator caller and
/// rejects self-targeting or targeting another moderator. All three tolerate
/// replay from the start.
pub struct ModerationService {
    profiles: Arc<dyn ProfileRepository + Send + Sync>,
    games: Arc<dyn GameRepository + Send + Sync>,
    variants: Arc<dyn VariantRepository + Send + Sync>,
    moderation: Arc<dyn ModerationRepository + Send + Sync>,
    identity: Arc<dyn IdentityProvider + Send + Sync>,
    blobs: Arc<dyn BlobStore + Send + Sync>,
    propagation: Arc<PropagationService>,
    variant_service: Arc<VariantService>,
    bulk: Arc<BulkWriter>,
}

impl ModerationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: Arc<dyn ProfileRepository + Send + Sync>,
        games: Arc<dyn GameRepository + Send + Sync>,
        variants: Arc<dyn VariantRepository + Send + Sync>,
        moderation: Arc<dyn ModerationRepository + Send + Sync>,
        identity: Arc<dyn IdentityProvider + Send + Sync>,
        blobs: Arc<dyn BlobStore + Send + Sync>,
        propagation: Arc<PropagationService>,
        variant_service: Arc<VariantService>,
        bulk: Arc<BulkWriter>,
    ) -> Self {
        ModerationService {
            profiles,
            games,
            variants,
            moderation,
            identity,
            blobs,
            propagation,
            variant_service,
            bulk,
        }
    }

    pub async fn ban_user(&self, caller: &Caller, target_id: &str) -> Result<(), RpcError> {
        let identity_user = self.check_target(caller, target_id).await?;
        if !identity_user.enabled {
            warn!("Ban requested for already-disabled user {}", target_id);
            return Ok(());
        }
        self.ban_internal(target_id, true).await?;
        info!("User {} banned by {}", target_id, caller.user_id);
        Ok(())
    }

    pub async fn unban_user(&self, caller: &Caller, target_id: &str) -> Result<(), RpcError> {
        let identity_user = self.check_target(caller, target_id).await?;
        if identity_user.enabled {
            warn!("Unban requested for user {} who is not disabled", target_id);
            return Ok(());
        }

        // Both the live profile and the backup must exist; a wiped user's
        // backup is gone forever, so wipe is a one-way street.
        let mut profile = self.profiles.get_profile(target_id).await.map_err(|e| match e {
            StoreError::NotFound => RpcError::not_found("No profile for this user"),
            other => other.into(),
        })?;
        let backup = self.moderation.get_backup(target_id).await.map_err(|e| match e {
            StoreError::NotFound => RpcError::not_found("No ban backup for this user"),
            other => other.into(),
        })?;

        profile.name = backup.name.clone();
        profile.about = backup.about.clone();
        profile.profile_img = backup.profile_img.clone();
        profile.banned = false;
        self.profiles.put_profile(&profile).await.map_err(RpcError::from)?;

        let display_name = if backup.name.is_empty() {
            format!("@{}", profile.username)
        } else {
            backup.name.clone()
        };
        self.identity
            .restore_and_enable(target_id, &display_name)
            .await
            .map_err(|e| RpcError::internal(&e.to_string()))?;

        // Identity fields were nulled during the ban, so the backup's saved
        // id lists are the only map back; a fresh query would find nothing.
        self.restore_identity_from_backup(&backup, target_id, &display_name)
            .await;

        if let Err(e) = self.moderation.delete_backup(target_id).await {
            warn!("Could not delete ban backup for {}: {}", target_id, e);
        }
        info!("User {} unbanned by {}", target_id, caller.user_id);
        Ok(())
    }

    /// Irreversible superset of ban.
    pub async fn wipe_user(&self, caller: &Caller, target_id: &str) -> Result<(), RpcError> {
        let identity_user = self.check_target(caller, target_id).await?;

        // Union live ownership with the backup's list so an already-banned
        // user's variants (whose creator ids are already nulled) are still
        // collected.
        let mut variant_ids: Vec<String> = self
            .variants
            .list_by_creator(target_id)
            .await
            .map_err(RpcError::from)?
            .into_iter()
            .map(|v| v.id)
            .collect();
        if let Ok(backup) = self.moderation.get_backup(target_id).await {
            for id in backup.variant_ids {
                if !variant_ids.contains(&id) {
                    variant_ids.push(id);
                }
            }
        }

        if identity_user.enabled {
            // Wipe has no undo; no point snapshotting a backup.
            self.ban_internal(target_id, false).await?;
        }

        for variant_id in &variant_ids {
            if let Err(e) = self.variant_service.delete_with_cascade(variant_id).await {
                warn!("Wipe could not delete variant {}: {}", variant_id, e);
            }
        }

        if let Err(e) = self.moderation.delete_doc(target_id).await {
            warn!("Could not drop reports against {}: {}", target_id, e);
        }
        self.scrub_reports_filed_by(target_id).await;
        if let Err(e) = self.profiles.delete_cache(target_id).await {
            warn!("Could not delete private cache of {}: {}", target_id, e);
        }
        if let Err(e) = self.blobs.delete(&profile_image_path(target_id)).await {
            warn!("Could not delete profile image of {}: {}", target_id, e);
        }
        if let Err(e) = self.moderation.delete_backup(target_id).await {
            warn!("Could not delete ban backup of {}: {}", target_id, e);
        }
        info!("User {} wiped by {}", target_id, caller.user_id);
        Ok(())
    }

    /// Shared ban core. Skips nothing except (optionally) the backup; the
    /// caller has already established the account is enabled.
    async fn ban_internal(&self, target_id: &str, with_backup: bool) -> Result<(), RpcError> {
        let mut profile = self.profiles.get_profile(target_id).await.map_err(|e| match e {
            StoreError::NotFound => RpcError::not_found("No profile for this user"),
            other => other.into(),
        })?;

        let white_ongoing: Vec<String> = self
            .games
            .list_by_side(target_id, PlayerColor::White, true)
            .await
            .map_err(RpcError::from)?
            .into_iter()
            .map(|g| g.id)
            .collect();
        let black_ongoing: Vec<String> = self
            .games
            .list_by_side(target_id, PlayerColor::Black, true)
            .await
            .map_err(RpcError::from)?
            .into_iter()
            .map(|g| g.id)
            .collect();
        let variant_ids: Vec<String> = self
            .variants
            .list_by_creator(target_id)
            .await
            .map_err(RpcError::from)?
            .into_iter()
            .map(|v| v.id)
            .collect();

        if with_backup {
            // Captured before any mutation so unban can be exact. A replayed
            // ban must not overwrite the original snapshot with the already
            // scrubbed profile.
            match self.moderation.get_backup(target_id).await {
                Ok(_) => warn!("Ban backup for {} already exists; keeping it", target_id),
                Err(StoreError::NotFound) => {
                    let backup = BanBackup {
                        user_id: target_id.to_string(),
                        name: profile.name.clone(),
                        about: profile.about.clone(),
                        profile_img: profile.profile_img.clone(),
                        white_game_ids: white_ongoing.clone(),
                        black_game_ids: black_ongoing.clone(),
                        variant_ids: variant_ids.clone(),
                    };
                    self.moderation.put_backup(&backup).await.map_err(RpcError::from)?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        // The banned player can never receive a normal finish trigger, so
        // their ongoing games are ended directly, opponent winning.
        for game_id in &white_ongoing {
            if let Err(e) = self.games.terminate(game_id, Winner::Black).await {
                warn!("Could not terminate game {} of {}: {}", game_id, target_id, e);
            }
        }
        for game_id in &black_ongoing {
            if let Err(e) = self.games.terminate(game_id, Winner::White).await {
                warn!("Could not terminate game {} of {}: {}", game_id, target_id, e);
            }
        }

        profile.name = DELETED_USER_DISPLAY_NAME.to_string();
        profile.about = String::new();
        profile.profile_img = None;
        profile.banned = true;
        self.profiles.put_profile(&profile).await.map_err(RpcError::from)?;

        self.identity
            .disable_and_strip(target_id)
            .await
            .map_err(|e| RpcError::internal(&e.to_string()))?;

        self.propagation.propagate_deletion(target_id).await;
        Ok(())
    }

    async fn restore_identity_from_backup(
        &self,
        backup: &BanBackup,
        target_id: &str,
        display_name: &str,
    ) {
        let result = self
            .bulk
            .apply(&backup.white_game_ids, |game_id| {
                self.games.side_identity_edit(
                    game_id,
                    PlayerColor::White,
                    Some(target_id.to_string()),
                    display_name,
                )
            })
            .await;
        if let Err(e) = result {
            warn!("Could not restore white-side games for {}: {}", target_id, e);
        }
        let result = self
            .bulk
            .apply(&backup.black_game_ids, |game_id| {
                self.games.side_identity_edit(
                    game_id,
                    PlayerColor::Black,
                    Some(target_id.to_string()),
                    display_name,
                )
            })
            .await;
        if let Err(e) = result {
            warn!("Could not restore black-side games for {}: {}", target_id, e);
        }
        let result = self
            .bulk
            .apply(&backup.variant_ids, |variant_id| {
                self.variants.creator_identity_edit(
                    variant_id,
                    Some(target_id.to_string()),
                    display_name,
                )
            })
            .await;
        if let Err(e) = result {
            warn!("Could not restore owned variants for {}: {}", target_id, e);
        }
    }

    /// Drops every summary line this user filed, wherever it is.
    async fn scrub_reports_filed_by(&self, reporter_id: &str) {
        let docs = match self.moderation.scan_docs().await {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Could not scan moderation docs: {}", e);
                return;
            }
        };
        for doc in docs {
            if !doc.reports.iter().any(|r| r.reporter_id == reporter_id) {
                continue;
            }
            let target_id = doc.target_id.clone();
            let mut scrubbed = false;
            for _ in 0..MAX_WRITE_ATTEMPTS {
                let mut fresh = match self.moderation.get_doc(&target_id).await {
                    Ok(doc) => doc,
                    Err(StoreError::NotFound) => break,
                    Err(e) => {
                        warn!("Could not re-read reports on {}: {}", target_id, e);
                        break;
                    }
                };
                let read_version = fresh.version;
                fresh.reports.retain(|r| r.reporter_id != reporter_id);
                fresh.num_reports = fresh.reports.len() as u32;
                fresh.version += 1;
                match self.moderation.put_doc_versioned(&fresh, read_version).await {
                    Ok(()) => {
                        scrubbed = true;
                        break;
                    }
                    Err(StoreError::Conflict) => continue,
                    Err(e) => {
                        warn!("Could not scrub reports on {}: {}", target_id, e);
                        break;
                    }
                }
            }
            if !scrubbed {
                warn!(
                    "Reports filed by {} on {} were not scrubbed",
                    reporter_id, target_id
                );
            }
        }
    }

    /// Common caller/target validation for all three operations.
    async fn check_target(
        &self,
        caller: &Caller,
        target_id: &str,
    ) -> Result<IdentityUser, RpcError> {
        if !caller.moderator {
            return Err(RpcError::permission_denied("Moderator role required"));
        }
        if caller.user_id == target_id {
            return Err(RpcError::permission_denied(
                "Moderation cannot target the calling account",
            ));
        }
        let identity_user = self.identity.get_user(target_id).await.map_err(|e| match e {
            IdentityError::NotFound => RpcError::not_found("No such user"),
            other => RpcError::internal(&other.to_string()),
        })?;
        if identity_user.moderator {
            return Err(RpcError::permission_denied(
                "Cannot target another moderator; demote first",
            ));
        }
        Ok(identity_user)
    }
}
