//! Stateful in-memory fakes for service tests. One store implements every
//! repository trait plus the bulk sink and the external collaborators, so a
//! test can wire a whole service graph against a single source of truth.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::blobs::{BlobError, BlobStore};
use crate::identity::{IdentityError, IdentityProvider, IdentityUser};
use crate::models::game::{Game, PlayerColor, PlayerToMove, RequestedColor, Winner};
use crate::models::lobby::LobbySlot;
use crate::models::moderation::{BanBackup, ModerationDoc, ReportEntry};
use crate::models::user::{PrivateCache, UserProfile};
use crate::models::variant::{IndexPage, Variant};
use crate::repositories::bulk_writer::{BulkSink, DocumentEdit};
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::index_repository::IndexRepository;
use crate::repositories::lobby_repository::LobbyRepository;
use crate::repositories::moderation_repository::ModerationRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::variant_repository::VariantRepository;

#[derive(Default)]
pub struct InMemoryStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    caches: Mutex<HashMap<String, PrivateCache>>,
    variants: Mutex<HashMap<String, Variant>>,
    games: Mutex<HashMap<String, Game>>,
    slots: Mutex<HashMap<(String, String), LobbySlot>>,
    moderation_docs: Mutex<HashMap<String, ModerationDoc>>,
    backups: Mutex<HashMap<String, BanBackup>>,
    index_pages: Mutex<HashMap<u32, IndexPage>>,
    identities: Mutex<HashMap<String, IdentityUser>>,
    deleted_blobs: Mutex<Vec<String>>,
    failing_tables: Mutex<HashSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation against the named logical table fail.
    pub fn fail_table(&self, table: &str) {
        self.failing_tables.lock().unwrap().insert(table.to_string());
    }

    fn check(&self, table: &str) -> Result<(), StoreError> {
        if self.failing_tables.lock().unwrap().contains(table) {
            Err(StoreError::DynamoDb(format!("{} is failing", table)))
        } else {
            Ok(())
        }
    }

    // ---- seeds and accessors -------------------------------------------

    pub fn seed_profile(&self, id: &str, username: &str, name: &str) -> UserProfile {
        let profile = UserProfile::new(id, username, name);
        self.profiles
            .lock()
            .unwrap()
            .insert(id.to_string(), profile.clone());
        profile
    }

    pub fn replace_profile(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub fn profile(&self, id: &str) -> UserProfile {
        self.try_profile(id).expect("profile should exist")
    }

    pub fn try_profile(&self, id: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(id).cloned()
    }

    pub fn cache(&self, user_id: &str) -> PrivateCache {
        self.caches
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| PrivateCache::new(user_id))
    }

    pub fn replace_cache(&self, cache: PrivateCache) {
        self.caches
            .lock()
            .unwrap()
            .insert(cache.user_id.clone(), cache);
    }

    pub fn seed_variant(&self, creator_id: &str, creator_name: &str, name: &str) -> String {
        self.seed_variant_with_state(creator_id, creator_name, name, "{\"playerToMove\":0}")
    }

    pub fn seed_variant_with_state(
        &self,
        creator_id: &str,
        creator_name: &str,
        name: &str,
        initial_state: &str,
    ) -> String {
        let variant = Variant::new(creator_id, creator_name, name, "", vec![], initial_state);
        let id = variant.id.clone();
        self.variants.lock().unwrap().insert(id.clone(), variant);
        id
    }

    pub fn variant(&self, id: &str) -> Variant {
        self.try_variant(id).expect("variant should exist")
    }

    pub fn try_variant(&self, id: &str) -> Option<Variant> {
        self.variants.lock().unwrap().get(id).cloned()
    }

    pub fn bump_popularity(&self, id: &str, delta: i64) {
        if let Some(variant) = self.variants.lock().unwrap().get_mut(id) {
            variant.popularity += delta;
        }
    }

    pub fn seed_game(
        &self,
        variant_id: &str,
        white: (&str, &str),
        black: (&str, &str),
        finished: bool,
    ) -> String {
        let variant = self
            .try_variant(variant_id)
            .unwrap_or_else(|| Variant::new("x", "X", "ghost", "", vec![], "{\"playerToMove\":0}"));
        let mut game = Game::new(
            variant,
            PlayerColor::White,
            RequestedColor::White,
            white.0,
            white.1,
            black.0,
            black.1,
        );
        game.variant_id = variant_id.to_string();
        if finished {
            game.player_to_move = PlayerToMove::GameOver;
            game.winner = Some(Winner::Draw);
            game.called_finish_game = true;
        }
        let id = game.id.clone();
        self.games.lock().unwrap().insert(id.clone(), game);
        id
    }

    pub fn game(&self, id: &str) -> Game {
        self.try_game(id).expect("game should exist")
    }

    pub fn try_game(&self, id: &str) -> Option<Game> {
        self.games.lock().unwrap().get(id).cloned()
    }

    pub fn replace_game(&self, game: Game) {
        self.games.lock().unwrap().insert(game.id.clone(), game);
    }

    pub fn seed_slot(
        &self,
        variant_id: &str,
        creator_id: &str,
        creator_name: &str,
        color: RequestedColor,
    ) {
        let slot = LobbySlot::new(variant_id, creator_id, creator_name, color);
        self.slots
            .lock()
            .unwrap()
            .insert((variant_id.to_string(), creator_id.to_string()), slot);
    }

    pub fn slot(&self, variant_id: &str, creator_id: &str) -> LobbySlot {
        self.try_slot(variant_id, creator_id).expect("slot should exist")
    }

    pub fn try_slot(&self, variant_id: &str, creator_id: &str) -> Option<LobbySlot> {
        self.slots
            .lock()
            .unwrap()
            .get(&(variant_id.to_string(), creator_id.to_string()))
            .cloned()
    }

    pub fn replace_slot(&self, slot: LobbySlot) {
        self.slots
            .lock()
            .unwrap()
            .insert((slot.variant_id.clone(), slot.creator_id.clone()), slot);
    }

    pub fn seed_moderation_doc(&self, target_id: &str, entries: &[(&str, &str, &str)]) {
        let mut doc = ModerationDoc::new(target_id);
        for (reporter_id, reporter_username, reason) in entries {
            doc.reports.push(ReportEntry {
                reporter_id: reporter_id.to_string(),
                reporter_username: reporter_username.to_string(),
                reason: reason.to_string(),
                time_ms: 0,
            });
        }
        doc.num_reports = doc.reports.len() as u32;
        doc.version = 1;
        self.moderation_docs
            .lock()
            .unwrap()
            .insert(target_id.to_string(), doc);
    }

    pub fn moderation_doc(&self, target_id: &str) -> ModerationDoc {
        self.try_moderation_doc(target_id)
            .expect("moderation doc should exist")
    }

    pub fn try_moderation_doc(&self, target_id: &str) -> Option<ModerationDoc> {
        self.moderation_docs.lock().unwrap().get(target_id).cloned()
    }

    pub fn backup(&self, user_id: &str) -> BanBackup {
        self.try_backup(user_id).expect("backup should exist")
    }

    pub fn try_backup(&self, user_id: &str) -> Option<BanBackup> {
        self.backups.lock().unwrap().get(user_id).cloned()
    }

    pub fn index_pages(&self) -> Vec<IndexPage> {
        let mut pages: Vec<IndexPage> = self.index_pages.lock().unwrap().values().cloned().collect();
        pages.sort_by_key(|p| p.page);
        pages
    }

    pub fn seed_identity(&self, id: &str, name: Option<&str>, enabled: bool, moderator: bool) {
        self.identities.lock().unwrap().insert(
            id.to_string(),
            IdentityUser {
                user_id: id.to_string(),
                display_name: name.map(str::to_string),
                photo_url: None,
                enabled,
                moderator,
            },
        );
    }

    pub fn identity_user(&self, id: &str) -> IdentityUser {
        self.identities
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .expect("identity should exist")
    }

    pub fn set_identity_enabled(&self, id: &str, enabled: bool) {
        if let Some(user) = self.identities.lock().unwrap().get_mut(id) {
            user.enabled = enabled;
        }
    }

    pub fn deleted_blobs(&self) -> Vec<String> {
        self.deleted_blobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        self.check("profiles")?;
        self.try_profile(user_id).ok_or(StoreError::NotFound)
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.check("profiles")?;
        self.replace_profile(profile.clone());
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), StoreError> {
        self.check("profiles")?;
        self.profiles.lock().unwrap().remove(user_id);
        Ok(())
    }

    async fn get_cache(&self, user_id: &str) -> Result<PrivateCache, StoreError> {
        self.check("caches")?;
        self.caches
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn put_cache(&self, cache: &PrivateCache) -> Result<(), StoreError> {
        self.check("caches")?;
        self.replace_cache(cache.clone());
        Ok(())
    }

    async fn delete_cache(&self, user_id: &str) -> Result<(), StoreError> {
        self.check("caches")?;
        self.caches.lock().unwrap().remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl VariantRepository for InMemoryStore {
    async fn get_variant(&self, variant_id: &str) -> Result<Variant, StoreError> {
        self.check("variants")?;
        self.try_variant(variant_id).ok_or(StoreError::NotFound)
    }

    async fn put_variant(&self, variant: &Variant) -> Result<(), StoreError> {
        self.check("variants")?;
        self.variants
            .lock()
            .unwrap()
            .insert(variant.id.clone(), variant.clone());
        Ok(())
    }

    async fn delete_variant(&self, variant_id: &str) -> Result<(), StoreError> {
        self.check("variants")?;
        self.variants.lock().unwrap().remove(variant_id);
        Ok(())
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<Variant>, StoreError> {
        self.check("variants")?;
        Ok(self
            .variants
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.creator_id.as_deref() == Some(creator_id))
            .cloned()
            .collect())
    }

    async fn add_popularity(&self, variant_id: &str, delta: i64) -> Result<(), StoreError> {
        self.check("variants")?;
        let mut variants = self.variants.lock().unwrap();
        let variant = variants.get_mut(variant_id).ok_or(StoreError::NotFound)?;
        variant.popularity += delta;
        Ok(())
    }

    async fn add_upvotes(&self, variant_id: &str, delta: i64) -> Result<(), StoreError> {
        self.check("variants")?;
        let mut variants = self.variants.lock().unwrap();
        let variant = variants.get_mut(variant_id).ok_or(StoreError::NotFound)?;
        variant.num_upvotes += delta;
        Ok(())
    }

    fn creator_identity_edit(
        &self,
        variant_id: &str,
        creator_id: Option<String>,
        display_name: &str,
    ) -> DocumentEdit {
        DocumentEdit {
            table: "variants".to_string(),
            key: vec![("id".to_string(), variant_id.to_string())],
            sets: vec![
                ("creator_id".to_string(), creator_id),
                (
                    "creator_display_name".to_string(),
                    Some(display_name.to_string()),
                ),
            ],
        }
    }
}

#[async_trait]
impl GameRepository for InMemoryStore {
    async fn get_game(&self, game_id: &str) -> Result<Game, StoreError> {
        self.check("games")?;
        self.try_game(game_id).ok_or(StoreError::NotFound)
    }

    async fn put_game(&self, game: &Game) -> Result<(), StoreError> {
        self.check("games")?;
        self.replace_game(game.clone());
        Ok(())
    }

    async fn delete_game(&self, game_id: &str) -> Result<(), StoreError> {
        self.check("games")?;
        self.games.lock().unwrap().remove(game_id);
        Ok(())
    }

    async fn list_by_side(
        &self,
        user_id: &str,
        side: PlayerColor,
        ongoing_only: bool,
    ) -> Result<Vec<Game>, StoreError> {
        self.check("games")?;
        Ok(self
            .games
            .lock()
            .unwrap()
            .values()
            .filter(|g| {
                let id = match side {
                    PlayerColor::White => &g.white_id,
                    PlayerColor::Black => &g.black_id,
                };
                id.as_deref() == Some(user_id) && (!ongoing_only || !g.is_finished())
            })
            .cloned()
            .collect())
    }

    async fn list_ids_by_variant(&self, variant_id: &str) -> Result<Vec<String>, StoreError> {
        self.check("games")?;
        Ok(self
            .games
            .lock()
            .unwrap()
            .values()
            .filter(|g| g.variant_id == variant_id)
            .map(|g| g.id.clone())
            .collect())
    }

    async fn set_called_finish_game(&self, game_id: &str) -> Result<(), StoreError> {
        self.check("games")?;
        let mut games = self.games.lock().unwrap();
        let game = games.get_mut(game_id).ok_or(StoreError::NotFound)?;
        game.called_finish_game = true;
        Ok(())
    }

    async fn terminate(&self, game_id: &str, winner: Winner) -> Result<(), StoreError> {
        self.check("games")?;
        let mut games = self.games.lock().unwrap();
        let game = games.get_mut(game_id).ok_or(StoreError::NotFound)?;
        game.winner = Some(winner);
        game.player_to_move = PlayerToMove::GameOver;
        game.called_finish_game = true;
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
            table: "games".to_string(),
            key: vec![("id".to_string(), game_id.to_string())],
            sets: vec![
                (id_attr.to_string(), user_id),
                (name_attr.to_string(), Some(display_name.to_string())),
            ],
        }
    }
}

#[async_trait]
impl LobbyRepository for InMemoryStore {
    async fn get_slot(&self, variant_id: &str, creator_id: &str) -> Result<LobbySlot, StoreError> {
        self.check("lobby")?;
        self.try_slot(variant_id, creator_id).ok_or(StoreError::NotFound)
    }

    async fn create_slot(&self, slot: &LobbySlot) -> Result<(), StoreError> {
        self.check("lobby")?;
        let key = (slot.variant_id.clone(), slot.creator_id.clone());
        let mut slots = self.slots.lock().unwrap();
        if slots.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        slots.insert(key, slot.clone());
        Ok(())
    }

    async fn delete_slot(&self, variant_id: &str, creator_id: &str) -> Result<(), StoreError> {
        self.check("lobby")?;
        self.slots
            .lock()
            .unwrap()
            .remove(&(variant_id.to_string(), creator_id.to_string()));
        Ok(())
    }

    async fn set_challenger(
        &self,
        variant_id: &str,
        creator_id: &str,
        challenger: Option<(String, String)>,
    ) -> Result<(), StoreError> {
        self.check("lobby")?;
        let mut slots = self.slots.lock().unwrap();
        let slot = slots
            .get_mut(&(variant_id.to_string(), creator_id.to_string()))
            .ok_or(StoreError::NotFound)?;
        match challenger {
            Some((id, name)) => {
                if slot.challenger_id.is_some() {
                    return Err(StoreError::Conflict);
                }
                slot.challenger_id = Some(id);
                slot.challenger_display_name = Some(name);
            }
            None => {
                slot.challenger_id = None;
                slot.challenger_display_name = None;
            }
        }
        Ok(())
    }

    async fn set_game_doc_id(
        &self,
        variant_id: &str,
        creator_id: &str,
        game_id: &str,
    ) -> Result<(), StoreError> {
        self.check("lobby")?;
        let mut slots = self.slots.lock().unwrap();
        let slot = slots
            .get_mut(&(variant_id.to_string(), creator_id.to_string()))
            .ok_or(StoreError::NotFound)?;
        if slot.game_doc_id.is_some() {
            return Err(StoreError::Conflict);
        }
        slot.game_doc_id = Some(game_id.to_string());
        Ok(())
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<LobbySlot>, StoreError> {
        self.check("lobby")?;
        Ok(self
            .slots
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn list_by_variant(&self, variant_id: &str) -> Result<Vec<LobbySlot>, StoreError> {
        self.check("lobby")?;
        Ok(self
            .slots
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.variant_id == variant_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ModerationRepository for InMemoryStore {
    async fn get_doc(&self, target_id: &str) -> Result<ModerationDoc, StoreError> {
        self.check("moderation")?;
        self.try_moderation_doc(target_id).ok_or(StoreError::NotFound)
    }

    async fn put_doc_versioned(
        &self,
        doc: &ModerationDoc,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        self.check("moderation")?;
        let mut docs = self.moderation_docs.lock().unwrap();
        let current = docs.get(&doc.target_id).map(|d| d.version).unwrap_or(0);
        if current != expected_version {
            return Err(StoreError::Conflict);
        }
        docs.insert(doc.target_id.clone(), doc.clone());
        Ok(())
    }

    async fn delete_doc(&self, target_id: &str) -> Result<(), StoreError> {
        self.check("moderation")?;
        self.moderation_docs.lock().unwrap().remove(target_id);
        Ok(())
    }

    async fn scan_docs(&self) -> Result<Vec<ModerationDoc>, StoreError> {
        self.check("moderation")?;
        Ok(self.moderation_docs.lock().unwrap().values().cloned().collect())
    }

    async fn get_backup(&self, user_id: &str) -> Result<BanBackup, StoreError> {
        self.check("backups")?;
        self.try_backup(user_id).ok_or(StoreError::NotFound)
    }

    async fn put_backup(&self, backup: &BanBackup) -> Result<(), StoreError> {
        self.check("backups")?;
        self.backups
            .lock()
            .unwrap()
            .insert(backup.user_id.clone(), backup.clone());
        Ok(())
    }

    async fn delete_backup(&self, user_id: &str) -> Result<(), StoreError> {
        self.check("backups")?;
        self.backups.lock().unwrap().remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl IndexRepository for InMemoryStore {
    async fn list_pages(&self) -> Result<Vec<IndexPage>, StoreError> {
        self.check("index")?;
        Ok(self.index_pages())
    }

    async fn put_page_versioned(
        &self,
        page: &IndexPage,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        self.check("index")?;
        let mut pages = self.index_pages.lock().unwrap();
        let current = pages.get(&page.page).map(|p| p.version).unwrap_or(0);
        if current != expected_version {
            return Err(StoreError::Conflict);
        }
        pages.insert(page.page, page.clone());
        Ok(())
    }
}

#[async_trait]
impl BulkSink for InMemoryStore {
    async fn commit(&self, edits: Vec<DocumentEdit>) -> Result<(), StoreError> {
        for edit in edits {
            self.check(&edit.table)?;
            let id = edit.key[0].1.clone();
            match edit.table.as_str() {
                "variants" => {
                    let mut variants = self.variants.lock().unwrap();
                    if let Some(variant) = variants.get_mut(&id) {
                        for (attr, value) in &edit.sets {
                            match attr.as_str() {
                                "creator_id" => variant.creator_id = value.clone(),
                                "creator_display_name" => {
                                    variant.creator_display_name =
                                        value.clone().unwrap_or_default()
                                }
                                _ => {}
                            }
                        }
                    }
                }
                "games" => {
                    let mut games = self.games.lock().unwrap();
                    if let Some(game) = games.get_mut(&id) {
                        for (attr, value) in &edit.sets {
                            match attr.as_str() {
                                "white_id" => game.white_id = value.clone(),
                                "white_display_name" => {
                                    game.white_display_name = value.clone().unwrap_or_default()
                                }
                                "black_id" => game.black_id = value.clone(),
                                "black_display_name" => {
                                    game.black_display_name = value.clone().unwrap_or_default()
                                }
                                _ => {}
                            }
                        }
                    }
                }
                other => {
                    return Err(StoreError::DynamoDb(format!(
                        "no such table in fake store: {}",
                        other
                    )))
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, IdentityError> {
        self.identities
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or(IdentityError::NotFound)
    }

    async fn disable_and_strip(&self, user_id: &str) -> Result<(), IdentityError> {
        let mut identities = self.identities.lock().unwrap();
        let user = identities.get_mut(user_id).ok_or(IdentityError::NotFound)?;
        user.display_name = None;
        user.photo_url = None;
        user.enabled = false;
        Ok(())
    }

    async fn restore_and_enable(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        let mut identities = self.identities.lock().unwrap();
        let user = identities.get_mut(user_id).ok_or(IdentityError::NotFound)?;
        user.display_name = Some(display_name.to_string());
        user.enabled = true;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryStore {
    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        self.deleted_blobs.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
