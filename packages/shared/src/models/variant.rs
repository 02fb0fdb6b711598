use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game::PlayerColor;

/// A user-authored game variant. `creator_id`/`creator_display_name` are a
/// denormalized mirror of the creator's profile; `popularity` is a
/// best-effort gauge, never a hard invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub name: String,
    pub description: String,
    pub creator_id: Option<String>,
    pub creator_display_name: String,
    /// Best-effort gauges; transient drift (even below zero) self-heals on
    /// the next write and is never treated as an invariant.
    pub num_upvotes: i64,
    pub popularity: i64,
    pub tags: Vec<String>,
    /// Opaque rule-engine state. Only the starting-side flag is ever decoded
    /// here.
    pub initial_state: String,
    pub creation_time: DateTime<Utc>,
}

impl Variant {
    pub fn new(
        creator_id: &str,
        creator_display_name: &str,
        name: &str,
        description: &str,
        tags: Vec<String>,
        initial_state: &str,
    ) -> Self {
        Variant {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            creator_id: Some(creator_id.to_string()),
            creator_display_name: creator_display_name.to_string(),
            num_upvotes: 0,
            popularity: 0,
            tags,
            initial_state: initial_state.to_string(),
            creation_time: Utc::now(),
        }
    }

    /// Decodes the starting-side flag from the initial state (0 = white,
    /// 1 = black). `None` when the state carries neither value.
    pub fn starting_side(&self) -> Option<PlayerColor> {
        let state: serde_json::Value = serde_json::from_str(&self.initial_state).ok()?;
        match state.get("playerToMove").and_then(|v| v.as_u64()) {
            Some(0) => Some(PlayerColor::White),
            Some(1) => Some(PlayerColor::Black),
            _ => None,
        }
    }
}

/// Ceiling on the serialized size of one index page. Held well under the
/// store's 400 KB item limit so the surrounding item never trips it.
pub const INDEX_PAGE_MAX_BYTES: usize = 256 * 1024;

/// One line of the searchable variant index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub variant_id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// One page of the variant index. Pages are numbered from 0; together they
/// form one logical index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPage {
    pub page: u32,
    pub entries: Vec<IndexEntry>,
    pub version: u64,
}

impl IndexPage {
    pub fn new(page: u32) -> Self {
        IndexPage {
            page,
            entries: Vec::new(),
            version: 0,
        }
    }

    pub fn encoded_len(&self) -> usize {
        self.entries.iter().map(IndexEntry::encoded_len).sum()
    }

    /// Whether `entry` still fits under the page ceiling.
    pub fn has_room_for(&self, entry: &IndexEntry) -> bool {
        self.encoded_len() + entry.encoded_len() <= INDEX_PAGE_MAX_BYTES
    }
}

impl IndexEntry {
    pub fn encoded_len(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }

    pub fn for_variant(variant: &Variant) -> Self {
        IndexEntry {
            variant_id: variant.id.clone(),
            name: variant.name.clone(),
            description: variant.description.clone(),
            tags: variant.tags.clone(),
        }
    }
}
