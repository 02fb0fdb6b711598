use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game::RequestedColor;

/// One matchmaking slot, keyed by (variant_id, creator_id). The challenger
/// pair is set or cleared together, never individually; `game_doc_id` is set
/// at most once and is then immutable. A slot with a challenger but no
/// `game_doc_id` is a normal transient state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySlot {
    pub variant_id: String,
    pub creator_id: String,
    pub requested_color: RequestedColor,
    pub creator_display_name: String,
    pub time_created: DateTime<Utc>,
    pub game_doc_id: Option<String>,
    pub challenger_id: Option<String>,
    pub challenger_display_name: Option<String>,
}

impl LobbySlot {
    pub fn new(
        variant_id: &str,
        creator_id: &str,
        creator_display_name: &str,
        requested_color: RequestedColor,
    ) -> Self {
        LobbySlot {
            variant_id: variant_id.to_string(),
            creator_id: creator_id.to_string(),
            requested_color,
            creator_display_name: creator_display_name.to_string(),
            time_created: Utc::now(),
            game_doc_id: None,
            challenger_id: None,
            challenger_display_name: None,
        }
    }

    pub fn has_challenger(&self) -> bool {
        self.challenger_id.is_some()
    }
}
