use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::variant::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn opposite(&self) -> PlayerColor {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }
}

/// Color a lobby creator asks for when opening a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestedColor {
    White,
    Black,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerToMove {
    White,
    Black,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn from_color(color: PlayerColor) -> Winner {
        match color {
            PlayerColor::White => Winner::White,
            PlayerColor::Black => Winner::Black,
        }
    }
}

/// A match between two players. Everything except `move_history`,
/// `player_to_move`, `winner` and `called_finish_game` is immutable after
/// creation; the variant is snapshotted so later variant edits or deletions
/// never change a game already underway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub move_history: String,
    pub player_to_move: PlayerToMove,
    pub winner: Option<Winner>,
    /// Both player ids, white first. Kept for reverse lookup of a user's
    /// games regardless of side.
    pub players: Vec<String>,
    pub time_created: DateTime<Utc>,
    pub variant_id: String,
    pub variant: Variant,
    pub white_id: Option<String>,
    pub white_display_name: String,
    pub black_id: Option<String>,
    pub black_display_name: String,
    pub requested_color: RequestedColor,
    /// Transitions false -> true exactly once, when post-game bookkeeping
    /// has run (or been deliberately skipped).
    pub called_finish_game: bool,
}

impl Game {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        variant: Variant,
        starting_side: PlayerColor,
        requested_color: RequestedColor,
        white_id: &str,
        white_display_name: &str,
        black_id: &str,
        black_display_name: &str,
    ) -> Self {
        Game {
            id: Uuid::new_v4().to_string(),
            move_history: String::new(),
            player_to_move: match starting_side {
                PlayerColor::White => PlayerToMove::White,
                PlayerColor::Black => PlayerToMove::Black,
            },
            winner: None,
            players: vec![white_id.to_string(), black_id.to_string()],
            time_created: Utc::now(),
            variant_id: variant.id.clone(),
            variant,
            white_id: Some(white_id.to_string()),
            white_display_name: white_display_name.to_string(),
            black_id: Some(black_id.to_string()),
            black_display_name: black_display_name.to_string(),
            requested_color,
            called_finish_game: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.player_to_move == PlayerToMove::GameOver
    }

    /// Side the given user plays in this game, if any.
    pub fn side_of(&self, user_id: &str) -> Option<PlayerColor> {
        if self.white_id.as_deref() == Some(user_id) {
            Some(PlayerColor::White)
        } else if self.black_id.as_deref() == Some(user_id) {
            Some(PlayerColor::Black)
        } else {
            None
        }
    }
}

/// Subdocument created once a game's winner has been set. Its creation is
/// the trigger for post-game bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOverMarker {
    pub game_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::variant::Variant;

    fn variant() -> Variant {
        Variant::new("creator", "Creator", "Kingless", "no kings", vec![], "{\"playerToMove\":0}")
    }

    #[test]
    fn test_new_game_fields() {
        let game = Game::new(
            variant(),
            PlayerColor::Black,
            RequestedColor::White,
            "w1",
            "White Player",
            "b1",
            "Black Player",
        );

        assert_eq!(game.player_to_move, PlayerToMove::Black);
        assert_eq!(game.players, vec!["w1".to_string(), "b1".to_string()]);
        assert_eq!(game.white_id.as_deref(), Some("w1"));
        assert_eq!(game.black_id.as_deref(), Some("b1"));
        assert!(game.winner.is_none());
        assert!(!game.called_finish_game);
        assert!(game.move_history.is_empty());
        assert!(!game.is_finished());
    }

    #[test]
    fn test_side_of() {
        let game = Game::new(
            variant(),
            PlayerColor::White,
            RequestedColor::Random,
            "w1",
            "White Player",
            "b1",
            "Black Player",
        );

        assert_eq!(game.side_of("w1"), Some(PlayerColor::White));
        assert_eq!(game.side_of("b1"), Some(PlayerColor::Black));
        assert_eq!(game.side_of("someone-else"), None);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&PlayerToMove::GameOver).unwrap(),
            "\"game-over\""
        );
        assert_eq!(
            serde_json::to_string(&RequestedColor::Random).unwrap(),
            "\"random\""
        );
        assert_eq!(serde_json::to_string(&Winner::Draw).unwrap(), "\"draw\"");
    }
}
