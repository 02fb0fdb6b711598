use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game::PlayerColor;

/// How many finished games a profile remembers.
pub const LAST_GAMES_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameResult {
    Win,
    Draw,
    Loss,
}

impl GameResult {
    pub fn win_points(&self) -> f64 {
        match self {
            GameResult::Win => 1.0,
            GameResult::Draw => 0.5,
            GameResult::Loss => 0.0,
        }
    }
}

/// Summary of one finished game, newest-first inside `last_5_games`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: String,
    pub variant_id: String,
    pub variant_name: String,
    pub creation_time_ms: i64,
    pub side: PlayerColor,
    pub result: GameResult,
    pub opponent_id: Option<String>,
    pub opponent_name: String,
}

/// A user's profile document. `username` and the statistics subtree are
/// never client-writable; they change only through the finish and
/// moderation flows here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub about: String,
    pub profile_img: Option<String>,
    pub username: String,
    pub rename_allowed_at: DateTime<Utc>,
    pub num_games_played: u32,
    pub num_win_points: f64,
    pub last_5_games: Vec<GameSummary>,
    /// Deduplicated opponent ids derived from `last_5_games`. Exists so bulk
    /// scrub operations can find affected profiles without scanning.
    pub last_games_opponent_ids: Vec<String>,
    pub last_games_variant_ids: Vec<String>,
    pub banned: bool,
}

impl UserProfile {
    pub fn new(id: &str, username: &str, name: &str) -> Self {
        UserProfile {
            id: id.to_string(),
            name: name.to_string(),
            about: String::new(),
            profile_img: None,
            username: username.to_string(),
            rename_allowed_at: Utc::now(),
            num_games_played: 0,
            num_win_points: 0.0,
            last_5_games: Vec::new(),
            last_games_opponent_ids: Vec::new(),
            last_games_variant_ids: Vec::new(),
            banned: false,
        }
    }

    /// Folds one finished game into the profile: prepends the summary
    /// (evicting beyond capacity), bumps the counters and rebuilds the
    /// deduplicated id caches from the new list.
    pub fn record_finished_game(&mut self, summary: GameSummary) {
        self.num_games_played += 1;
        self.num_win_points += summary.result.win_points();
        self.last_5_games.insert(0, summary);
        self.last_5_games.truncate(LAST_GAMES_CAPACITY);
        self.rebuild_last_game_caches();
    }

    fn rebuild_last_game_caches(&mut self) {
        let mut opponents = Vec::new();
        let mut variants = Vec::new();
        for summary in &self.last_5_games {
            if let Some(opponent_id) = &summary.opponent_id {
                if !opponents.contains(opponent_id) {
                    opponents.push(opponent_id.clone());
                }
            }
            if !variants.contains(&summary.variant_id) {
                variants.push(summary.variant_id.clone());
            }
        }
        self.last_games_opponent_ids = opponents;
        self.last_games_variant_ids = variants;
    }
}

/// Per-user private cache of everything the user has upvoted or reported.
/// Mutated only by the aggregation handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivateCache {
    pub user_id: String,
    pub upvoted_variants: Vec<String>,
    pub reported_variants: Vec<String>,
    pub reported_users: Vec<String>,
}

impl PrivateCache {
    pub fn new(user_id: &str) -> Self {
        PrivateCache {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(game_id: &str, variant_id: &str, opponent: Option<&str>, result: GameResult) -> GameSummary {
        GameSummary {
            game_id: game_id.to_string(),
            variant_id: variant_id.to_string(),
            variant_name: "v".to_string(),
            creation_time_ms: 0,
            side: PlayerColor::White,
            result,
            opponent_id: opponent.map(str::to_string),
            opponent_name: "opp".to_string(),
        }
    }

    #[test]
    fn test_record_finished_game_counters() {
        let mut profile = UserProfile::new("u1", "alice", "Alice");
        profile.record_finished_game(summary("g1", "v1", Some("o1"), GameResult::Win));
        profile.record_finished_game(summary("g2", "v1", Some("o2"), GameResult::Draw));
        profile.record_finished_game(summary("g3", "v2", Some("o1"), GameResult::Loss));

        assert_eq!(profile.num_games_played, 3);
        assert_eq!(profile.num_win_points, 1.5);
        // Newest first.
        assert_eq!(profile.last_5_games[0].game_id, "g3");
        assert_eq!(profile.last_games_opponent_ids, vec!["o1", "o2"]);
        assert_eq!(profile.last_games_variant_ids, vec!["v2", "v1"]);
    }

    #[test]
    fn test_record_finished_game_evicts_beyond_capacity() {
        let mut profile = UserProfile::new("u1", "alice", "Alice");
        for i in 0..7 {
            profile.record_finished_game(summary(
                &format!("g{}", i),
                &format!("v{}", i),
                Some(&format!("o{}", i)),
                GameResult::Win,
            ));
        }

        assert_eq!(profile.last_5_games.len(), LAST_GAMES_CAPACITY);
        assert_eq!(profile.last_5_games[0].game_id, "g6");
        assert_eq!(profile.last_5_games[4].game_id, "g2");
        // Evicted games drop out of the caches too.
        assert!(!profile.last_games_opponent_ids.contains(&"o0".to_string()));
        assert_eq!(profile.num_games_played, 7);
    }

    #[test]
    fn test_caches_skip_deleted_opponents() {
        let mut profile = UserProfile::new("u1", "alice", "Alice");
        profile.record_finished_game(summary("g1", "v1", None, GameResult::Win));

        assert!(profile.last_games_opponent_ids.is_empty());
        assert_eq!(profile.last_games_variant_ids, vec!["v1"]);
    }
}
