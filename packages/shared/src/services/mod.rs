pub mod errors;
pub mod game_finish_service;
pub mod game_service;
pub mod lobby_service;
pub mod moderation_service;
pub mod propagation_service;
pub mod report_service;
pub mod upvote_service;
pub mod user_cleanup_service;
pub mod variant_index_service;
pub mod variant_service;

/// Authenticated caller of an RPC, as established by the api layer's token
/// checks. Services re-validate everything that matters against it.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub moderator: bool,
}

impl Caller {
    pub fn new(user_id: &str, moderator: bool) -> Self {
        Caller {
            user_id: user_id.to_string(),
            moderator,
        }
    }
}
