use std::sync::Arc;

use shared::auth::TokenVerifier;
use shared::services::game_service::GameService;
use shared::services::lobby_service::LobbyService;
use shared::services::moderation_service::ModerationService;
use shared::services::report_service::ReportService;
use shared::services::variant_service::VariantService;

#[derive(Clone)]
pub struct AppState {
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub lobby_service: Arc<LobbyService>,
    pub game_service: Arc<GameService>,
    pub moderation_service: Arc<ModerationService>,
    pub variant_service: Arc<VariantService>,
    pub report_service: Arc<ReportService>,
}
