use axum::{routing::get, Router};
use lambda_http::{run, tracing, Error};
use std::env::set_var;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use shared::auth::JwtTokenVerifier;
use shared::blobs::S3BlobStore;
use shared::identity::CognitoIdentityProvider;
use shared::repositories::bulk_writer::{BulkWriter, DynamoDbBulkSink};
use shared::repositories::game_repository::DynamoDbGameRepository;
use shared::repositories::index_repository::DynamoDbIndexRepository;
use shared::repositories::lobby_repository::DynamoDbLobbyRepository;
use shared::repositories::moderation_repository::DynamoDbModerationRepository;
use shared::repositories::profile_repository::DynamoDbProfileRepository;
use shared::repositories::variant_repository::DynamoDbVariantRepository;
use shared::services::game_service::GameService;
use shared::services::lobby_service::LobbyService;
use shared::services::moderation_service::ModerationService;
use shared::services::propagation_service::PropagationService;
use shared::services::report_service::ReportService;
use shared::services::variant_index_service::VariantIndexService;
use shared::services::variant_service::VariantService;

#[tokio::main]
async fn main() -> Result<(), Error> {
    set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");

    // required to enable CloudWatch error logging by the runtime
    tracing::init_default_subscriber();

    let config = aws_config::load_from_env().await;
    let db = aws_sdk_dynamodb::Client::new(&config);

    let profiles = Arc::new(DynamoDbProfileRepository::new(db.clone()));
    let variants = Arc::new(DynamoDbVariantRepository::new(db.clone()));
    let games = Arc::new(DynamoDbGameRepository::new(db.clone()));
    let lobby = Arc::new(DynamoDbLobbyRepository::new(db.clone()));
    let moderation = Arc::new(DynamoDbModerationRepository::new(db.clone()));
    let index = Arc::new(DynamoDbIndexRepository::new(db.clone()));
    let bulk = Arc::new(BulkWriter::new(Arc::new(DynamoDbBulkSink::new(db.clone()))));

    let identity = Arc::new(CognitoIdentityProvider::new(
        aws_sdk_cognitoidentityprovider::Client::new(&config),
    ));
    let blobs = Arc::new(S3BlobStore::new(aws_sdk_s3::Client::new(&config)));

    let propagation = Arc::new(PropagationService::new(
        variants.clone(),
        games.clone(),
        bulk.clone(),
    ));
    let index_service = Arc::new(VariantIndexService::new(index));
    let variant_service = Arc::new(VariantService::new(
        variants.clone(),
        games.clone(),
        lobby.clone(),
        moderation.clone(),
        index_service,
    ));
    let lobby_service = Arc::new(LobbyService::new(
        lobby.clone(),
        variants.clone(),
        games.clone(),
    ));
    let game_service = Arc::new(GameService::new(games.clone(), variants.clone()));
    let report_service = Arc::new(ReportService::new(moderation.clone(), profiles.clone()));
    let moderation_service = Arc::new(ModerationService::new(
        profiles,
        games,
        variants,
        moderation,
        identity,
        blobs,
        propagation,
        variant_service.clone(),
        bulk,
    ));

    let app_state = state::AppState {
        token_verifier: Arc::new(JwtTokenVerifier::new()),
        lobby_service,
        game_service,
        moderation_service,
        variant_service,
        report_service,
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::games::routes())
        .merge(routes::moderation::routes())
        .merge(routes::variants::routes())
        .layer(cors)
        .with_state(app_state);

    run(app).await
}
