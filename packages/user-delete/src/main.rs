use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber;

use shared::repositories::bulk_writer::{BulkWriter, DynamoDbBulkSink};
use shared::repositories::game_repository::DynamoDbGameRepository;
use shared::repositories::lobby_repository::DynamoDbLobbyRepository;
use shared::repositories::moderation_repository::DynamoDbModerationRepository;
use shared::repositories::profile_repository::DynamoDbProfileRepository;
use shared::repositories::variant_repository::DynamoDbVariantRepository;
use shared::services::propagation_service::PropagationService;
use shared::services::user_cleanup_service::UserCleanupService;

#[derive(Deserialize)]
struct EventBridgeEvent {
    detail: Detail,
}

#[derive(Deserialize)]
struct Detail {
    #[serde(rename = "userName")]
    user_name: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();
    run(service_fn(user_delete_handler)).await
}

async fn user_delete_handler(event: LambdaEvent<EventBridgeEvent>) -> Result<(), Error> {
    let user_id = event.payload.detail.user_name.clone();

    info!("Account deleted at the identity provider: {}", user_id);

    let config = aws_config::load_from_env().await;
    let client = aws_sdk_dynamodb::Client::new(&config);
    let profiles = Arc::new(DynamoDbProfileRepository::new(client.clone()));
    let variants = Arc::new(DynamoDbVariantRepository::new(client.clone()));
    let games = Arc::new(DynamoDbGameRepository::new(client.clone()));
    let lobby = Arc::new(DynamoDbLobbyRepository::new(client.clone()));
    let moderation = Arc::new(DynamoDbModerationRepository::new(client.clone()));
    let bulk = Arc::new(BulkWriter::new(Arc::new(DynamoDbBulkSink::new(client.clone()))));

    let propagation = Arc::new(PropagationService::new(variants, games, bulk));
    let cleanup = UserCleanupService::new(profiles, lobby, moderation, propagation);

    cleanup.on_account_deleted(&user_id).await;

    info!("Deletion cleanup finished for {}", user_id);
    Ok(())
}
