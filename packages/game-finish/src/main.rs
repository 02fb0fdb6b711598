use lambda_runtime::{run, service_fn, Error};
use std::sync::Arc;
use tracing_subscriber;

mod processor;
use processor::GameFinishProcessor;
use shared::repositories::game_repository::DynamoDbGameRepository;
use shared::repositories::profile_repository::DynamoDbProfileRepository;
use shared::repositories::variant_repository::DynamoDbVariantRepository;
use shared::services::game_finish_service::GameFinishService;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = aws_config::load_from_env().await;
    let client = aws_sdk_dynamodb::Client::new(&config);

    let games = Arc::new(DynamoDbGameRepository::new(client.clone()));
    let profiles = Arc::new(DynamoDbProfileRepository::new(client.clone()));
    let variants = Arc::new(DynamoDbVariantRepository::new(client.clone()));
    let service = GameFinishService::new(games, profiles, variants);

    let processor = Arc::new(GameFinishProcessor::new(service));

    run(service_fn(
        move |event: lambda_runtime::LambdaEvent<aws_lambda_events::event::dynamodb::Event>| {
            let processor = processor.clone();
            async move { processor.process_event(event.payload).await }
        },
    ))
    .await
}
