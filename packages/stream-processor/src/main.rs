use lambda_runtime::{run, service_fn, Error};
use std::sync::Arc;
use tracing_subscriber;

mod models;
mod processor;

use processor::StreamProcessor;
use shared::repositories::bulk_writer::{BulkWriter, DynamoDbBulkSink};
use shared::repositories::game_repository::DynamoDbGameRepository;
use shared::repositories::index_repository::DynamoDbIndexRepository;
use shared::repositories::moderation_repository::DynamoDbModerationRepository;
use shared::repositories::profile_repository::DynamoDbProfileRepository;
use shared::repositories::variant_repository::DynamoDbVariantRepository;
use shared::services::propagation_service::PropagationService;
use shared::services::report_service::ReportService;
use shared::services::upvote_service::UpvoteService;
use shared::services::variant_index_service::VariantIndexService;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = aws_config::load_from_env().await;
    let client = aws_sdk_dynamodb::Client::new(&config);

    let profiles = Arc::new(DynamoDbProfileRepository::new(client.clone()));
    let variants = Arc::new(DynamoDbVariantRepository::new(client.clone()));
    let games = Arc::new(DynamoDbGameRepository::new(client.clone()));
    let moderation = Arc::new(DynamoDbModerationRepository::new(client.clone()));
    let index = Arc::new(DynamoDbIndexRepository::new(client.clone()));
    let bulk = Arc::new(BulkWriter::new(Arc::new(DynamoDbBulkSink::new(client.clone()))));

    let propagation = Arc::new(PropagationService::new(
        variants.clone(),
        games.clone(),
        bulk,
    ));
    let index_service = Arc::new(VariantIndexService::new(index));
    let reports = Arc::new(ReportService::new(moderation, profiles.clone()));
    let upvotes = Arc::new(UpvoteService::new(variants.clone(), profiles));

    let processor = Arc::new(StreamProcessor::new(
        propagation,
        index_service,
        variants,
        reports,
        upvotes,
    ));

    run(service_fn(
        move |event: lambda_runtime::LambdaEvent<aws_lambda_events::event::dynamodb::Event>| {
            let processor = processor.clone();
            async move { processor.process_event(event.payload).await }
        },
    ))
    .await
}
