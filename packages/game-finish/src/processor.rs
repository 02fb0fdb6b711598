use aws_lambda_events::event::dynamodb::Event;
use lambda_runtime::Error;
use serde_dynamo::aws_sdk_dynamodb_1::from_item;
use shared::models::game::GameOverMarker;
use shared::services::game_finish_service::GameFinishService;
use tracing::{debug, info, warn};

/// Routes game-over marker creations into the finish bookkeeping. Only
/// INSERT matters; the marker is created exactly when a game's winner has
/// been set, and redelivery is handled downstream by the finish flag.
pub struct GameFinishProcessor {
    service: GameFinishService,
}

impl GameFinishProcessor {
    pub fn new(service: GameFinishService) -> Self {
        Self { service }
    }

    pub async fn process_event(&self, event: Event) -> Result<(), Error> {
        debug!(
            "Game-finish processor received {} record(s)",
            event.records.len()
        );
        for record in event.records {
            match record.event_name.as_str() {
                "INSERT" => {
                    let marker: GameOverMarker = from_item(record.change.new_image.into())?;
                    info!("Game-over marker for game {}", marker.game_id);
                    self.service.on_game_over_marker(&marker.game_id).await?;
                }
                other => {
                    warn!("Unhandled event type: {}", other);
                }
            }
        }
        Ok(())
    }
}
