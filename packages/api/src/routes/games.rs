use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, middleware::auth::AuthenticatedCaller, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games/create", post(create_game))
        .route("/games/cancel", post(cancel_game))
}

#[derive(Deserialize)]
pub struct CreateGameRequest {
    pub variant_id: String,
    pub lobby_creator_id: String,
}

#[derive(Serialize)]
pub struct CreateGameResponse {
    pub game_id: String,
}

async fn create_game(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, ApiError> {
    let game_id = state
        .lobby_service
        .create_game(&caller, &payload.variant_id, &payload.lobby_creator_id)
        .await?;
    Ok(Json(CreateGameResponse { game_id }))
}

#[derive(Deserialize)]
pub struct CancelGameRequest {
    pub game_id: String,
    pub reason: String,
}

async fn cancel_game(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(payload): Json<CancelGameRequest>,
) -> Result<(), ApiError> {
    state
        .game_service
        .cancel_game(&caller, &payload.game_id, &payload.reason)
        .await?;
    Ok(())
}
