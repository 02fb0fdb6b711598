use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::{error::ApiError, middleware::auth::AuthenticatedCaller, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/moderation/ban", post(ban_user))
        .route("/moderation/unban", post(unban_user))
        .route("/moderation/wipe", post(wipe_user))
        .route(
            "/moderation/discard-user-reports",
            post(discard_user_reports),
        )
        .route(
            "/moderation/discard-variant-reports",
            post(discard_variant_reports),
        )
}

#[derive(Deserialize)]
pub struct ModerateUserRequest {
    pub user_id: String,
}

async fn ban_user(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Json(payload): Json<ModerateUserRequest>,
) -> Result<(), ApiError> {
    caller.require_moderator()?;
    state
        .moderation_service
        .ban_user(&caller.0, &payload.user_id)
        .await?;
    Ok(())
}

async fn unban_user(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Json(payload): Json<ModerateUserRequest>,
) -> Result<(), ApiError> {
    caller.require_moderator()?;
    state
        .moderation_service
        .unban_user(&caller.0, &payload.user_id)
        .await?;
    Ok(())
}

async fn wipe_user(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Json(payload): Json<ModerateUserRequest>,
) -> Result<(), ApiError> {
    caller.require_moderator()?;
    state
        .moderation_service
        .wipe_user(&caller.0, &payload.user_id)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct DiscardUserReportsRequest {
    pub user_id: String,
    pub indexes: Vec<i64>,
}

async fn discard_user_reports(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Json(payload): Json<DiscardUserReportsRequest>,
) -> Result<(), ApiError> {
    caller.require_moderator()?;
    state
        .report_service
        .discard_reports(&payload.user_id, &payload.indexes)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct DiscardVariantReportsRequest {
    pub variant_id: String,
    pub indexes: Vec<i64>,
}

async fn discard_variant_reports(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Json(payload): Json<DiscardVariantReportsRequest>,
) -> Result<(), ApiError> {
    caller.require_moderator()?;
    state
        .report_service
        .discard_reports(&payload.variant_id, &payload.indexes)
        .await?;
    Ok(())
}
