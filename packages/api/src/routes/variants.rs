use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::{error::ApiError, middleware::auth::AuthenticatedCaller, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/variants/delete", post(delete_variant))
}

#[derive(Deserialize)]
pub struct DeleteVariantRequest {
    pub variant_id: String,
}

async fn delete_variant(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(payload): Json<DeleteVariantRequest>,
) -> Result<(), ApiError> {
    state
        .variant_service
        .delete_variant(&caller, &payload.variant_id)
        .await?;
    Ok(())
}
