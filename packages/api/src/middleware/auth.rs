use axum::{extract::FromRequestParts, http::request::Parts};

use shared::services::Caller;

use crate::{error::ApiError, state::AppState};
use shared::services::errors::rpc_errors::RpcError;

/// Extractor enforcing the RPC auth requirements: a Bearer session token
/// with a verified email, plus a client attestation token. Moderator status
/// rides on the session claims; routes that need it check the flag.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub Caller);

impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let attestation = parts
            .headers
            .get("X-Client-Attestation")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError(RpcError::unauthenticated("Missing client attestation"))
            })?;
        state
            .token_verifier
            .verify_attestation(attestation)
            .map_err(|e| ApiError(RpcError::unauthenticated(&e.to_string())))?;

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError(RpcError::unauthenticated("Missing session token")))?;
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError(RpcError::unauthenticated("Malformed Authorization header")))?;

        let claims = state
            .token_verifier
            .verify_session(token)
            .map_err(|e| ApiError(RpcError::unauthenticated(&e.to_string())))?;

        Ok(AuthenticatedCaller(Caller {
            user_id: claims.sub,
            moderator: claims.moderator,
        }))
    }
}

impl AuthenticatedCaller {
    /// Guard for moderator-only routes.
    pub fn require_moderator(&self) -> Result<(), ApiError> {
        if self.0.moderator {
            Ok(())
        } else {
            Err(ApiError(RpcError::permission_denied(
                "Moderator role required",
            )))
        }
    }
}
