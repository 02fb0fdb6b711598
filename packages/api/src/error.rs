use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::services::errors::rpc_errors::{RpcError, RpcErrorCode};

/// Caller-facing error envelope: the stable reason code plus a message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(pub RpcError);

impl From<RpcError> for ApiError {
    fn from(error: RpcError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            RpcErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            RpcErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcErrorCode::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            RpcErrorCode::NotFound => StatusCode::NOT_FOUND,
            RpcErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            RpcErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.0.code.as_str(),
            message: self.0.message,
        };
        (status, Json(body)).into_response()
    }
}
