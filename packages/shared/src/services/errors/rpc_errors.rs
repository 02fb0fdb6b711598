use crate::repositories::errors::store_errors::StoreError;

/// Stable reason codes surfaced to RPC callers. Background handlers never
/// produce these; they log and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    Unauthenticated,
    InvalidArgument,
    FailedPrecondition,
    NotFound,
    PermissionDenied,
    Internal,
}

impl RpcErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcErrorCode::Unauthenticated => "unauthenticated",
            RpcErrorCode::InvalidArgument => "invalid-argument",
            RpcErrorCode::FailedPrecondition => "failed-precondition",
            RpcErrorCode::NotFound => "not-found",
            RpcErrorCode::PermissionDenied => "permission-denied",
            RpcErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug)]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: &str) -> Self {
        RpcError {
            code,
            message: message.to_string(),
        }
    }

    pub fn unauthenticated(message: &str) -> Self {
        Self::new(RpcErrorCode::Unauthenticated, message)
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(RpcErrorCode::InvalidArgument, message)
    }

    pub fn failed_precondition(message: &str) -> Self {
        Self::new(RpcErrorCode::FailedPrecondition, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(RpcErrorCode::NotFound, message)
    }

    pub fn permission_denied(message: &str) -> Self {
        Self::new(RpcErrorCode::PermissionDenied, message)
    }

    pub fn internal(message: &str) -> Self {
        Self::new(RpcErrorCode::Internal, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<StoreError> for RpcError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RpcError::not_found("Document not found"),
            StoreError::Conflict => {
                RpcError::failed_precondition("Document changed under a conditional write")
            }
            other => RpcError::internal(&other.to_string()),
        }
    }
}
