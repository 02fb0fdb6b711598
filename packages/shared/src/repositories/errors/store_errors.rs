/// Error surface shared by every document-store repository.
#[derive(Debug)]
pub enum StoreError {
    NotFound,
    /// A conditional write lost against a concurrent writer.
    Conflict,
    DynamoDb(String),
    Serialization(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "Document not found"),
            StoreError::Conflict => write!(f, "Conditional write conflict"),
            StoreError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            StoreError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// Classifies an SDK failure, turning conditional-check losses into
    /// `Conflict` so callers can retry their read-modify-write cycle.
    pub fn from_sdk<E: std::fmt::Display>(err: E) -> Self {
        let message = err.to_string();
        if message.contains("ConditionalCheckFailedException") {
            StoreError::Conflict
        } else {
            StoreError::DynamoDb(message)
        }
    }
}
