use axum::{response::IntoResponse, Json};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("Invalid consumption: {0}")]
    InvalidConsumption(String),
    #[error("Invalid dependency: {0}")]
    InvalidDependency(String),
    #[error("Circular dependency: {0}")]
    CircularDependency(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg)
            | Self::InsufficientStock(msg)
            | Self::InvalidConsumption(msg)
            | Self::InvalidDependency(msg)
            | Self::CircularDependency(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
