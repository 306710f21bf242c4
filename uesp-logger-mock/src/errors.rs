use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failures of a write request, answered the way InfluxDB 1.x does: a
/// status code and a JSON body with an `error` message.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("database is required")]
    MissingDatabase,

    #[error("database not found: \"{0}\"")]
    DatabaseNotFound(String),

    #[error("authorization failed")]
    Unauthorized,

    #[error("body is not valid UTF-8")]
    InvalidEncoding,

    #[error("unable to parse '{line}': {reason}")]
    Parse { line: String, reason: String },
}

impl WriteError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WriteError::MissingDatabase => StatusCode::BAD_REQUEST,
            WriteError::DatabaseNotFound(_) => StatusCode::NOT_FOUND,
            WriteError::Unauthorized => StatusCode::UNAUTHORIZED,
            WriteError::InvalidEncoding => StatusCode::BAD_REQUEST,
            WriteError::Parse { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WriteError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!("Rejected write ({}): {}", status.as_u16(), self);

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
