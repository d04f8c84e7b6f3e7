use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Device with id {0} already exists")]
    DuplicateId(i64),

    #[error("Device store is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Device store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(_) => {
                debug!(error = %self, "Rejected request");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::DuplicateId(_) => {
                debug!(error = %self, "Rejected request");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::StorageCorrupt(_) | AppError::Io(_) => {
                error!(error = %self, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AppError::NotFound("Device 7 not found".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DuplicateId(7).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::StorageCorrupt("bad price".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            AppError::from(io).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_id_message_names_the_id() {
        assert_eq!(
            AppError::DuplicateId(42).to_string(),
            "Device with id 42 already exists"
        );
    }
}
