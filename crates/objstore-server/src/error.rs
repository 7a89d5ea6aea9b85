use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use objstore_core::{Error, ErrorKind};
use tracing::error;

/// Store error rendered as a JSON response with a status derived from its kind.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(serde_json::json!({
                "error": kind,
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}
