use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::{ErrorKind, PicksError};

/// A [`PicksError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(PicksError);

impl<E> From<E> for ApiError
where
    E: Into<PicksError>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl From<JsonRejection> for PicksError {
    fn from(rejection: JsonRejection) -> Self {
        PicksError::InvalidInput(rejection.body_text())
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::GameLocked | ErrorKind::InvalidSelection | ErrorKind::InvalidInput => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();

        let detail = match kind {
            ErrorKind::Internal => {
                error!("Internal error: {}", self.0);
                "Something went wrong, please try again later".to_string()
            }
            ErrorKind::Unauthorized => self.0.to_string(),
            _ => {
                warn!("Request failed: {}", self.0);
                self.0.to_string()
            }
        };

        let kind: &'static str = kind.into();
        (status_for(self.0.kind()), Json(json!({ "error": kind, "detail": detail }))).into_response()
    }
}
