use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use campus_core::errors::CampusError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct CampusAxumError(pub anyhow::Error);

impl From<anyhow::Error> for CampusAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<CampusError> for CampusAxumError {
    fn from(e: CampusError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for CampusAxumError {
    fn into_response(self) -> Response {
        // A CampusError anywhere in the chain keeps its kind; anything else is a GeneralError.
        let safe = match CampusError::from_anyhow(&self.0) {
            Some(campus) => campus.sanitize_for_client(),
            None => CampusError::general_error(self.0.to_string()),
        };

        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request.failed");
        }
        (status, Json(safe.to_json())).into_response()
    }
}

pub(crate) fn map_json_rejection(rejection: JsonRejection) -> CampusAxumError {
    CampusError::bad_request("Failed to parse the request body as JSON")
        .with_data(json!({"_body": [rejection.body_text()]}))
        .into()
}
