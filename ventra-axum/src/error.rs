use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use ventra_core::errors::PipelineError;

/// Transport error wrapper: anything `anyhow` can carry, rendered as a
/// structured JSON response at the boundary.
#[derive(Debug)]
pub struct VentraAxumError(pub anyhow::Error);

impl From<anyhow::Error> for VentraAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<PipelineError> for VentraAxumError {
    fn from(e: PipelineError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for VentraAxumError {
    fn into_response(self) -> Response {
        // A PipelineError anywhere in the chain keeps its taxonomy.
        if let Some(pipeline) = PipelineError::from_anyhow(&self.0) {
            let status = StatusCode::from_u16(pipeline.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(pipeline.to_json())).into_response();
        }

        // Anything else is an internal error; the detail stays server-side.
        tracing::error!(error = %self.0, "unhandled error reached the transport boundary");
        let body = json!({
            "name": "GeneralError",
            "message": "Internal error",
            "code": 500,
            "className": "general-error",
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
