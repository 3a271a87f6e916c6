//! HTTP route handlers for overlay API

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use super::service::OverlayService;
use super::types::{DeleteResponse, Overlay, OverlayError};

/// Error response for overlay API
#[derive(Debug, Serialize)]
pub struct OverlayErrorResponse {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl From<OverlayError> for OverlayErrorResponse {
    fn from(e: OverlayError) -> Self {
        let status = match &e {
            OverlayError::MissingField(_) | OverlayError::NotAString(_) => {
                StatusCode::BAD_REQUEST
            }
            OverlayError::NotFound => StatusCode::NOT_FOUND,
            OverlayError::InvalidBody(_) | OverlayError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            error: e.to_string(),
            status,
        }
    }
}

impl IntoResponse for OverlayErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Ids that cannot be decoded from the URL can never match an overlay
fn overlay_id(
    path: Result<Path<String>, PathRejection>,
) -> Result<String, OverlayErrorResponse> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            tracing::debug!("Rejecting undecodable overlay id: {}", rejection);
            Err(OverlayErrorResponse::from(OverlayError::NotFound))
        }
    }
}

fn log_failure(operation: &str, id: Option<&str>, e: &OverlayError) {
    let id = id.unwrap_or("-");
    if e.is_client_error() {
        tracing::debug!("{} overlay {} rejected: {}", operation, id, e);
    } else {
        tracing::error!("Failed to {} overlay {}: {}", operation, id, e);
    }
}

/// POST /api/overlays - Create a new overlay
pub async fn create_overlay(
    State(service): State<OverlayService>,
    body: Bytes,
) -> Result<(StatusCode, Json<Overlay>), OverlayErrorResponse> {
    let overlay = service.create(&body).await.map_err(|e| {
        log_failure("create", None, &e);
        OverlayErrorResponse::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(overlay)))
}

/// GET /api/overlays - List all overlays
pub async fn list_overlays(
    State(service): State<OverlayService>,
) -> Result<Json<Vec<Overlay>>, OverlayErrorResponse> {
    let overlays = service.list().await.map_err(|e| {
        log_failure("list", None, &e);
        OverlayErrorResponse::from(e)
    })?;

    Ok(Json(overlays))
}

/// GET /api/overlays/:id - Get a single overlay
pub async fn get_overlay(
    State(service): State<OverlayService>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Overlay>, OverlayErrorResponse> {
    let id = overlay_id(path)?;
    let overlay = service.get(&id).await.map_err(|e| {
        log_failure("get", Some(id.as_str()), &e);
        OverlayErrorResponse::from(e)
    })?;

    Ok(Json(overlay))
}

/// PUT /api/overlays/:id - Overwrite the fields present in the body
pub async fn update_overlay(
    State(service): State<OverlayService>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Json<Overlay>, OverlayErrorResponse> {
    let id = overlay_id(path)?;
    let overlay = service.update(&id, &body).await.map_err(|e| {
        log_failure("update", Some(id.as_str()), &e);
        OverlayErrorResponse::from(e)
    })?;

    Ok(Json(overlay))
}

/// DELETE /api/overlays/:id - Delete an overlay
pub async fn delete_overlay(
    State(service): State<OverlayService>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DeleteResponse>, OverlayErrorResponse> {
    let id = overlay_id(path)?;
    service.delete(&id).await.map_err(|e| {
        log_failure("delete", Some(id.as_str()), &e);
        OverlayErrorResponse::from(e)
    })?;

    Ok(Json(DeleteResponse {
        message: "Overlay deleted successfully".to_string(),
    }))
}

/// Build overlay API routes
pub fn overlay_routes(service: OverlayService) -> Router {
    Router::new()
        .route("/overlays", get(list_overlays).post(create_overlay))
        .route(
            "/overlays/:id",
            get(get_overlay).put(update_overlay).delete(delete_overlay),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (OverlayError::MissingField("size"), StatusCode::BAD_REQUEST),
            (OverlayError::NotAString("type"), StatusCode::BAD_REQUEST),
            (OverlayError::NotFound, StatusCode::NOT_FOUND),
            (
                OverlayError::InvalidBody("EOF while parsing".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                OverlayError::Storage("connection refused".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = OverlayErrorResponse::from(error);
            assert_eq!(response.status, expected);
        }
    }

    #[test]
    fn test_error_body_carries_only_message() {
        let response = OverlayErrorResponse::from(OverlayError::NotFound);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Overlay not found"}));
    }
}
