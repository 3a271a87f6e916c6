//! Overlay operations on top of an `OverlayStore`

use std::sync::Arc;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use super::store::OverlayStore;
use super::types::{CreateOverlayRequest, Overlay, OverlayError, UpdateOverlayRequest, now};

/// Validates requests, stamps timestamps and turns missing records into
/// `OverlayError::NotFound`. Each operation performs exactly one store call.
#[derive(Clone)]
pub struct OverlayService {
    store: Arc<dyn OverlayStore>,
}

impl OverlayService {
    pub fn new(store: Arc<dyn OverlayStore>) -> Self {
        Self { store }
    }

    /// Create an overlay from a raw JSON request body
    pub async fn create(&self, body: &[u8]) -> Result<Overlay, OverlayError> {
        let result = async {
            let request: CreateOverlayRequest = parse_body(body)?;
            let overlay = request.into_new_overlay(now())?;
            self.store.insert(overlay).await
        }
        .await;

        if let Ok(overlay) = &result {
            info!("Created overlay {} (type={})", overlay.id, overlay.kind);
        }
        record("create", result)
    }

    /// List all overlays
    pub async fn list(&self) -> Result<Vec<Overlay>, OverlayError> {
        let result = self.store.list().await;
        if let Ok(overlays) = &result {
            debug!("Listed {} overlays", overlays.len());
        }
        record("list", result)
    }

    /// Get one overlay by identifier
    pub async fn get(&self, id: &str) -> Result<Overlay, OverlayError> {
        let result = self
            .store
            .get(id)
            .await
            .and_then(|found| found.ok_or(OverlayError::NotFound));
        record("get", result)
    }

    /// Merge the fields present in `body` into an existing overlay
    pub async fn update(&self, id: &str, body: &[u8]) -> Result<Overlay, OverlayError> {
        let result = async {
            let request: UpdateOverlayRequest = parse_body(body)?;
            let patch = request.into_patch()?;
            self.store
                .update(id, &patch, now())
                .await?
                .ok_or(OverlayError::NotFound)
        }
        .await;

        if let Ok(overlay) = &result {
            info!("Updated overlay {}", overlay.id);
        }
        record("update", result)
    }

    /// Delete one overlay by identifier
    pub async fn delete(&self, id: &str) -> Result<(), OverlayError> {
        let result = match self.store.delete(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(OverlayError::NotFound),
            Err(e) => Err(e),
        };

        if result.is_ok() {
            info!("Deleted overlay {}", id);
        }
        record("delete", result)
    }
}

/// Request bodies must be JSON objects; anything else is a server-side failure
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, OverlayError> {
    let body: Value =
        serde_json::from_slice(body).map_err(|e| OverlayError::InvalidBody(e.to_string()))?;
    if !body.is_object() {
        return Err(OverlayError::InvalidBody(
            "Request body must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(body).map_err(|e| OverlayError::InvalidBody(e.to_string()))
}

fn record<T>(
    operation: &'static str,
    result: Result<T, OverlayError>,
) -> Result<T, OverlayError> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) if e.is_client_error() => "client_error",
        Err(_) => "server_error",
    };
    counter!("overlay_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    result
}
