//! OverlayStore trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{NewOverlay, Overlay, OverlayError, OverlayPatch};

/// Trait for overlay storage backends (MongoDB or in-process)
///
/// Every method maps onto exactly one storage call. Identifiers are opaque:
/// an identifier the backend cannot parse behaves like one that was never issued.
#[async_trait]
pub trait OverlayStore: Send + Sync {
    /// Persist a new overlay and return it with its assigned identifier
    async fn insert(&self, overlay: NewOverlay) -> Result<Overlay, OverlayError>;

    /// List every overlay in store-native order
    async fn list(&self) -> Result<Vec<Overlay>, OverlayError>;

    /// Get a single overlay, `None` if it does not exist
    async fn get(&self, id: &str) -> Result<Option<Overlay>, OverlayError>;

    /// Merge `patch` into the stored overlay and return the updated record
    async fn update(
        &self,
        id: &str,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Overlay>, OverlayError>;

    /// Remove an overlay, returning whether one was removed
    async fn delete(&self, id: &str) -> Result<bool, OverlayError>;

    /// Release backend resources once the server has stopped
    async fn shutdown(&self) {}
}
