//! In-process overlay store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::store::OverlayStore;
use super::types::{NewOverlay, Overlay, OverlayError, OverlayPatch};

/// Overlay store kept in process memory
///
/// Uses IndexMap so listing returns overlays in insertion order, and
/// `shift_remove` keeps that order intact after deletions.
#[derive(Default)]
pub struct MemoryOverlayStore {
    overlays: RwLock<IndexMap<String, Overlay>>,
}

impl MemoryOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored overlays
    pub async fn len(&self) -> usize {
        self.overlays.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.overlays.read().await.is_empty()
    }

    /// 24 hex digits, the same shape as a MongoDB ObjectId
    fn next_id() -> String {
        Uuid::new_v4().simple().to_string()[..24].to_string()
    }
}

#[async_trait]
impl OverlayStore for MemoryOverlayStore {
    async fn insert(&self, overlay: NewOverlay) -> Result<Overlay, OverlayError> {
        let mut overlays = self.overlays.write().await;

        let mut id = Self::next_id();
        while overlays.contains_key(&id) {
            id = Self::next_id();
        }

        let overlay = overlay.with_id(id.clone());
        overlays.insert(id, overlay.clone());
        debug!("Inserted overlay {} ({} total)", overlay.id, overlays.len());
        Ok(overlay)
    }

    async fn list(&self) -> Result<Vec<Overlay>, OverlayError> {
        Ok(self.overlays.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Overlay>, OverlayError> {
        Ok(self.overlays.read().await.get(id).cloned())
    }

    async fn update(
        &self,
        id: &str,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Overlay>, OverlayError> {
        let mut overlays = self.overlays.write().await;
        let Some(overlay) = overlays.get_mut(id) else {
            return Ok(None);
        };

        // Never move updated_at backwards, even if the caller's clock did
        let updated_at = updated_at.max(overlay.updated_at);
        patch.apply(overlay, updated_at);
        Ok(Some(overlay.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, OverlayError> {
        Ok(self.overlays.write().await.shift_remove(id).is_some())
    }

    async fn shutdown(&self) {
        debug!(
            "Dropping in-memory overlay store with {} overlays",
            self.overlays.read().await.len()
        );
    }
}
