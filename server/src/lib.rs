//! Overlay Server Library
//!
//! This module exports the server components for use in integration tests
//! and external tooling.

pub mod config;
pub mod overlay;
pub mod server;

// Re-export commonly used types
pub use overlay::{
    MemoryOverlayStore, MongoOverlayStore, Overlay, OverlayError, OverlayService, OverlayStore,
    overlay_routes,
};
pub use server::build_router;
