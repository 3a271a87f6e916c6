//! Overlay CRUD module
//!
//! Handles validation, storage, and serving of livestream overlay records.

pub mod memory;
pub mod mongo;
pub mod routes;
pub mod service;
pub mod store;
pub mod types;

pub use memory::MemoryOverlayStore;
pub use mongo::MongoOverlayStore;
pub use routes::overlay_routes;
pub use service::OverlayService;
pub use store::OverlayStore;
pub use types::{Overlay, OverlayError, OverlayPatch};
