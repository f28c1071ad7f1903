//! Moch Services - Store engine and change notification.
//!
//! This crate layers the runtime behavior on top of `moch-models`:
//! - Store engine (serialized, transactional insert/update/delete with cascade)
//! - Change bus (scoped, synchronous publish/subscribe)
//! - Weight progress aggregation
//! - Asset loading for pet photos
//! - Service lifecycle trait

pub mod service;
pub mod event_bus;
pub mod store;
pub mod progress;
pub mod assets;

// Re-export key types
pub use service::{Service, ServiceState};
pub use event_bus::{ChangeBus, ChangeEvent, Operation, Scope, Subscription};
pub use store::Store;
pub use progress::{summarize, WeightSummary};
pub use assets::{AssetLoader, FileAssetLoader};
