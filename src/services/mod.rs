//! Services module for sync logic
//!
//! This module contains the store, the read and write paths, and the
//! service that coordinates them over a gateway.

pub mod coordinator;
pub mod project_store;
pub mod queries;
pub mod summaries;
pub mod sync_service;

pub use coordinator::{AnnotationPoint, Asset, PointValue};
pub use project_store::{AnnotationMap, FetchToken, ProjectStore};
pub use sync_service::SyncService;
