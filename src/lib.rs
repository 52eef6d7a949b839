pub mod adapters;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use adapters::{Command, CommandGateway, GatewayError, HttpGateway};
pub use config::{SessionSettings, SyncConfig};
pub use error::{ErrorKind, FetchOutcome, SyncError};
pub use models::{Coordinate, FilterCriteria, GradeScale, Partition, Project, SentStatus, Session};
pub use services::{AnnotationPoint, Asset, ProjectStore, SyncService};
pub use storage::LocalBackend;
