//! Storage module for the local SQLite backend
//!
//! This module provides:
//! - Database connection management
//! - Schema migrations
//! - The project repository and the gateway implementation built on it

pub mod db;
pub mod local_backend;
pub mod project_repo;

pub use db::{open_database, open_in_memory, Database, DatabaseError};
pub use local_backend::LocalBackend;
pub use project_repo::ProjectRepo;
