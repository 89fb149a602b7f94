//! Storage Layer
//!
//! SQLite persistence for elevators and their movement log, with repository pattern.

mod models;
mod report;
mod repository;
mod schema;

pub use models::{parse_timestamp, Elevator, Movement, NewElevator, NewMovement, StoreCounts};
pub use report::{DemandEntry, ElapsedEntry, TrainingData};
pub use repository::Repository;
pub use schema::init_schema;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Invalid database url: {0}")]
    InvalidUrl(String),
}

/// Result alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
