use thiserror::Error;

use crate::validation::ValidationError;

/// Errors returned by planner operations.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("position {position} is out of range for {len} siblings")]
    InvalidPosition { position: usize, len: usize },

    #[error("invalid sprint: {0}")]
    InvalidSprint(String),

    #[error("sprint period overlaps sprint '{name}' ({start} to {end})")]
    SprintOverlap {
        name: String,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PlanError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Wrap a storage backend failure.
    pub fn store(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Store(e.into())
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
