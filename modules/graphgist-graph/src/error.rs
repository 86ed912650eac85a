use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("GraphGist not found: {0}")]
    NotFound(Uuid),

    #[error("Lost candidate creation race for GraphGist {0}")]
    Conflict(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] neo4rs::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GraphError {
    /// Map a driver error, folding Neo4j's lock contention into `Conflict`.
    /// Constraint violations stay `Database`: a retry would hit them again.
    pub fn from_write(e: neo4rs::Error, graph_gist: Uuid) -> Self {
        if is_lock_contention(&e.to_string()) {
            GraphError::Conflict(graph_gist)
        } else {
            GraphError::Database(e)
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GraphError::Conflict(_))
    }
}

/// Neo4j status codes for deadlocks and other transient (retryable) failures.
fn is_lock_contention(msg: &str) -> bool {
    msg.contains("DeadlockDetected") || msg.contains("Neo.TransientError")
}
