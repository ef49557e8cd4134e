use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Failed to reach the store: {0}")]
    ConnectionError(String),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}
