/// Domain-level errors raised by pure `storyloom-core` logic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}
