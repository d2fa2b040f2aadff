use thiserror::Error;

/// Errors surfaced by catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Required input missing or empty. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// Unknown id, malformed id, or ownership mismatch. Nothing was written.
    #[error("{0}")]
    NotFound(String),

    /// Second write of a paired operation failed after the first succeeded.
    /// `compensated` is true when the catalog was left consistent, either
    /// because the first write was undone or because nothing needed undoing
    /// (an exhausted `delete_topic` cascade). It is false when undoing failed
    /// too; the catalog then needs an `fsck` repair pass.
    #[error("{operation}: {detail} (compensated: {compensated})")]
    Consistency {
        operation: &'static str,
        detail: String,
        compensated: bool,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl CatalogError {
    /// Errors caused by the caller's input rather than the system.
    pub fn is_user_error(&self) -> bool {
        matches!(self, CatalogError::Validation(_) | CatalogError::NotFound(_))
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
