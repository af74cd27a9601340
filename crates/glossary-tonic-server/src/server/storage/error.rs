use glossary_tonic_core::Error;

/// Failure inside the storage layer.
///
/// Never raised for a missing term; lookups report absence as `Ok(None)`.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Creating the database directory failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task running the query panicked or was aborted.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::storage(err)
    }
}
