//! Error types for the glossary service.
//!
//! This module defines the central `Error` enum shared by the server and its
//! clients. It implements `From<Error>` for `tonic::Status` so handlers can
//! return it with `?` and clients receive a meaningful status code.
//!
//! ## Error Cases
//! - `TermNotFound`: A lookup missed. Expected, surfaces as `NOT_FOUND`.
//! - `Storage`: The backing database failed. Surfaces as `INTERNAL`.

use tonic::{Code, Status};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the glossary service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No term is stored under the requested keyword.
    #[error("Term not found: {keyword}")]
    TermNotFound { keyword: String },

    /// The storage layer failed while serving the request.
    #[error("Storage error: {context}")]
    Storage { context: String },
}

impl Error {
    pub fn storage(context: impl ToString) -> Self {
        Self::Storage {
            context: context.to_string(),
        }
    }

    /// The status code this error is reported with.
    pub fn code(&self) -> Code {
        match self {
            Error::TermNotFound { .. } => Code::NotFound,
            Error::Storage { .. } => Code::Internal,
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::TermNotFound { .. } => Status::not_found("Term not found"),
            // Storage details stay in the server log.
            Error::Storage { .. } => Status::internal("Storage failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found_status() {
        let status: Status = Error::TermNotFound {
            keyword: "doesnotexist".to_string(),
        }
        .into();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "Term not found");
    }

    #[test]
    fn storage_error_hides_context() {
        let err = Error::storage("disk I/O error at /data/glossary.db");
        assert_eq!(err.code(), Code::Internal);
        let status: Status = err.into();
        assert_eq!(status.code(), Code::Internal);
        assert!(!status.message().contains("/data"));
    }
}
