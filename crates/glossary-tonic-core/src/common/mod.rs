//! Shared protocol bindings, errors and constants.
//!
//! ## Submodules
//!
//! - [`proto`] - Generated `glossary` messages, client and server bindings.
//! - [`error`] - The service [`Error`] type and its mapping onto
//!   [`tonic::Status`].
//! - [`types`] - Defaults and the seed glossary.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from `proto/glossary.proto`.
///
/// ## Service
///
/// - `GlossaryService.GetTerm` - Looks up one [`Term`](proto::Term) by keyword.
/// - `GlossaryService.ListTerms` - Pages through terms in keyword order.
/// - `GlossaryService.AddTerm` - Inserts or replaces a term.
pub mod proto {
    tonic::include_proto!("glossary");

    /// Encoded descriptor set for `glossary.proto`, served through gRPC
    /// reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("glossary_descriptor");
}
