//! Server-side components of the glossary service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`service`] - The `GlossaryService` gRPC implementation.
//! - [`storage`] - SQLite access with per-call connections.
//! - [`telemetry`] - Logging and optional OpenTelemetry export.

pub mod config;
pub mod service;
pub mod storage;
pub mod telemetry;
