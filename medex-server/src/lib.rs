//! # Medex Server
//!
//! Service binary for the Medex patient-record catalog.
//!
//! ## Overview
//!
//! Medex keeps a searchable catalog of patient exam files spread across
//! network-share roots:
//!
//! - **Ingestion**: every configured root is scanned once at startup and
//!   then watched for changes; the catalog follows the filesystem without
//!   full rescans (`medex-core`)
//! - **Identity extraction**: patient name and registration number are
//!   parsed out of file and folder names with a per-pattern confidence
//! - **Read API**: the viewer frontend searches and streams cataloged
//!   files through a small read-only HTTP surface
//!
//! This crate wires the pieces together: configuration, the SQLite store,
//! the ingest pipeline, and the axum router.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
