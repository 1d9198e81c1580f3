//! # Medex Core
//!
//! Ingestion engine for the Medex patient-record catalog.
//!
//! Patient exam files live scattered across network-share roots under
//! inconsistent naming conventions. This crate keeps a persisted catalog
//! in sync with those shares:
//!
//! - [`identity::IdentityExtractor`]: filename → patient identity with a
//!   per-tier confidence, or no match
//! - [`collector::MetadataCollector`]: filesystem attributes for a path
//! - [`store::CatalogStore`]: the SQLite-backed catalog, unique per path
//! - [`sync::CatalogSynchronizer`]: applies one lifecycle event to the
//!   catalog, idempotently
//! - [`watch::PathWatcher`]: recursive OS change notifications per root
//! - [`scan::InitialScanner`]: startup walk emitting synthetic creates
//! - [`pipeline::IngestPipeline`]: bounded queue + hash-partitioned
//!   worker pool wiring the above together, with cooperative shutdown
//!
//! Every failure an event can produce is contained inside the pipeline;
//! nothing observed on the filesystem terminates the process.

pub mod collector;
pub mod deadletter;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod scan;
pub mod store;
pub mod sync;
pub mod watch;

pub use collector::{CollectError, FileMetadata, MetadataCollector};
pub use deadletter::DeadLetterLog;
pub use error::{CatalogError, Result};
pub use identity::IdentityExtractor;
pub use pipeline::{IngestPipeline, PipelineConfig};
pub use scan::{InitialScanner, ScanSummary};
pub use store::CatalogStore;
pub use sync::{CatalogSynchronizer, SyncConfig, SyncOutcome};
pub use watch::{PathWatcher, WatchAlert};
