//! # Medex Config
//!
//! Configuration loading for the Medex service. Settings come from a TOML
//! (or JSON) file resolved through an environment override chain, with
//! every field defaulting to something usable for local development.

mod settings;

pub use settings::{AppConfig, ConfigSource, HttpConfig, IngestConfig};
