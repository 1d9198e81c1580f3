use medex_core::CatalogStore;
use std::path::PathBuf;

/// Shared state behind the read-only API.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: CatalogStore,
    /// Where the external thumbnailer drops its cache.
    pub thumbnail_dir: PathBuf,
    /// Cache root reported by the health endpoint.
    pub cache_dir: PathBuf,
}
