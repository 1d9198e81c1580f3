use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Service banner for the root path.
pub async fn banner() -> Json<Value> {
    Json(json!({
        "service": "medex",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub indexed_files: i64,
    pub cache_size_bytes: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = state.store.ping().await.is_ok();
    let indexed_files = state.store.count().await.unwrap_or(0);
    let cache_size_bytes = dir_size(&state.cache_dir).await;

    Json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" },
        database: if database_ok {
            "connected"
        } else {
            "disconnected"
        },
        indexed_files,
        cache_size_bytes,
    })
}

/// Rough cache footprint: total size of regular files under `root`.
/// Unreadable entries just don't count.
async fn dir_size(root: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }
    total
}
