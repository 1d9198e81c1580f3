use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use medex_model::{CatalogRecord, SortField, SortOrder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

const MAX_PAGE_SIZE: i64 = 500;

fn default_search_limit() -> i64 {
    50
}

fn default_list_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Patient name or registration-number fragment.
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub total: i64,
    pub results: Vec<CatalogRecord>,
    pub query: String,
    pub limit: i64,
    pub offset: i64,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    if params.q.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }
    let limit = params.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.max(0);

    let page = state
        .store
        .search(
            params.q.trim(),
            params.sort_by,
            params.sort_order,
            limit,
            offset,
        )
        .await?;

    Ok(Json(SearchResponse {
        total: page.total,
        results: page.results,
        query: params.q,
        limit,
        offset,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<medex_model::Page<CatalogRecord>>> {
    let limit = params.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.max(0);
    let page = state.store.list(limit, offset).await?;
    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CatalogRecord>> {
    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("record {id} not found")))?;
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !state.store.delete(id).await? {
        return Err(ApiError::not_found(format!("record {id} not found")));
    }
    info!(id, "record deleted via API");
    Ok(Json(json!({ "deleted": id })))
}
