use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use medex_model::FileType;
use tokio_util::io::ReaderStream;

/// Stream the original file for a record straight off the share.
///
/// Document conversion is an external collaborator; image folders are the
/// one kind it has not covered yet, exactly like the legacy service.
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("record {id} not found")))?;

    if record.file_type == FileType::ImageFolder {
        return Err(ApiError::not_implemented(
            "image folders are served through the conversion pipeline",
        ));
    }

    let file = tokio::fs::File::open(&record.file_path)
        .await
        .map_err(|_| ApiError::not_found("file no longer exists on the share"))?;

    let filename = std::path::Path::new(&record.file_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("record-{id}"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.file_type.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|err| ApiError::internal(err.to_string()))
}

/// Serve the cached thumbnail once the external thumbnailer has produced
/// one; 404 until then.
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("record {id} not found")))?;

    let thumbnail_path = record
        .thumbnail_path
        .ok_or_else(|| ApiError::not_found("no thumbnail generated yet"))?;

    let file = tokio::fs::File::open(&thumbnail_path)
        .await
        .map_err(|_| ApiError::not_found("thumbnail cache entry is gone"))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|err| ApiError::internal(err.to_string()))
}
