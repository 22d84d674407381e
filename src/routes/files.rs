use std::io::SeekFrom;

use axum::{
    body::Body,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartRejection},
    },
    http::{
        HeaderMap, StatusCode,
        header::{
            ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE,
            LAST_MODIFIED, RANGE,
        },
    },
    response::{Json, Response},
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use utoipa::IntoParams;

use super::range::{ByteRange, parse_range};
use crate::entities::file;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::pagination::{PaginatedResponse, Pagination};
use crate::services::mime::OCTET_STREAM;
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateFileRequest {
    name: String,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct FileFilter {
    /// Only files attached to this version.
    version_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    id: i32,
    name: String,
    size: Option<i64>,
    mime_type: Option<String>,
    is_complete: bool,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl From<file::Model> for FileResponse {
    fn from(file: file::Model) -> Self {
        FileResponse {
            id: file.id,
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            is_complete: file.is_complete,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/files",
    request_body = CreateFileRequest,
    responses(
        (status = 201, description = "File record created, awaiting upload", body = FileResponse),
        (status = 400, description = "Invalid request", body = ErrorBody)
    ),
    tag = "Files"
)]
pub async fn create_file(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateFileRequest>,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    let file = state.files.create(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(FileResponse::from(file))))
}

#[utoipa::path(
    get,
    path = "/api/v1/files",
    params(FileFilter, Pagination),
    responses(
        (status = 200, description = "Page of files, newest first", body = PaginatedResponse<FileResponse>)
    ),
    tag = "Files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<FileFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> Result<Json<PaginatedResponse<FileResponse>>, AppError> {
    let page = state
        .files
        .list(filter.version_id, pagination.limit(), pagination.offset())
        .await?;
    let data = page.items.into_iter().map(FileResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, page.total, &pagination)))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{fileId}",
    params(
        ("fileId" = i32, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 404, description = "File not found", body = ErrorBody)
    ),
    tag = "Files"
)]
pub async fn get_file(
    State(state): State<AppState>,
    AppPath(file_id): AppPath<i32>,
) -> Result<Json<FileResponse>, AppError> {
    let file = state.files.get(file_id).await?;
    Ok(Json(FileResponse::from(file)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/{fileId}",
    params(
        ("fileId" = i32, Path, description = "File ID")
    ),
    responses(
        (status = 204, description = "File record and content deleted"),
        (status = 404, description = "File not found", body = ErrorBody)
    ),
    tag = "Files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    AppPath(file_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    state.files.delete(file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Copy a multipart field into an anonymous temp file and rewind it.
async fn spool(field: &mut Field<'_>) -> Result<(tokio::fs::File, u64), AppError> {
    let spool_err = |e: std::io::Error| AppError::InternalServerError(format!("upload spool: {e}"));

    let file = tokio::task::spawn_blocking(tempfile::tempfile)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .map_err(spool_err)?;
    let mut file = tokio::fs::File::from_std(file);

    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await.map_err(spool_err)?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(spool_err)?;
    file.rewind().await.map_err(spool_err)?;

    Ok((file, size))
}

#[utoipa::path(
    post,
    path = "/api/v1/files/{fileId}/upload",
    params(
        ("fileId" = i32, Path, description = "File ID")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 200, description = "Content stored", body = FileResponse),
        (status = 400, description = "Missing `file` field or size mismatch", body = ErrorBody),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 409, description = "File already uploaded", body = ErrorBody),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorBody)
    ),
    tag = "Files"
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<AppState>,
    AppPath(file_id): AppPath<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FileResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let (content, size) = spool(&mut field).await?;
        let file = state.files.upload(file_id, content, size).await?;
        return Ok(Json(FileResponse::from(file)));
    }

    Err(AppError::BadRequest("multipart field 'file' is required".to_string()))
}

fn http_date(at: chrono::NaiveDateTime) -> String {
    at.and_utc().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// encoded original.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if fallback == name {
        return format!("attachment; filename=\"{name}\"");
    }

    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{fileId}/download",
    params(
        ("fileId" = i32, Path, description = "File ID"),
        ("Range" = Option<String>, Header, description = "Single byte range, e.g. `bytes=0-99`")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 206, description = "Requested byte range", content_type = "application/octet-stream"),
        (status = 400, description = "File upload not complete", body = ErrorBody),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 416, description = "Range not satisfiable")
    ),
    tag = "Files"
)]
#[tracing::instrument(skip(state, headers))]
pub async fn download_file(
    State(state): State<AppState>,
    AppPath(file_id): AppPath<i32>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (file, mut content) = state.files.download(file_id).await?;
    let io_err = |e: std::io::Error| AppError::InternalServerError(format!("reading blob: {e}"));

    let total = content.seek(SeekFrom::End(0)).await.map_err(io_err)?;
    let range = parse_range(headers.get(RANGE).and_then(|v| v.to_str().ok()), total);

    let builder = axum::http::Response::builder()
        .header(CONTENT_TYPE, file.mime_type.as_deref().unwrap_or(OCTET_STREAM))
        .header(CONTENT_DISPOSITION, content_disposition(&file.name))
        .header(ACCEPT_RANGES, "bytes")
        .header(LAST_MODIFIED, http_date(file.updated_at));

    let response = match range {
        ByteRange::Unsatisfiable => builder
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(CONTENT_RANGE, format!("bytes */{total}"))
            .body(Body::empty()),
        ByteRange::Full => {
            content.rewind().await.map_err(io_err)?;
            builder
                .status(StatusCode::OK)
                .header(CONTENT_LENGTH, total)
                .body(Body::from_stream(ReaderStream::new(content.take(total))))
        }
        ByteRange::Partial { start, end } => {
            let len = end - start + 1;
            content.seek(SeekFrom::Start(start)).await.map_err(io_err)?;
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_RANGE, format!("bytes {start}-{end}/{total}"))
                .header(CONTENT_LENGTH, len)
                .body(Body::from_stream(ReaderStream::new(content.take(len))))
        }
    };

    response.map_err(|e| AppError::InternalServerError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_use_a_simple_disposition() {
        assert_eq!(
            content_disposition("report 2024.pdf"),
            "attachment; filename=\"report 2024.pdf\""
        );
    }

    #[test]
    fn unsafe_names_get_an_encoded_variant() {
        assert_eq!(
            content_disposition("résumé \"v2\".pdf"),
            "attachment; filename=\"r_sum_ _v2_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9%20%22v2%22.pdf"
        );
    }

    #[test]
    fn last_modified_uses_http_date_format() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap();
        assert_eq!(http_date(at), "Tue, 05 Mar 2024 14:07:09 GMT");
    }
}
