use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::IntoParams;

use crate::entities::version;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::pagination::{PaginatedResponse, Pagination};
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionRequest {
    project_id: i32,
    name: String,
    description: Option<String>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateVersionRequest {
    name: Option<String>,
    /// `null` clears the description.
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    description: Option<Option<String>>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachmentRequest {
    file_id: i32,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct VersionFilter {
    /// Only versions of this project.
    project_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    id: i32,
    project_id: i32,
    name: String,
    description: Option<String>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl From<version::Model> for VersionResponse {
    fn from(version: version::Model) -> Self {
        VersionResponse {
            id: version.id,
            project_id: version.project_id,
            name: version.name,
            description: version.description,
            created_at: version.created_at,
            updated_at: version.updated_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/versions",
    request_body = CreateVersionRequest,
    responses(
        (status = 201, description = "Version created", body = VersionResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody)
    ),
    tag = "Versions"
)]
pub async fn create_version(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateVersionRequest>,
) -> Result<(StatusCode, Json<VersionResponse>), AppError> {
    let version = state
        .versions
        .create(payload.project_id, &payload.name, payload.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(VersionResponse::from(version))))
}

#[utoipa::path(
    get,
    path = "/api/v1/versions",
    params(VersionFilter, Pagination),
    responses(
        (status = 200, description = "Page of versions", body = PaginatedResponse<VersionResponse>),
        (status = 404, description = "Project not found", body = ErrorBody)
    ),
    tag = "Versions"
)]
pub async fn list_versions(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<VersionFilter>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> Result<Json<PaginatedResponse<VersionResponse>>, AppError> {
    let page = state
        .versions
        .list(filter.project_id, pagination.limit(), pagination.offset())
        .await?;
    let data = page.items.into_iter().map(VersionResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, page.total, &pagination)))
}

#[utoipa::path(
    get,
    path = "/api/v1/versions/{versionId}",
    params(
        ("versionId" = i32, Path, description = "Version ID")
    ),
    responses(
        (status = 200, description = "Version details", body = VersionResponse),
        (status = 404, description = "Version not found", body = ErrorBody)
    ),
    tag = "Versions"
)]
pub async fn get_version(
    State(state): State<AppState>,
    AppPath(version_id): AppPath<i32>,
) -> Result<Json<VersionResponse>, AppError> {
    let version = state.versions.get(version_id).await?;
    Ok(Json(VersionResponse::from(version)))
}

#[utoipa::path(
    put,
    path = "/api/v1/versions/{versionId}",
    params(
        ("versionId" = i32, Path, description = "Version ID")
    ),
    request_body = UpdateVersionRequest,
    responses(
        (status = 200, description = "Version updated", body = VersionResponse),
        (status = 404, description = "Version not found", body = ErrorBody)
    ),
    tag = "Versions"
)]
pub async fn update_version(
    State(state): State<AppState>,
    AppPath(version_id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateVersionRequest>,
) -> Result<Json<VersionResponse>, AppError> {
    let version = state
        .versions
        .update(
            version_id,
            payload.name.as_deref(),
            payload.description.as_ref().map(|d| d.as_deref()),
        )
        .await?;
    Ok(Json(VersionResponse::from(version)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/versions/{versionId}",
    params(
        ("versionId" = i32, Path, description = "Version ID")
    ),
    responses(
        (status = 204, description = "Version deleted; attached files are kept"),
        (status = 404, description = "Version not found", body = ErrorBody)
    ),
    tag = "Versions"
)]
pub async fn delete_version(
    State(state): State<AppState>,
    AppPath(version_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    state.versions.delete(version_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/versions/{versionId}/attach-file",
    params(
        ("versionId" = i32, Path, description = "Version ID")
    ),
    request_body = FileAttachmentRequest,
    responses(
        (status = 204, description = "File attached"),
        (status = 404, description = "Version or file not found", body = ErrorBody),
        (status = 409, description = "File already attached", body = ErrorBody)
    ),
    tag = "Versions"
)]
pub async fn attach_file(
    State(state): State<AppState>,
    AppPath(version_id): AppPath<i32>,
    AppJson(payload): AppJson<FileAttachmentRequest>,
) -> Result<StatusCode, AppError> {
    state.versions.attach_file(version_id, payload.file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/versions/{versionId}/detach-file",
    params(
        ("versionId" = i32, Path, description = "Version ID")
    ),
    request_body = FileAttachmentRequest,
    responses(
        (status = 204, description = "File detached"),
        (status = 404, description = "Version not found or file not attached", body = ErrorBody)
    ),
    tag = "Versions"
)]
pub async fn detach_file(
    State(state): State<AppState>,
    AppPath(version_id): AppPath<i32>,
    AppJson(payload): AppJson<FileAttachmentRequest>,
) -> Result<StatusCode, AppError> {
    state.versions.detach_file(version_id, payload.file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
