use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use crate::entities::project;
use crate::error::AppError;
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::pagination::{PaginatedResponse, Pagination};
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    slug: String,
    name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    slug: Option<String>,
    name: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    id: i32,
    slug: String,
    name: String,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl From<project::Model> for ProjectResponse {
    fn from(project: project::Model) -> Self {
        ProjectResponse {
            id: project.id,
            slug: project.slug,
            name: project.name,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody)
    ),
    tag = "Projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), AppError> {
    let project = state.projects.create(&payload.slug, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

#[utoipa::path(
    get,
    path = "/api/v1/projects",
    params(Pagination),
    responses(
        (status = 200, description = "Page of projects", body = PaginatedResponse<ProjectResponse>)
    ),
    tag = "Projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> Result<Json<PaginatedResponse<ProjectResponse>>, AppError> {
    let page = state
        .projects
        .list(pagination.limit(), pagination.offset())
        .await?;
    let data = page.items.into_iter().map(ProjectResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, page.total, &pagination)))
}

#[utoipa::path(
    get,
    path = "/api/v1/projects/{projectId}",
    params(
        ("projectId" = i32, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody)
    ),
    tag = "Projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i32>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = state.projects.get(project_id).await?;
    Ok(Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    put,
    path = "/api/v1/projects/{projectId}",
    params(
        ("projectId" = i32, Path, description = "Project ID")
    ),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
        (status = 409, description = "Slug already in use", body = crate::error::ErrorBody)
    ),
    tag = "Projects"
)]
pub async fn update_project(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = state
        .projects
        .update(project_id, payload.slug.as_deref(), payload.name.as_deref())
        .await?;
    Ok(Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/projects/{projectId}",
    params(
        ("projectId" = i32, Path, description = "Project ID")
    ),
    responses(
        (status = 204, description = "Project and its versions deleted"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody)
    ),
    tag = "Projects"
)]
pub async fn delete_project(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    state.projects.delete(project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
