mod files;
mod home;
mod projects;
mod range;
mod versions;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

// Define the OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // General endpoints
        home::root,
        home::heartbeat,
        // Projects
        projects::create_project,
        projects::list_projects,
        projects::get_project,
        projects::update_project,
        projects::delete_project,
        // Versions
        versions::create_version,
        versions::list_versions,
        versions::get_version,
        versions::update_version,
        versions::delete_version,
        versions::attach_file,
        versions::detach_file,
        // Files
        files::create_file,
        files::list_files,
        files::get_file,
        files::delete_file,
        files::upload_file,
        files::download_file,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            home::HeartbeatResponse,
            projects::CreateProjectRequest,
            projects::UpdateProjectRequest,
            projects::ProjectResponse,
            versions::CreateVersionRequest,
            versions::UpdateVersionRequest,
            versions::FileAttachmentRequest,
            versions::VersionResponse,
            files::CreateFileRequest,
            files::FileResponse,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Projects", description = "Top-level containers for versions"),
        (name = "Versions", description = "Named releases of a project and their attached files"),
        (name = "Files", description = "File records, content upload and download")
    ),
    info(
        title = "DocPort API",
        version = "0.1.0",
        description = "Document hosting for projects, versions and files with pluggable blob storage",
    )
)]
struct ApiDoc;

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let upload_limit = DefaultBodyLimit::max(state.max_upload_size);

    let api_routes = Router::new()
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/versions",
            get(versions::list_versions).post(versions::create_version),
        )
        .route(
            "/versions/{id}",
            get(versions::get_version)
                .put(versions::update_version)
                .delete(versions::delete_version),
        )
        .route("/versions/{id}/attach-file", post(versions::attach_file))
        .route("/versions/{id}/detach-file", post(versions::detach_file))
        .route("/files", get(files::list_files).post(files::create_file))
        .route(
            "/files/{id}",
            get(files::get_file).delete(files::delete_file),
        )
        .route(
            "/files/{id}/upload",
            post(files::upload_file).layer(upload_limit),
        )
        .route("/files/{id}/download", get(files::download_file));

    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/heartbeat", get(home::heartbeat))
        .nest("/api/v1", api_routes)
        .with_state(state);

    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
