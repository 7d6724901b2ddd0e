use std::collections::VecDeque;

use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use chrono::{DateTime, Utc};
use db::{
    TransactionTrait,
    models::{
        project::{CreateProject, Project, ProjectWithTasks, UpdateProject},
        task::{CreateTask, Task},
        task_tree::build_forest,
    },
    types::TaskStatus,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState, error::ApiError, http::auth::AuthUser, middleware::load_project_middleware,
};

/// One node of an initial task tree supplied at project creation.
#[derive(Debug, Deserialize)]
pub struct TaskNode {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i16>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subtasks: Vec<TaskNode>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskNode>,
}

pub async fn get_projects(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_all(&state.db().pool, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_projects_with_tasks(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectWithTasks>>>, ApiError> {
    let projects = Project::find_all_with_tasks(&state.db().pool, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_project(
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if project.user_id != auth.id {
        return Err(ApiError::Unauthorized);
    }
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// Creates the project and its optional initial task tree in one
/// transaction, so a failed insert never leaves a partial tree behind.
/// Parents are inserted before their children, level by level.
pub async fn create_project(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<ResponseJson<ApiResponse<ProjectWithTasks>>, ApiError> {
    let tx = state.db().pool.begin().await?;

    let project = Project::create(
        &tx,
        &CreateProject {
            name: payload.name,
            description: payload.description.unwrap_or_default(),
        },
        Uuid::new_v4(),
        auth.id,
    )
    .await?;

    let mut created: Vec<Task> = Vec::new();
    let mut queue: VecDeque<(TaskNode, Option<Uuid>)> = payload
        .tasks
        .into_iter()
        .map(|node| (node, None))
        .collect();
    while let Some((node, parent_task_id)) = queue.pop_front() {
        let data = CreateTask {
            title: node.title,
            description: node.description,
            status: node.status,
            priority: node.priority,
            project_id: Some(project.id),
            parent_task_id,
            due_date: node.due_date,
        };
        let task = Task::create(&tx, &data, Uuid::new_v4(), auth.id).await?;
        for child in node.subtasks {
            queue.push_back((child, Some(task.id)));
        }
        created.push(task);
    }

    tx.commit().await?;

    tracing::info!(
        "Created project '{}' ({}) with {} initial tasks",
        project.name,
        project.id,
        created.len()
    );
    Ok(ResponseJson(ApiResponse::success(ProjectWithTasks {
        project,
        tasks: build_forest(created),
    })))
}

pub async fn update_project(
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if project.user_id != auth.id {
        return Err(ApiError::Unauthorized);
    }
    let project = Project::update(&state.db().pool, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if project.user_id != auth.id {
        return Err(ApiError::Unauthorized);
    }
    let rows = Project::delete(&state.db().pool, project.id).await?;
    if rows == 0 {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .layer(from_fn_with_state(state.clone(), load_project_middleware::<AppState>));

    let inner = Router::new()
        .route("/", get(get_projects).post(create_project))
        .route("/with-tasks", get(get_projects_with_tasks))
        .nest("/{project_id}", project_id_router);

    Router::new().nest("/projects", inner)
}
