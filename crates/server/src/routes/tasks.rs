use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    TransactionTrait,
    models::{
        task::{CreateTask, Task, TaskError, UpdateTask},
        task_tree::{TaskTree, build_forest},
    },
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::AuthUser, middleware::load_task_middleware};

pub async fn get_tasks(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskTree>>>, ApiError> {
    let tasks = Task::find_by_user(&state.db().pool, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(build_forest(tasks))))
}

pub async fn get_task(
    Extension(auth): Extension<AuthUser>,
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    if task.user_id != auth.id {
        return Err(TaskError::Unauthorized.into());
    }
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let id = Uuid::new_v4();

    tracing::debug!("Creating task '{}' for user {}", payload.title, auth.id);

    let task = Task::create(&state.db().pool, &payload, id, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    Extension(auth): Extension<AuthUser>,
    Extension(existing_task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    // Use existing values if not provided in update
    let title = payload.title.unwrap_or(existing_task.title);
    let description = match payload.description {
        Some(s) if s.trim().is_empty() => None, // Empty string = clear description
        Some(s) => Some(s),                     // Non-empty string = update description
        None => existing_task.description,      // Field omitted = keep existing
    };
    let status = payload.status.unwrap_or(existing_task.status);
    let priority = payload.priority.unwrap_or(existing_task.priority);
    let due_date = payload.due_date.or(existing_task.due_date);
    let parent_task_id = payload.parent_task_id.or(existing_task.parent_task_id);

    let task = Task::update(
        &state.db().pool,
        existing_task.id,
        auth.id,
        title,
        description,
        status,
        priority,
        due_date,
        parent_task_id,
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(task)))
}

/// Deletes the task and its whole subtree; responds with the number of
/// removed tasks.
pub async fn delete_task(
    Extension(auth): Extension<AuthUser>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let tx = state.db().pool.begin().await?;
    let deleted = Task::delete_with_descendants(&tx, task.id, auth.id).await?;
    tx.commit().await?;

    Ok(ResponseJson(ApiResponse::success(deleted)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .layer(from_fn_with_state(state.clone(), load_task_middleware::<AppState>));

    let inner = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}
