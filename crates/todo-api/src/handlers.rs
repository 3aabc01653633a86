//! HTTP ハンドラ
//!
//! 各ハンドラは入力を取り出してサービスへ 1:1 で委譲するだけ。
//! サービスはストア I/O を伴う同期処理なので blocking スレッドで実行する。

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use todo_domain::{CompletionChange, SubtaskChanges, Todo, TodoFields, TodoId, TodoResult};

use crate::error::ApiError;
use crate::service::TodoService;
use crate::AppState;

type TodoPath = Result<Path<i64>, PathRejection>;
type SubtaskPath = Result<Path<(i64, i64)>, PathRejection>;

async fn run<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&TodoService) -> TodoResult<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    let result = tokio::task::spawn_blocking(move || op(&*service)).await?;
    Ok(result?)
}

fn todo_id(path: TodoPath) -> Result<TodoId, ApiError> {
    let Path(id) = path?;
    Ok(TodoId::new(id))
}

fn subtask_ids(path: SubtaskPath) -> Result<(TodoId, TodoId), ApiError> {
    let Path((parent_id, subtask_id)) = path?;
    Ok((TodoId::new(parent_id), TodoId::new(subtask_id)))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

/// ヘルスチェック
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthBody { status: "ok" }))
}

/// GET /api/todos
pub async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = run(&state, |s| s.list_all()).await?;
    Ok(Json(todos))
}

/// GET /api/todos/{id}
pub async fn get_todo(
    State(state): State<AppState>,
    path: TodoPath,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(path)?;
    let todo = run(&state, move |s| s.get_by_id(id)).await?;
    Ok(Json(todo))
}

/// POST /api/todos
pub async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<TodoFields>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(fields) = body?;
    let todo = run(&state, move |s| s.create(fields)).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// PUT /api/todos/{id}
pub async fn update_todo(
    State(state): State<AppState>,
    path: TodoPath,
    body: Result<Json<TodoFields>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(path)?;
    let Json(fields) = body?;
    let todo = run(&state, move |s| s.update(id, fields)).await?;
    Ok(Json(todo))
}

/// PATCH /api/todos/{id}/toggle
pub async fn toggle_todo(
    State(state): State<AppState>,
    path: TodoPath,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(path)?;
    let todo = run(&state, move |s| s.toggle(id)).await?;
    Ok(Json(todo))
}

/// PATCH /api/todos/{id}（completed を設定）
pub async fn set_completed(
    State(state): State<AppState>,
    path: TodoPath,
    body: Result<Json<CompletionChange>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = todo_id(path)?;
    let Json(change) = body?;
    let todo = run(&state, move |s| s.set_completed(id, change.completed)).await?;
    Ok(Json(todo))
}

/// DELETE /api/todos/{id}
pub async fn delete_todo(
    State(state): State<AppState>,
    path: TodoPath,
) -> Result<StatusCode, ApiError> {
    let id = todo_id(path)?;
    run(&state, move |s| s.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/todos/{parentId}/subtasks
pub async fn list_subtasks(
    State(state): State<AppState>,
    path: TodoPath,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let parent_id = todo_id(path)?;
    let subtasks = run(&state, move |s| s.list_subtasks(parent_id)).await?;
    Ok(Json(subtasks))
}

/// POST /api/todos/{parentId}/subtasks
pub async fn add_subtask(
    State(state): State<AppState>,
    path: TodoPath,
    body: Result<Json<TodoFields>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let parent_id = todo_id(path)?;
    let Json(fields) = body?;
    let subtask = run(&state, move |s| s.add_subtask(parent_id, fields)).await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

/// PUT /api/todos/{parentId}/subtasks/{subtaskId}
pub async fn update_subtask(
    State(state): State<AppState>,
    path: SubtaskPath,
    body: Result<Json<SubtaskChanges>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let (parent_id, subtask_id) = subtask_ids(path)?;
    let Json(changes) = body?;
    let subtask = run(&state, move |s| s.update_subtask(parent_id, subtask_id, changes)).await?;
    Ok(Json(subtask))
}

/// DELETE /api/todos/{parentId}/subtasks/{subtaskId}
pub async fn delete_subtask(
    State(state): State<AppState>,
    path: SubtaskPath,
) -> Result<StatusCode, ApiError> {
    let (parent_id, subtask_id) = subtask_ids(path)?;
    run(&state, move |s| s.delete_subtask(parent_id, subtask_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
