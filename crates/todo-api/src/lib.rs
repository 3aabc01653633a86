//! 階層型 Todo の HTTP API（axum）
//!
//! ルーティングと JSON の出し入れのみを担い、業務規則は
//! [`service::TodoService`] に集約しています。

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, put},
    Router,
};
use std::sync::Arc;
use todo_domain::{Clock, SystemClock};
use todo_infrastructure::{InMemoryTodoStore, TodoStore};

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod service;

pub use error::ApiError;
pub use service::TodoService;

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    service: Arc<TodoService>,
}

impl AppState {
    pub fn new(service: TodoService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// 任意のストアとシステム時計で構築
    pub fn with_store(store: Arc<dyn TodoStore>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(TodoService::new(store, clock))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_store(Arc::new(InMemoryTodoStore::new()))
    }
}

/// InMemory ストアでルータを構築
pub fn app() -> Router {
    app_with_state(AppState::default())
}

/// 外部から状態を注入できる版
pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/api/todos/:id",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .patch(handlers::set_completed)
                .delete(handlers::delete_todo),
        )
        .route("/api/todos/:id/toggle", patch(handlers::toggle_todo))
        .route(
            "/api/todos/:id/subtasks",
            get(handlers::list_subtasks).post(handlers::add_subtask),
        )
        .route(
            "/api/todos/:id/subtasks/:subtask_id",
            put(handlers::update_subtask).delete(handlers::delete_subtask),
        )
        .layer(axum_middleware::from_fn(middleware::cors))
        .layer(axum_middleware::from_fn(middleware::log_request))
        .with_state(state)
}
