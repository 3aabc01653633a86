//! ルータ全体を oneshot で叩く統合テスト

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use todo_api::{app, app_with_state, AppState};
use todo_infrastructure::SqliteTodoStore;
use tower::ServiceExt; // for `oneshot`

/// リクエストを送り、ステータスと JSON ボディ（空なら Null）を返す
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn buy_milk_lifecycle() {
    let app = app();

    let (status, created) = send(&app, "POST", "/api/todos", Some(json!({"title": "Buy milk"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Buy milk");
    assert_eq!(created["completed"], false);
    assert_eq!(created["createdAt"], created["updatedAt"]);
    let id = created["id"].as_i64().unwrap();

    let (status, toggled) = send(&app, "PATCH", &format!("/api/todos/{id}/toggle"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);

    let (_, toggled) = send(&app, "PATCH", &format!("/api/todos/{id}/toggle"), None).await;
    assert_eq!(toggled["completed"], false);

    let (status, body) = send(&app, "DELETE", &format!("/api/todos/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, error) = send(&app, "GET", &format!("/api/todos/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["id"], id);
    assert_eq!(error["error"], format!("Todo not found: {id}"));
}

#[tokio::test]
async fn subtask_lifecycle() {
    let app = app();

    let (_, parent) = send(&app, "POST", "/api/todos", Some(json!({"title": "Release"}))).await;
    let parent_id = parent["id"].as_i64().unwrap();

    let (status, step) = send(
        &app,
        "POST",
        &format!("/api/todos/{parent_id}/subtasks"),
        Some(json!({"title": "Step 1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let step_id = step["id"].as_i64().unwrap();
    assert_ne!(step_id, parent_id);
    assert_eq!(step["parentId"], parent_id);

    let (status, revised) = send(
        &app,
        "PUT",
        &format!("/api/todos/{parent_id}/subtasks/{step_id}"),
        Some(json!({"title": "Step 1 revised", "completed": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revised["title"], "Step 1 revised");

    let (status, listed) = send(&app, "GET", &format!("/api/todos/{parent_id}/subtasks"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], step_id);
    assert_eq!(listed[0]["title"], "Step 1 revised");
    assert_eq!(listed[0]["completed"], true);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/todos/{parent_id}/subtasks/{step_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = send(&app, "GET", &format!("/api/todos/{parent_id}/subtasks"), None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn list_contains_subtasks_with_parent_id() {
    let app = app();
    let (_, parent) = send(&app, "POST", "/api/todos", Some(json!({"title": "parent"}))).await;
    let parent_id = parent["id"].as_i64().unwrap();
    let (_, step) = send(
        &app,
        "POST",
        &format!("/api/todos/{parent_id}/subtasks"),
        Some(json!({"title": "Step 1"})),
    )
    .await;
    let step_id = step["id"].as_i64().unwrap();

    let (status, all) = send(&app, "GET", "/api/todos", None).await;
    assert_eq!(status, StatusCode::OK);
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 2);

    // クライアントは parentId でツリーを組み立てるため、サブタスクもレコードとして並ぶ
    let listed = all.iter().find(|t| t["id"] == step_id).unwrap();
    assert_eq!(listed["parentId"], parent_id);
    assert_eq!(listed["title"], "Step 1");

    let listed_parent = all.iter().find(|t| t["id"] == parent_id).unwrap();
    assert!(listed_parent["parentId"].is_null());
    assert_eq!(listed_parent["subtasks"][0]["id"], step_id);
}

#[tokio::test]
async fn update_and_set_completed() {
    let app = app();
    let (_, todo) = send(&app, "POST", "/api/todos", Some(json!({"title": "draft", "description": "v1"}))).await;
    let id = todo["id"].as_i64().unwrap();

    let (status, done) = send(&app, "PATCH", &format!("/api/todos/{id}"), Some(json!({"completed": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["completed"], true);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/todos/{id}"),
        Some(json!({"title": "final", "description": "v2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "final");
    assert_eq!(updated["description"], "v2");
    assert_eq!(updated["completed"], true);

    let (_, all) = send(&app, "GET", "/api/todos", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["title"], "final");
}

#[tokio::test]
async fn deleting_unknown_subtask_is_a_no_op() {
    let app = app();
    let (_, parent) = send(&app, "POST", "/api/todos", Some(json!({"title": "parent"}))).await;
    let parent_id = parent["id"].as_i64().unwrap();

    let (status, _) = send(&app, "DELETE", &format!("/api/todos/{parent_id}/subtasks/9999"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/api/todos/9999/subtasks/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn updating_unknown_subtask_is_not_found() {
    let app = app();
    let (_, parent) = send(&app, "POST", "/api/todos", Some(json!({"title": "parent"}))).await;
    let parent_id = parent["id"].as_i64().unwrap();

    let (status, error) = send(
        &app,
        "PUT",
        &format!("/api/todos/{parent_id}/subtasks/777"),
        Some(json!({"title": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["id"], 777);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = app();
    let (status, error) = send(&app, "POST", "/api/todos", Some(json!({"description": "no title"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().unwrap().starts_with("Bad request"));
}

#[tokio::test]
async fn sqlite_backed_router_cascades_parent_delete() {
    let store = Arc::new(SqliteTodoStore::open_in_memory().unwrap());
    let app = app_with_state(AppState::with_store(store));

    let (_, parent) = send(&app, "POST", "/api/todos", Some(json!({"title": "parent"}))).await;
    let parent_id = parent["id"].as_i64().unwrap();
    let (_, step) = send(
        &app,
        "POST",
        &format!("/api/todos/{parent_id}/subtasks"),
        Some(json!({"title": "child"})),
    )
    .await;
    let step_id = step["id"].as_i64().unwrap();

    let (status, _) = send(&app, "DELETE", &format!("/api/todos/{parent_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/todos/{step_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
