use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shared::{
    domain::{Task, TaskId},
    error::{ApiError, ErrorCode},
    protocol::CreateTaskRequest,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

mod config;

use config::load_settings;

struct AppState {
    tasks: Mutex<Vec<Task>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let state = Arc::new(AppState {
        tasks: Mutex::new(Vec::new()),
    });
    let app = build_router(state);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "task service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            axum::routing::put(toggle_todo).delete(delete_todo),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_todos(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.tasks.lock().await.clone())
}

async fn create_todo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>, (StatusCode, Json<ApiError>)> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                "title must not be empty",
            )),
        ));
    }

    let created = Task {
        id: TaskId::new(Uuid::new_v4().to_string()),
        title: title.to_string(),
        completed: false,
    };
    state.tasks.lock().await.push(created.clone());
    info!(id = %created.id, "task created");
    Ok(Json(created))
}

async fn toggle_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, (StatusCode, Json<ApiError>)> {
    let mut tasks = state.tasks.lock().await;
    let Some(found) = tasks.iter_mut().find(|task| task.id.as_str() == id) else {
        return Err(task_not_found(&id));
    };
    found.completed = !found.completed;
    Ok(Json(found.clone()))
}

async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let mut tasks = state.tasks.lock().await;
    let before = tasks.len();
    tasks.retain(|task| task.id.as_str() != id);
    if tasks.len() == before {
        return Err(task_not_found(&id));
    }
    Ok(StatusCode::OK)
}

fn task_not_found(id: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(
            ErrorCode::NotFound,
            format!("no task with id {id}"),
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    fn test_app() -> Router {
        build_router(Arc::new(AppState {
            tasks: Mutex::new(Vec::new()),
        }))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    async fn create_task(app: &Router, title: &str) -> Task {
        let request = Request::post("/todos")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "title": title }).to_string(),
            ))
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        read_json(response).await
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let app = test_app();
        let request = Request::get("/healthz")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(bytes.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn list_starts_empty() {
        let app = test_app();
        let request = Request::get("/todos").body(Body::empty()).expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let tasks: Vec<Task> = read_json(response).await;
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn create_assigns_an_id_and_the_task_appears_in_the_list() {
        let app = test_app();

        let created = create_task(&app, "Buy milk").await;

        assert!(!created.id.as_str().is_empty());
        assert_eq!(created.title, "Buy milk");
        assert!(!created.completed);

        let request = Request::get("/todos").body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        let tasks: Vec<Task> = read_json(response).await;
        assert_eq!(tasks, vec![created]);
    }

    #[tokio::test]
    async fn create_trims_the_title() {
        let app = test_app();

        let created = create_task(&app, "  Buy milk  ").await;

        assert_eq!(created.title, "Buy milk");
    }

    #[tokio::test]
    async fn create_rejects_a_blank_title() {
        let app = test_app();
        let request = Request::post("/todos")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "title": "   " }).to_string(),
            ))
            .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = read_json(response).await;
        assert_eq!(error.code, ErrorCode::Validation);

        let request = Request::get("/todos").body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        let tasks: Vec<Task> = read_json(response).await;
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn toggle_flips_completion_and_echoes_the_updated_task() {
        let app = test_app();
        let created = create_task(&app, "Flip me").await;

        let request = Request::put(format!("/todos/{}", created.id))
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let toggled: Task = read_json(response).await;
        assert!(toggled.completed);
        assert_eq!(toggled.id, created.id);

        let request = Request::put(format!("/todos/{}", created.id))
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let toggled: Task = read_json(response).await;
        assert!(!toggled.completed);
    }

    #[tokio::test]
    async fn toggle_of_an_unknown_id_is_not_found() {
        let app = test_app();
        let request = Request::put("/todos/missing")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ApiError = read_json(response).await;
        assert_eq!(error.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn delete_removes_the_task() {
        let app = test_app();
        let created = create_task(&app, "Remove me").await;

        let request = Request::delete(format!("/todos/{}", created.id))
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::get("/todos").body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        let tasks: Vec<Task> = read_json(response).await;
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn delete_of_an_unknown_id_is_not_found() {
        let app = test_app();
        let request = Request::delete("/todos/missing")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
