use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use objstore_core::{Error, ObjectId, ObjectRef};
use objstore_engine::ObjectStore;

use crate::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
struct AppState {
    store: Arc<ObjectStore>,
}

#[derive(Deserialize)]
struct CreateParams {
    #[serde(default)]
    path: Option<String>,
}

/// Build the axum router for the object API.
pub fn build_router(store: Arc<ObjectStore>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_info))
        .route("/objects", get(list_objects).post(create_object))
        .route(
            "/objects/*path",
            get(read_by_path).put(update_by_path).delete(delete_by_path),
        )
        .route(
            "/ids/:id",
            get(read_by_id).put(update_by_id).delete(delete_by_id),
        )
        .route("/ids/:id/meta", get(stat_by_id))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { store })
}

/// GET /health - service info
async fn handle_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "objstore",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok"
    }))
}

/// GET /objects - list index records
async fn list_objects(State(state): State<AppState>) -> ApiResult<Response> {
    let records = state.store.list_objects().await?;
    Ok(Json(records).into_response())
}

/// POST /objects?path=... - create an object from the raw request body
async fn create_object(
    State(state): State<AppState>,
    Query(params): Query<CreateParams>,
    body: Bytes,
) -> ApiResult<Response> {
    let path = params
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::Validation("missing 'path' query parameter".to_string()))?;

    let id = state.store.create_object(&path, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "path": path,
        })),
    )
        .into_response())
}

async fn read_by_path(State(state): State<AppState>, Path(path): Path<String>) -> ApiResult<Response> {
    read(&state, ObjectRef::Path(path)).await
}

async fn update_by_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    update(&state, ObjectRef::Path(path), &body).await
}

async fn delete_by_path(State(state): State<AppState>, Path(path): Path<String>) -> ApiResult<Response> {
    delete(&state, ObjectRef::Path(path)).await
}

async fn read_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    read(&state, ObjectRef::Id(ObjectId::parse(&id)?)).await
}

async fn update_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    update(&state, ObjectRef::Id(ObjectId::parse(&id)?), &body).await
}

async fn delete_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    delete(&state, ObjectRef::Id(ObjectId::parse(&id)?)).await
}

/// GET /ids/:id/meta - index record for an id
async fn stat_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let object = ObjectRef::Id(ObjectId::parse(&id)?);
    let record = state.store.stat_object(&object).await?;
    Ok(Json(record).into_response())
}

async fn read(state: &AppState, object: ObjectRef) -> ApiResult<Response> {
    let data = state.store.read_object(&object).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response())
}

async fn update(state: &AppState, object: ObjectRef, body: &[u8]) -> ApiResult<Response> {
    state.store.update_object(&object, body).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Updated object {}", object)
    }))
    .into_response())
}

async fn delete(state: &AppState, object: ObjectRef) -> ApiResult<Response> {
    state.store.delete_object(&object).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Deleted object {}", object)
    }))
    .into_response())
}
