//! REST surface.
//!
//! ```text
//! POST   /auth/login
//! GET    /tenants                                   POST /tenants/sync
//! DELETE /tenants/{id}                              GET  /tenants/{id}/snapshot
//! GET    /tenants/{id}/resources/{key}              POST /tenants/{id}/resources/{key}
//! DELETE /tenants/{id}/resources/{key}/{recordId}
//! GET    /health
//! ```
//!
//! The `/api/...` routes answer in the shapes older frontend builds expect.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use campus_core::errors::CampusError;
use campus_core::{LoginRequest, TenantContext};
use serde_json::{json, Value};
use tracing::info;

use crate::error::map_json_rejection;
use crate::{CampusAxumError, CampusAxumState};

type ApiResult = Result<Json<Value>, CampusAxumError>;

fn tenant(id: String) -> Result<TenantContext, CampusAxumError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CampusError::bad_request("School id must not be empty").into());
    }
    Ok(TenantContext::new(id))
}

async fn login(
    State(state): State<CampusAxumState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = body.map_err(map_json_rejection)?;
    let services = state.app.services()?;
    let principal = services.auth.authenticate(&request).await?;
    Ok(Json(json!({"success": true, "user": principal})))
}

async fn list_tenants(State(state): State<CampusAxumState>) -> ApiResult {
    let tenants = state.app.services()?.tenants.list().await?;
    Ok(Json(json!({"success": true, "tenants": tenants})))
}

async fn sync_tenants(
    State(state): State<CampusAxumState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(map_json_rejection)?;
    let records = match body {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return Err(CampusError::bad_request("Expected a school or a list of schools").into()),
    };

    let outcome = state.app.services()?.tenants.sync(records).await?;
    info!(written = outcome.written, "http.tenants_synced");
    Ok(Json(json!({"success": true, "written": outcome.written})))
}

async fn remove_tenant(State(state): State<CampusAxumState>, Path(id): Path<String>) -> ApiResult {
    state.app.services()?.tenants.remove(&id).await?;
    Ok(Json(json!({"success": true})))
}

async fn snapshot(State(state): State<CampusAxumState>, Path(id): Path<String>) -> ApiResult {
    let ctx = tenant(id)?;
    let data = state.app.services()?.tenants.snapshot(&ctx).await?;
    Ok(Json(json!({"success": true, "data": data})))
}

async fn read_resource(
    State(state): State<CampusAxumState>,
    Path((id, key)): Path<(String, String)>,
) -> ApiResult {
    let ctx = tenant(id)?;
    let data = state.app.services()?.resources.read(&ctx, &key).await?;
    Ok(Json(json!({"success": true, "data": data})))
}

async fn write_resource(
    State(state): State<CampusAxumState>,
    Path((id, key)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(payload) = body.map_err(map_json_rejection)?;
    let ctx = tenant(id)?;
    let outcome = state.app.services()?.resources.write(&ctx, &key, payload).await?;
    Ok(Json(json!({
        "success": true,
        "written": outcome.written,
        "target": outcome.target,
    })))
}

async fn remove_record(
    State(state): State<CampusAxumState>,
    Path((id, key, record_id)): Path<(String, String, String)>,
) -> ApiResult {
    let ctx = tenant(id)?;
    state.app.services()?.resources.remove(&ctx, &key, &record_id).await?;
    Ok(Json(json!({"success": true})))
}

async fn health(State(state): State<CampusAxumState>) -> Json<Value> {
    let storage = if state.app.is_connected() { "connected" } else { "disconnected" };
    Json(json!({
        "success": true,
        "storage": storage,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn legacy_schools(State(state): State<CampusAxumState>) -> ApiResult {
    let tenants = state.app.services()?.tenants.list().await?;
    Ok(Json(Value::Array(tenants)))
}

async fn legacy_full_data(State(state): State<CampusAxumState>, Path(id): Path<String>) -> ApiResult {
    let ctx = tenant(id)?;
    Ok(Json(state.app.services()?.tenants.snapshot(&ctx).await?))
}

async fn legacy_sync(
    State(state): State<CampusAxumState>,
    Path((id, key)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(payload) = body.map_err(map_json_rejection)?;
    let ctx = tenant(id)?;
    state.app.services()?.resources.write(&ctx, &key, payload).await?;
    Ok(Json(json!({"success": true})))
}

pub fn campus_router(state: CampusAxumState) -> Router<()> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/tenants", get(list_tenants))
        .route("/tenants/sync", post(sync_tenants))
        .route("/tenants/{id}", delete(remove_tenant))
        .route("/tenants/{id}/snapshot", get(snapshot))
        .route("/tenants/{id}/resources/{key}", get(read_resource).post(write_resource))
        .route("/tenants/{id}/resources/{key}/{record_id}", delete(remove_record))
        .route("/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/schools", get(legacy_schools))
        .route("/api/school/{id}/full-data", get(legacy_full_data))
        .route("/api/school/{id}/sync/{key}", post(legacy_sync))
        .with_state(state)
}
