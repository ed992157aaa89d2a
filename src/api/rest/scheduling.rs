use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::dispatch::{self, StatusChange};
use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentStatus, AssignmentView, Terminal};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/scheduling",
            get(list_assignments)
                .put(change_status)
                .patch(override_status),
        )
        .route("/scheduling/queue", post(queue_selected))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub terminal: Option<Terminal>,
    pub status: Option<AssignmentStatus>,
}

#[derive(Deserialize)]
pub struct QueueSelectedRequest {
    pub ids: Vec<Uuid>,
    pub terminal: Terminal,
}

#[derive(Serialize)]
pub struct StatusChangeResponse {
    pub message: &'static str,
    pub assignment: Assignment,
}

async fn list_assignments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    let terminal = query
        .terminal
        .ok_or_else(|| AppError::BadRequest("Valid terminal parameter is required".to_string()))?;

    let assignments = dispatch::list_assignments(&state, terminal, query.status, Utc::now())?;
    Ok(Json(assignments))
}

async fn change_status(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StatusChange>,
) -> Result<Json<StatusChangeResponse>, AppError> {
    let assignment = dispatch::transition(&state, &payload, Utc::now())?;

    Ok(Json(StatusChangeResponse {
        message: "Updated successfully",
        assignment,
    }))
}

async fn override_status(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StatusChange>,
) -> Result<Json<StatusChangeResponse>, AppError> {
    let assignment = dispatch::override_status(&state, &payload, Utc::now())?;

    Ok(Json(StatusChangeResponse {
        message: "Updated successfully",
        assignment,
    }))
}

async fn queue_selected(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueueSelectedRequest>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::BadRequest("ids cannot be empty".to_string()));
    }

    let queued = dispatch::queue_batch(&state, &payload.ids, payload.terminal, Utc::now())?;
    Ok(Json(queued))
}
