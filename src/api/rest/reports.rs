use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::get;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::report::{self, DateRange, OperatorHistory, RecentDriverEntry, TerminalCount};
use crate::error::AppError;
use crate::models::assignment::AssignmentStatus;
use crate::models::fleet::OperatorDetails;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports/operators", get(operators))
        .route("/reports/history", get(operator_history))
        .route("/reports/terminals", get(terminal_stats))
        .route("/reports/recent-drivers", get(recent_drivers))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub operator_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct TerminalQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<AssignmentStatus>,
}

async fn operators(State(state): State<Arc<AppState>>) -> Json<Vec<OperatorDetails>> {
    Json(report::operators(&state))
}

async fn operator_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<OperatorHistory>, AppError> {
    let range = DateRange::from_local_dates(query.start_date, query.end_date, state.terminal_utc_offset)?;
    let history = report::operator_history(&state, query.operator_id, range)?;
    Ok(Json(history))
}

async fn terminal_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TerminalQuery>,
) -> Result<Json<Vec<TerminalCount>>, AppError> {
    let range = DateRange::from_local_dates(query.start_date, query.end_date, state.terminal_utc_offset)?;
    Ok(Json(report::terminal_stats(&state, range, query.status)))
}

async fn recent_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<RecentDriverEntry>> {
    Json(report::recent_drivers(&state, Utc::now()))
}
