use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentView, Terminal};
use crate::models::schedule::Schedule;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/schedules/:id", get(get_schedule).delete(delete_schedule))
        .route("/schedules/:id/assignments", post(assign_operators))
}

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Deserialize)]
pub struct AssignOperatorsRequest {
    pub van_driver_operator_ids: Vec<Uuid>,
    pub terminal: Terminal,
    /// Operator id -> driver standing in for the regular driver.
    #[serde(default)]
    pub temporary_drivers: HashMap<Uuid, Uuid>,
}

#[derive(Serialize)]
pub struct ScheduleView {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub assignments: Vec<AssignmentView>,
}

#[derive(Serialize)]
pub struct DeleteScheduleResponse {
    pub message: &'static str,
    pub removed_assignments: usize,
}

fn schedule_view(state: &AppState, schedule: Schedule) -> ScheduleView {
    let mut assignments: Vec<Assignment> = state
        .assignments
        .iter()
        .filter(|entry| entry.value().schedule_id == schedule.id)
        .map(|entry| entry.value().clone())
        .collect();
    assignments.sort_by_key(|a| (a.terminal.as_str(), a.order, a.assigned_at));

    ScheduleView {
        assignments: assignments
            .into_iter()
            .map(|a| dispatch::view(state, a))
            .collect(),
        schedule,
    }
}

async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<Json<Schedule>, AppError> {
    if payload.start_time >= payload.end_time {
        return Err(AppError::BadRequest(
            "start_time must be before end_time".to_string(),
        ));
    }

    if state.schedule_for_date(payload.date).is_some() {
        return Err(AppError::Conflict(format!(
            "a schedule for {} already exists",
            payload.date
        )));
    }

    let schedule = Schedule {
        id: Uuid::new_v4(),
        date: payload.date,
        start_time: payload.start_time,
        end_time: payload.end_time,
        created_at: Utc::now(),
    };

    state.schedules.insert(schedule.id, schedule.clone());
    info!(schedule_id = %schedule.id, date = %schedule.date, "schedule created");
    Ok(Json(schedule))
}

async fn list_schedules(State(state): State<Arc<AppState>>) -> Json<Vec<ScheduleView>> {
    let mut schedules: Vec<Schedule> = state
        .schedules
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    schedules.sort_by_key(|s| s.date);

    Json(
        schedules
            .into_iter()
            .map(|s| schedule_view(&state, s))
            .collect(),
    )
}

async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleView>, AppError> {
    let schedule = state
        .schedules
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("schedule {id} not found")))?;

    Ok(Json(schedule_view(&state, schedule)))
}

/// Removes the schedule and its assignments. History is kept.
async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteScheduleResponse>, AppError> {
    state
        .schedules
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("schedule {id} not found")))?;

    let before = state.assignments.len();
    state
        .assignments
        .retain(|_, assignment| assignment.schedule_id != id);
    let removed_assignments = before.saturating_sub(state.assignments.len());

    info!(schedule_id = %id, removed_assignments, "schedule removed");
    Ok(Json(DeleteScheduleResponse {
        message: "Schedule removed successfully",
        removed_assignments,
    }))
}

async fn assign_operators(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignOperatorsRequest>,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    if !state.schedules.contains_key(&id) {
        return Err(AppError::NotFound(format!("schedule {id} not found")));
    }
    if payload.van_driver_operator_ids.is_empty() {
        return Err(AppError::BadRequest(
            "van_driver_operator_ids cannot be empty".to_string(),
        ));
    }

    let mut requested = HashSet::new();
    for operator_id in &payload.van_driver_operator_ids {
        if !requested.insert(*operator_id) {
            return Err(AppError::BadRequest(format!(
                "operator {operator_id} listed more than once"
            )));
        }
        if !state.operators.contains_key(operator_id) {
            return Err(AppError::NotFound(format!("operator {operator_id} not found")));
        }
        if let Some(driver_id) = payload.temporary_drivers.get(operator_id) {
            if !state.drivers.contains_key(driver_id) {
                return Err(AppError::NotFound(format!("driver {driver_id} not found")));
            }
        }
    }

    let already_assigned: Vec<Uuid> = state
        .assignments
        .iter()
        .filter(|entry| {
            entry.value().schedule_id == id && requested.contains(&entry.value().van_driver_operator_id)
        })
        .map(|entry| entry.value().van_driver_operator_id)
        .collect();
    if !already_assigned.is_empty() {
        return Err(AppError::Conflict(
            "Some van driver operators are already assigned to this schedule.".to_string(),
        ));
    }

    let now = Utc::now();
    let created: Vec<AssignmentView> = payload
        .van_driver_operator_ids
        .iter()
        .map(|operator_id| {
            let assignment = Assignment::new(
                id,
                *operator_id,
                payload.temporary_drivers.get(operator_id).copied(),
                payload.terminal,
                now,
            );
            state.assignments.insert(assignment.id, assignment.clone());
            dispatch::view(&state, assignment)
        })
        .collect();

    info!(
        schedule_id = %id,
        terminal = %payload.terminal,
        count = created.len(),
        "operators assigned"
    );
    Ok(Json(created))
}
