use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::eta::Eta;
use crate::engine::queue;
use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentStatus, AssignmentView, Terminal};
use crate::models::schedule::Schedule;
use crate::state::AppState;

/// A dispatcher at `terminal` moving assignment `id` into `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub status: AssignmentStatus,
    pub terminal: Terminal,
}

/// Applies a lifecycle transition under the queue rules.
pub fn transition(state: &AppState, change: &StatusChange, now: DateTime<Utc>) -> Result<Assignment, AppError> {
    observed(state, change, || apply_transition(state, change, now))
}

/// Applies a dispatcher correction outside the normal lifecycle.
pub fn override_status(
    state: &AppState,
    change: &StatusChange,
    now: DateTime<Utc>,
) -> Result<Assignment, AppError> {
    observed(state, change, || apply_override(state, change, now))
}

/// Queues each assignment at the back of `terminal`'s queue, in the given order.
/// Stops at the first assignment that cannot be queued.
pub fn queue_batch(
    state: &AppState,
    ids: &[Uuid],
    terminal: Terminal,
    now: DateTime<Utc>,
) -> Result<Vec<Assignment>, AppError> {
    ids.iter()
        .map(|id| {
            let change = StatusChange {
                id: *id,
                status: AssignmentStatus::Queued,
                terminal,
            };
            transition(state, &change, now)
        })
        .collect()
}

/// Today's assignments at a terminal, front of queue first.
pub fn list_assignments(
    state: &AppState,
    terminal: Terminal,
    status: Option<AssignmentStatus>,
    now: DateTime<Utc>,
) -> Result<Vec<AssignmentView>, AppError> {
    let schedule = state.todays_schedule(now)?;

    let mut assignments: Vec<Assignment> = state
        .assignments
        .iter()
        .filter(|entry| {
            let a = entry.value();
            a.schedule_id == schedule.id
                && a.terminal == terminal
                && status.is_none_or(|wanted| a.status == wanted)
        })
        .map(|entry| entry.value().clone())
        .collect();

    assignments.sort_by_key(|a| (a.order, a.assigned_at));

    Ok(assignments
        .into_iter()
        .map(|assignment| view(state, assignment))
        .collect())
}

/// Joins an assignment with its operator and any stand-in driver.
pub fn view(state: &AppState, assignment: Assignment) -> AssignmentView {
    AssignmentView {
        destination: assignment.terminal.display_name(),
        operator: state.operator_details(assignment.van_driver_operator_id),
        temporary_driver: assignment
            .temporary_driver_id
            .and_then(|id| state.drivers.get(&id).map(|d| d.value().clone())),
        assignment,
    }
}

fn observed<F>(state: &AppState, change: &StatusChange, apply: F) -> Result<Assignment, AppError>
where
    F: FnOnce() -> Result<Assignment, AppError>,
{
    let start = Instant::now();
    let result = apply();
    let outcome = if result.is_ok() { "success" } else { "rejected" };

    state
        .metrics
        .observe_transition(change.status.as_str(), outcome, start.elapsed().as_secs_f64());

    if let Err(err) = &result {
        warn!(
            assignment_id = %change.id,
            status = %change.status,
            terminal = %change.terminal,
            error = %err,
            "status change rejected"
        );
    }

    result
}

fn apply_transition(state: &AppState, change: &StatusChange, now: DateTime<Utc>) -> Result<Assignment, AppError> {
    let schedule = state.todays_schedule(now)?;
    let current = state.assignment(change.id)?;
    ensure_on_schedule(&current, &schedule)?;

    // Departures are judged by the front-of-queue rule alone.
    if change.status != AssignmentStatus::Departed && !current.status.can_transition_to(change.status) {
        return Err(AppError::InvalidTransition {
            from: current.status,
            to: change.status,
        });
    }

    match change.status {
        AssignmentStatus::Queued => enqueue(state, current, change.terminal, now),
        AssignmentStatus::Departed => depart(state, current, change.terminal, now),
        AssignmentStatus::Arrived | AssignmentStatus::Idle => {
            arrive(state, current, change.status, change.terminal, now)
        }
    }
}

fn enqueue(
    state: &AppState,
    mut assignment: Assignment,
    terminal: Terminal,
    now: DateTime<Utc>,
) -> Result<Assignment, AppError> {
    let order = queue::next_order(state, assignment.schedule_id, terminal);

    assignment.status = AssignmentStatus::Queued;
    assignment.terminal = terminal;
    assignment.order = order;
    assignment.queued_at = Some(now);
    assignment.departure_time = None;
    assignment.arrival_time = None;
    assignment.eta = Some(Eta::for_queue_position(now, order));

    Ok(commit(state, assignment, now))
}

fn depart(
    state: &AppState,
    mut assignment: Assignment,
    origin: Terminal,
    now: DateTime<Utc>,
) -> Result<Assignment, AppError> {
    let front = queue::front_of_queue(state, assignment.schedule_id, origin);
    if front.map(|a| a.id) != Some(assignment.id) {
        return Err(AppError::NotFrontOfQueue);
    }

    assignment.status = AssignmentStatus::Departed;
    assignment.terminal = origin.opposite();
    assignment.order = 0;
    assignment.departure_time = Some(now);
    assignment.arrival_time = None;
    assignment.eta = Some(Eta::for_departure(now));

    let schedule_id = assignment.schedule_id;
    let departed = commit(state, assignment, now);

    let remaining = queue::renumber(state, schedule_id, origin, now);
    queue::publish_length(state, schedule_id);
    info!(terminal = %origin, remaining, "queue recalculated after departure");

    Ok(departed)
}

/// `origin` is the terminal the van left from; it is logged at the opposite one.
fn arrive(
    state: &AppState,
    mut assignment: Assignment,
    status: AssignmentStatus,
    origin: Terminal,
    now: DateTime<Utc>,
) -> Result<Assignment, AppError> {
    let destination = origin.opposite();
    if assignment.terminal != destination {
        return Err(AppError::BadRequest(format!(
            "assignment {} is at {}, not travelling from {origin}",
            assignment.id, assignment.terminal
        )));
    }

    if assignment.status == AssignmentStatus::Departed {
        assignment.arrival_time = Some(now);
    }
    assignment.status = status;
    assignment.terminal = destination;
    if status == AssignmentStatus::Idle {
        assignment.order = 0;
        assignment.eta = None;
    }

    Ok(commit(state, assignment, now))
}

fn apply_override(state: &AppState, change: &StatusChange, now: DateTime<Utc>) -> Result<Assignment, AppError> {
    let schedule = state.todays_schedule(now)?;
    let mut assignment = state.assignment(change.id)?;
    ensure_on_schedule(&assignment, &schedule)?;

    let previous = assignment.status;
    let left_queue = (previous == AssignmentStatus::Queued).then_some(assignment.terminal);

    match change.status {
        AssignmentStatus::Departed => {
            return Err(AppError::BadRequest(
                "departures must go through the dispatch queue".to_string(),
            ));
        }
        AssignmentStatus::Idle => {
            assignment.arrival_time = Some(now);
            assignment.order = 0;
            assignment.eta = None;
        }
        AssignmentStatus::Queued => {
            if !matches!(previous, AssignmentStatus::Idle | AssignmentStatus::Arrived) {
                return Err(AppError::InvalidTransition {
                    from: previous,
                    to: change.status,
                });
            }
            queue::make_room_at_front(state, schedule.id, change.terminal, now);
            assignment.order = 1;
            assignment.queued_at = Some(now);
            assignment.departure_time = None;
            assignment.arrival_time = None;
            assignment.eta = Some(Eta::for_queue_position(now, 1));
        }
        AssignmentStatus::Arrived => {
            if previous != AssignmentStatus::Departed {
                return Err(AppError::InvalidTransition {
                    from: previous,
                    to: change.status,
                });
            }
            assignment.arrival_time = Some(now);
        }
    }

    assignment.status = change.status;
    assignment.terminal = change.terminal;
    let updated = commit(state, assignment, now);

    if let Some(terminal) = left_queue {
        if !updated.is_queued_at(schedule.id, terminal) {
            queue::renumber(state, schedule.id, terminal, now);
        }
    }
    queue::publish_length(state, schedule.id);

    Ok(updated)
}

fn ensure_on_schedule(assignment: &Assignment, schedule: &Schedule) -> Result<(), AppError> {
    if assignment.schedule_id != schedule.id {
        return Err(AppError::BadRequest(format!(
            "assignment {} is not on today's schedule",
            assignment.id
        )));
    }
    Ok(())
}

/// Writes the row, appends its single history record and refreshes the gauges.
fn commit(state: &AppState, assignment: Assignment, now: DateTime<Utc>) -> Assignment {
    state.assignments.insert(assignment.id, assignment.clone());
    let record = state.record_transition(&assignment, now);
    queue::publish_length(state, assignment.schedule_id);

    info!(
        assignment_id = %assignment.id,
        status = %assignment.status,
        terminal = %assignment.terminal,
        order = assignment.order,
        history_id = record.id,
        "assignment status changed"
    );

    assignment
}
