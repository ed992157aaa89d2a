use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::eta::Eta;
use crate::models::assignment::{Assignment, AssignmentStatus, Terminal};
use crate::state::AppState;

/// Position a van joining the back of the queue would take.
pub fn next_order(state: &AppState, schedule_id: Uuid, terminal: Terminal) -> u32 {
    state.queue(schedule_id, terminal).len() as u32 + 1
}

pub fn front_of_queue(state: &AppState, schedule_id: Uuid, terminal: Terminal) -> Option<Assignment> {
    state.queue(schedule_id, terminal).into_iter().next()
}

/// Closes gaps so the queue reads 1..=n again, with ETAs re-anchored at `now`.
pub fn renumber(state: &AppState, schedule_id: Uuid, terminal: Terminal, now: DateTime<Utc>) -> usize {
    let queued = state.queue(schedule_id, terminal);
    reposition(state, &queued, 1, now);
    queued.len()
}

/// Pushes every queued van back one place so order 1 is free.
pub fn make_room_at_front(state: &AppState, schedule_id: Uuid, terminal: Terminal, now: DateTime<Utc>) {
    let queued = state.queue(schedule_id, terminal);
    reposition(state, &queued, 2, now);
}

pub fn publish_length(state: &AppState, schedule_id: Uuid) {
    for terminal in Terminal::ALL {
        let len = state.queue(schedule_id, terminal).len();
        state.metrics.set_queue_length(terminal, len);
    }
}

// Rows are written one at a time; a reader may see the queue half renumbered.
fn reposition(state: &AppState, entries: &[Assignment], first_order: u32, now: DateTime<Utc>) {
    for (offset, entry) in entries.iter().enumerate() {
        let order = first_order + offset as u32;

        if let Some(mut row) = state.assignments.get_mut(&entry.id) {
            if row.status != AssignmentStatus::Queued {
                continue;
            }
            row.order = order;
            row.eta = Some(Eta::for_queue_position(now, order));
        }
    }
}
