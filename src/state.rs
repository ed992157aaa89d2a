use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{Assignment, Terminal};
use crate::models::fleet::{Driver, OperatorDetails, Van, VanDriverOperator};
use crate::models::history::AssignmentHistory;
use crate::models::schedule::Schedule;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub schedules: DashMap<Uuid, Schedule>,
    pub drivers: DashMap<Uuid, Driver>,
    pub vans: DashMap<Uuid, Van>,
    pub operators: DashMap<Uuid, VanDriverOperator>,
    pub assignments: DashMap<Uuid, Assignment>,
    pub history: DashMap<u64, AssignmentHistory>,
    pub history_events_tx: broadcast::Sender<AssignmentHistory>,
    pub metrics: Metrics,
    pub terminal_utc_offset: FixedOffset,
    history_seq: AtomicU64,
}

impl AppState {
    pub fn new(event_buffer_size: usize, terminal_utc_offset: FixedOffset) -> Self {
        let (history_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            schedules: DashMap::new(),
            drivers: DashMap::new(),
            vans: DashMap::new(),
            operators: DashMap::new(),
            assignments: DashMap::new(),
            history: DashMap::new(),
            history_events_tx,
            metrics: Metrics::new(),
            terminal_utc_offset,
            history_seq: AtomicU64::new(1),
        }
    }

    /// Calendar date of `now` at the terminals.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.terminal_utc_offset).date_naive()
    }

    pub fn schedule_for_date(&self, date: NaiveDate) -> Option<Schedule> {
        self.schedules
            .iter()
            .find(|entry| entry.value().date == date)
            .map(|entry| entry.value().clone())
    }

    pub fn todays_schedule(&self, now: DateTime<Utc>) -> Result<Schedule, AppError> {
        self.schedule_for_date(self.local_date(now))
            .ok_or(AppError::NoScheduleToday)
    }

    pub fn assignment(&self, id: Uuid) -> Result<Assignment, AppError> {
        self.assignments
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("assignment {id} not found")))
    }

    pub fn operator_details(&self, id: Uuid) -> Option<OperatorDetails> {
        let operator = self.operators.get(&id)?.value().clone();
        let van = self.vans.get(&operator.van_id)?.value().clone();
        let driver = self.drivers.get(&operator.driver_id)?.value().clone();

        Some(OperatorDetails {
            id: operator.id,
            van,
            driver,
        })
    }

    /// Queued assignments of a schedule at a terminal, front of queue first.
    pub fn queue(&self, schedule_id: Uuid, terminal: Terminal) -> Vec<Assignment> {
        let mut queued: Vec<Assignment> = self
            .assignments
            .iter()
            .filter(|entry| entry.value().is_queued_at(schedule_id, terminal))
            .map(|entry| entry.value().clone())
            .collect();

        queued.sort_by_key(|a| (a.order, a.queued_at));
        queued
    }

    /// Appends one history record for the assignment's current status and
    /// publishes it to subscribers.
    pub fn record_transition(&self, assignment: &Assignment, at: DateTime<Utc>) -> AssignmentHistory {
        let record = AssignmentHistory {
            id: self.history_seq.fetch_add(1, Ordering::Relaxed),
            assignment_id: assignment.id,
            van_driver_operator_id: assignment.van_driver_operator_id,
            temporary_driver_id: assignment.temporary_driver_id,
            event: assignment.status,
            terminal: assignment.terminal,
            timestamp: at,
        };

        self.history.insert(record.id, record.clone());
        let _ = self.history_events_tx.send(record.clone());
        record
    }

    /// History records ordered by timestamp, then sequence.
    pub fn history_sorted(&self) -> Vec<AssignmentHistory> {
        let mut records: Vec<AssignmentHistory> = self
            .history
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by_key(|r| (r.timestamp, r.id));
        records
    }
}
