use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::assignment::{AssignmentStatus, Terminal};

/// One status transition. Records are append-only and outlive their schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentHistory {
    pub id: u64,
    pub assignment_id: Uuid,
    pub van_driver_operator_id: Uuid,
    pub temporary_driver_id: Option<Uuid>,
    pub event: AssignmentStatus,
    pub terminal: Terminal,
    pub timestamp: DateTime<Utc>,
}
