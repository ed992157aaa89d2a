use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::eta::Eta;
use crate::models::fleet::{Driver, OperatorDetails};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    Terminal1,
    Terminal2,
}

impl Terminal {
    pub fn opposite(self) -> Self {
        match self {
            Terminal::Terminal1 => Terminal::Terminal2,
            Terminal::Terminal2 => Terminal::Terminal1,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Terminal::Terminal1 => "Gensan Terminal",
            Terminal::Terminal2 => "Palimbang Terminal",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Terminal::Terminal1 => "terminal1",
            Terminal::Terminal2 => "terminal2",
        }
    }

    pub const ALL: [Terminal; 2] = [Terminal::Terminal1, Terminal::Terminal2];
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Idle,
    Queued,
    Departed,
    Arrived,
}

impl AssignmentStatus {
    /// Edges of the van lifecycle: idle -> queued -> departed -> (idle | arrived) -> idle.
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;

        matches!(
            (self, next),
            (Idle, Queued) | (Queued, Departed) | (Departed, Arrived) | (Departed, Idle) | (Arrived, Idle)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Idle => "idle",
            AssignmentStatus::Queued => "queued",
            AssignmentStatus::Departed => "departed",
            AssignmentStatus::Arrived => "arrived",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub van_driver_operator_id: Uuid,
    pub temporary_driver_id: Option<Uuid>,
    pub terminal: Terminal,
    pub status: AssignmentStatus,
    pub order: u32,
    pub assigned_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub eta: Option<Eta>,
}

impl Assignment {
    pub fn new(
        schedule_id: Uuid,
        van_driver_operator_id: Uuid,
        temporary_driver_id: Option<Uuid>,
        terminal: Terminal,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_id,
            van_driver_operator_id,
            temporary_driver_id,
            terminal,
            status: AssignmentStatus::Idle,
            order: 0,
            assigned_at,
            queued_at: None,
            departure_time: None,
            arrival_time: None,
            eta: None,
        }
    }

    pub fn is_queued_at(&self, schedule_id: Uuid, terminal: Terminal) -> bool {
        self.schedule_id == schedule_id
            && self.terminal == terminal
            && self.status == AssignmentStatus::Queued
    }
}

/// An assignment as the dispatch boards display it.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub destination: &'static str,
    pub operator: Option<OperatorDetails>,
    pub temporary_driver: Option<Driver>,
}
