use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{AssignmentStatus, Terminal};
use crate::models::fleet::OperatorDetails;
use crate::models::history::AssignmentHistory;
use crate::state::AppState;

const RECENT_WINDOW_DAYS: i64 = 10;

/// Half-open window `[start, end)` of history timestamps; missing bounds are open.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whole terminal-local days from `start_date` through `end_date`.
    pub fn from_local_dates(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        offset: FixedOffset,
    ) -> Result<Self, AppError> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(AppError::BadRequest(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }

        let start = start_date.map(|d| local_midnight(d, offset)).transpose()?;
        let end = end_date
            .map(|d| {
                let next = d.succ_opt().ok_or_else(|| {
                    AppError::BadRequest(format!("end date {d} is out of range"))
                })?;
                local_midnight(next, offset)
            })
            .transpose()?;

        Ok(Self { start, end })
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at < end)
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>, AppError> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| AppError::BadRequest(format!("date {date} is out of range")))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripSummary {
    pub round_trips: usize,
    pub average_trip_minutes: f64,
}

/// A trip is a record at terminal1 immediately followed by one at terminal2.
pub fn summarize_trips(records: &[AssignmentHistory]) -> TripSummary {
    let durations: Vec<Duration> = records
        .windows(2)
        .filter(|pair| pair[0].terminal == Terminal::Terminal1 && pair[1].terminal == Terminal::Terminal2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect();

    let average_trip_minutes = if durations.is_empty() {
        0.0
    } else {
        let total_ms: i64 = durations.iter().map(Duration::num_milliseconds).sum();
        total_ms as f64 / durations.len() as f64 / 60_000.0
    };

    TripSummary {
        round_trips: durations.len(),
        average_trip_minutes,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalCount {
    pub terminal: Terminal,
    pub count: usize,
}

/// Records per terminal, busiest first.
pub fn count_by_terminal(records: &[AssignmentHistory]) -> Vec<TerminalCount> {
    let mut counts: Vec<TerminalCount> = Terminal::ALL
        .iter()
        .map(|&terminal| TerminalCount {
            terminal,
            count: records.iter().filter(|r| r.terminal == terminal).count(),
        })
        .filter(|c| c.count > 0)
        .collect();

    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.terminal.as_str().cmp(b.terminal.as_str())));
    counts
}

pub fn operators(state: &AppState) -> Vec<OperatorDetails> {
    let ids: Vec<Uuid> = state.operators.iter().map(|entry| *entry.key()).collect();
    let mut operators: Vec<OperatorDetails> = ids
        .into_iter()
        .filter_map(|id| state.operator_details(id))
        .collect();

    operators.sort_by(|a, b| a.van.plate_number.cmp(&b.van.plate_number));
    operators
}

#[derive(Debug, Clone, Serialize)]
pub struct OperatorHistory {
    pub operator: OperatorDetails,
    pub history: Vec<AssignmentHistory>,
    pub summary: TripSummary,
}

pub fn operator_history(state: &AppState, operator_id: Uuid, range: DateRange) -> Result<OperatorHistory, AppError> {
    let operator = state
        .operator_details(operator_id)
        .ok_or_else(|| AppError::NotFound(format!("operator {operator_id} not found")))?;

    let history: Vec<AssignmentHistory> = state
        .history_sorted()
        .into_iter()
        .filter(|r| r.van_driver_operator_id == operator_id && range.contains(r.timestamp))
        .collect();

    let summary = summarize_trips(&history);

    Ok(OperatorHistory {
        operator,
        history,
        summary,
    })
}

pub fn terminal_stats(
    state: &AppState,
    range: DateRange,
    event: Option<AssignmentStatus>,
) -> Vec<TerminalCount> {
    let records: Vec<AssignmentHistory> = state
        .history_sorted()
        .into_iter()
        .filter(|r| range.contains(r.timestamp) && event.is_none_or(|e| r.event == e))
        .collect();

    count_by_terminal(&records)
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentDriverEntry {
    #[serde(flatten)]
    pub record: AssignmentHistory,
    pub operator: Option<OperatorDetails>,
}

pub fn recent_drivers(state: &AppState, now: DateTime<Utc>) -> Vec<RecentDriverEntry> {
    let range = DateRange::since(now - Duration::days(RECENT_WINDOW_DAYS));

    state
        .history_sorted()
        .into_iter()
        .filter(|r| range.contains(r.timestamp))
        .map(|record| RecentDriverEntry {
            operator: state.operator_details(record.van_driver_operator_id),
            record,
        })
        .collect()
}
