use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Gap between consecutive departures from one terminal.
pub const DEPARTURE_INTERVAL_MINUTES: i64 = 30;
/// Terminal-to-terminal travel time.
pub const TRAVEL_TIME_HOURS: i64 = 3;

pub fn departure_interval() -> Duration {
    Duration::minutes(DEPARTURE_INTERVAL_MINUTES)
}

pub fn travel_time() -> Duration {
    Duration::hours(TRAVEL_TIME_HOURS)
}

/// Estimated departure and arrival of one van.
///
/// Only constructible from a departure instant, so the arrival estimate is
/// always exactly one travel time after the departure estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEta")]
pub struct Eta {
    estimated_departure_time: DateTime<Utc>,
    estimated_arrival_time: DateTime<Utc>,
}

impl Eta {
    fn from_departure(departure: DateTime<Utc>) -> Self {
        Self {
            estimated_departure_time: departure,
            estimated_arrival_time: departure + travel_time(),
        }
    }

    /// ETA for the van at `order` in a queue anchored at `anchor`.
    pub fn for_queue_position(anchor: DateTime<Utc>, order: u32) -> Self {
        Self::from_departure(anchor + departure_interval() * order as i32)
    }

    /// ETA for a van that left at `departed_at`.
    pub fn for_departure(departed_at: DateTime<Utc>) -> Self {
        Self::from_departure(departed_at)
    }

    pub fn estimated_departure_time(&self) -> DateTime<Utc> {
        self.estimated_departure_time
    }

    pub fn estimated_arrival_time(&self) -> DateTime<Utc> {
        self.estimated_arrival_time
    }
}

#[derive(Deserialize)]
struct RawEta {
    estimated_departure_time: DateTime<Utc>,
    estimated_arrival_time: DateTime<Utc>,
}

impl TryFrom<RawEta> for Eta {
    type Error = String;

    fn try_from(raw: RawEta) -> Result<Self, Self::Error> {
        let eta = Eta::from_departure(raw.estimated_departure_time);
        if eta.estimated_arrival_time != raw.estimated_arrival_time {
            return Err(format!(
                "estimated arrival must be {TRAVEL_TIME_HOURS}h after estimated departure"
            ));
        }
        Ok(eta)
    }
}
