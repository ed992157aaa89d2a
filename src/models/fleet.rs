use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Van {
    pub id: Uuid,
    pub plate_number: String,
    pub created_at: DateTime<Utc>,
}

/// A van paired with its regular driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VanDriverOperator {
    pub id: Uuid,
    pub van_id: Uuid,
    pub driver_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// An operator joined with its van and regular driver.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorDetails {
    pub id: Uuid,
    pub van: Van,
    pub driver: Driver,
}
