use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::fleet::{Driver, OperatorDetails, Van, VanDriverOperator};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route("/vans", get(list_vans).post(create_van))
        .route("/operators", get(list_operators).post(create_operator))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub firstname: String,
    pub lastname: String,
    pub contact: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateVanRequest {
    pub plate_number: String,
}

#[derive(Deserialize)]
pub struct CreateOperatorRequest {
    pub van_id: Uuid,
    pub driver_id: Uuid,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    let firstname = payload.firstname.trim();
    let lastname = payload.lastname.trim();
    if firstname.is_empty() || lastname.is_empty() {
        return Err(AppError::BadRequest(
            "firstname and lastname cannot be empty".to_string(),
        ));
    }

    let driver = Driver {
        id: Uuid::new_v4(),
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        contact: payload.contact.filter(|c| !c.trim().is_empty()),
        created_at: Utc::now(),
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    let mut drivers: Vec<Driver> = state
        .drivers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    drivers.sort_by(|a, b| (&a.lastname, &a.firstname).cmp(&(&b.lastname, &b.firstname)));
    Json(drivers)
}

async fn create_van(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVanRequest>,
) -> Result<Json<Van>, AppError> {
    let plate_number = payload.plate_number.trim().to_uppercase();
    if plate_number.is_empty() {
        return Err(AppError::BadRequest("plate_number cannot be empty".to_string()));
    }

    let taken = state
        .vans
        .iter()
        .any(|entry| entry.value().plate_number == plate_number);
    if taken {
        return Err(AppError::Conflict(format!(
            "van with plate number {plate_number} already exists"
        )));
    }

    let van = Van {
        id: Uuid::new_v4(),
        plate_number,
        created_at: Utc::now(),
    };

    state.vans.insert(van.id, van.clone());
    Ok(Json(van))
}

async fn list_vans(State(state): State<Arc<AppState>>) -> Json<Vec<Van>> {
    let mut vans: Vec<Van> = state
        .vans
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    vans.sort_by(|a, b| a.plate_number.cmp(&b.plate_number));
    Json(vans)
}

async fn create_operator(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOperatorRequest>,
) -> Result<Json<OperatorDetails>, AppError> {
    if !state.vans.contains_key(&payload.van_id) {
        return Err(AppError::NotFound(format!("van {} not found", payload.van_id)));
    }
    if !state.drivers.contains_key(&payload.driver_id) {
        return Err(AppError::NotFound(format!(
            "driver {} not found",
            payload.driver_id
        )));
    }

    let van_paired = state
        .operators
        .iter()
        .any(|entry| entry.value().van_id == payload.van_id);
    if van_paired {
        return Err(AppError::Conflict(format!(
            "van {} already has an operator",
            payload.van_id
        )));
    }

    let operator = VanDriverOperator {
        id: Uuid::new_v4(),
        van_id: payload.van_id,
        driver_id: payload.driver_id,
        created_at: Utc::now(),
    };
    let id = operator.id;
    state.operators.insert(id, operator);

    state
        .operator_details(id)
        .map(Json)
        .ok_or_else(|| AppError::Internal(format!("operator {id} vanished after insert")))
}

async fn list_operators(State(state): State<Arc<AppState>>) -> Json<Vec<OperatorDetails>> {
    Json(crate::engine::report::operators(&state))
}
