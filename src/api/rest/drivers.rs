use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{Driver, Gender};
use crate::models::ride::VehicleType;
use crate::state::AppState;
use crate::store::StoreError;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id/availability", patch(update_availability))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub phone: String,
    pub gender: Gender,
    pub vehicle_type: VehicleType,
    pub rating: f64,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        gender: payload.gender,
        vehicle_type: payload.vehicle_type,
        rating: payload.rating.clamp(0.0, 5.0),
        is_available: true,
        updated_at: Utc::now(),
    };

    state.drivers.insert(driver.clone());
    state.refresh_driver_gauge();
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.drivers.list())
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    let result = if payload.is_available {
        state.drivers.release(id)
    } else {
        state.drivers.claim(id)
    };

    let driver = match result {
        Ok(driver) => driver,
        // Already in the requested state; report it as-is.
        Err(StoreError::PreconditionFailed(_)) => state
            .drivers
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?,
        Err(err) => return Err(err.into()),
    };

    state.refresh_driver_gauge();
    Ok(Json(driver))
}
