use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::booking::{self, CreateRide};
use crate::error::AppError;
use crate::models::ride::Ride;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides", post(create_ride).get(list_rides))
        .route("/rides/:id", get(get_ride))
        .route("/rides/:id/reschedule", post(reschedule_ride))
        .route("/rides/:id/cancel", post(cancel_ride))
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub scheduled_for: DateTime<Utc>,
}

async fn create_ride(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRide>,
) -> Result<Json<Ride>, AppError> {
    let ride = booking::create_ride(&state, payload, Utc::now())?;
    Ok(Json(ride))
}

async fn list_rides(State(state): State<Arc<AppState>>) -> Json<Vec<Ride>> {
    Json(state.rides.list())
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    let ride = state
        .rides
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("ride {} not found", id)))?;

    Ok(Json(ride))
}

async fn reschedule_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleRequest>,
) -> Result<Json<Ride>, AppError> {
    let ride = booking::reschedule(&state, id, payload.scheduled_for, Utc::now())?;
    Ok(Json(ride))
}

async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    let ride = booking::cancel(&state, id, Utc::now())?;
    Ok(Json(ride))
}
