use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ride::{Preferences, Ride, RideStatus, VehicleType};
use crate::state::{AppState, SchedulerEvent};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRide {
    pub rider_id: Uuid,
    pub rider_phone: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub preferences: Preferences,
    pub scheduled_for: Option<DateTime<Utc>>,
}

pub fn create_ride(
    state: &AppState,
    request: CreateRide,
    now: DateTime<Utc>,
) -> Result<Ride, AppError> {
    if request.pickup_address.trim().is_empty() || request.dropoff_address.trim().is_empty() {
        return Err(AppError::Validation(
            "pickup and dropoff addresses are required".to_string(),
        ));
    }

    let is_scheduled = request.scheduled_for.is_some();
    let scheduled_for = request.scheduled_for.unwrap_or(now);

    if is_scheduled {
        if scheduled_for < now + state.config.min_booking_lead() {
            return Err(AppError::Validation(format!(
                "scheduled rides must be at least {} minutes in advance",
                state.config.min_booking_lead_mins
            )));
        }

        if scheduled_for > now + state.config.max_booking_lead() {
            return Err(AppError::Validation(format!(
                "cannot schedule rides more than {} days in advance",
                state.config.max_booking_lead_days
            )));
        }
    }

    let ride = Ride {
        id: Uuid::new_v4(),
        rider_id: request.rider_id,
        rider_phone: request.rider_phone,
        pickup_address: request.pickup_address,
        dropoff_address: request.dropoff_address,
        vehicle_type: request.vehicle_type,
        preferences: request.preferences,
        otp: generate_otp(),
        status: if is_scheduled {
            RideStatus::Scheduled
        } else {
            RideStatus::Searching
        },
        is_scheduled,
        scheduled_for,
        reminder_sent: false,
        driver: None,
        driver_assigned_at: None,
        created_at: now,
        cancelled_at: None,
    };

    state.rides.insert(ride.clone());
    Ok(ride)
}

pub fn reschedule(
    state: &AppState,
    ride_id: Uuid,
    new_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Ride, AppError> {
    let ride = state
        .rides
        .get(&ride_id)
        .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;

    if ride.status.is_terminal() {
        return Err(AppError::Validation(
            "cannot reschedule a completed or cancelled ride".to_string(),
        ));
    }

    if ride.status == RideStatus::Ongoing {
        return Err(AppError::Validation(
            "cannot reschedule a ride in progress".to_string(),
        ));
    }

    if new_time < now + state.config.min_reschedule_lead() {
        return Err(AppError::Validation(format!(
            "new time must be at least {} minutes from now",
            state.config.min_reschedule_lead_mins
        )));
    }

    let snapshot_status = ride.status;
    let snapshot_driver = ride.driver;
    let snapshot_time = ride.scheduled_for;

    let updated = state.rides.update_if(
        ride_id,
        move |r| {
            r.status == snapshot_status
                && r.driver == snapshot_driver
                && r.scheduled_for == snapshot_time
        },
        move |r| {
            if r.driver.is_some() {
                r.driver = None;
                r.driver_assigned_at = None;
                r.status = RideStatus::Scheduled;
            }
            r.scheduled_for = new_time;
            r.reminder_sent = false;
        },
    )?;

    // The conditional update above already unbound the driver, so this
    // release cannot race another holder.
    if let Some(driver_id) = snapshot_driver {
        if let Err(err) = state.drivers.release(driver_id) {
            warn!(driver_id = %driver_id, error = %err, "driver release skipped on reschedule");
        }
        state.refresh_driver_gauge();
    }

    let _ = state.events.send(SchedulerEvent::RideRescheduled { ride_id });
    Ok(updated)
}

pub fn cancel(state: &AppState, ride_id: Uuid, now: DateTime<Utc>) -> Result<Ride, AppError> {
    let ride = state
        .rides
        .get(&ride_id)
        .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;

    // Cancelling twice is a no-op, not an error.
    if ride.status == RideStatus::Cancelled {
        return Ok(ride);
    }

    if ride.status == RideStatus::Completed {
        return Err(AppError::Validation(
            "cannot cancel a completed ride".to_string(),
        ));
    }

    let snapshot_status = ride.status;
    let snapshot_driver = ride.driver;

    let updated = state.rides.update_if(
        ride_id,
        move |r| r.status == snapshot_status && r.driver == snapshot_driver,
        move |r| {
            r.status = RideStatus::Cancelled;
            r.cancelled_at = Some(now);
            r.driver = None;
            r.driver_assigned_at = None;
        },
    )?;

    if let Some(driver_id) = snapshot_driver {
        if let Err(err) = state.drivers.release(driver_id) {
            warn!(driver_id = %driver_id, error = %err, "driver release skipped on cancel");
        }
        state.refresh_driver_gauge();
    }

    let _ = state.events.send(SchedulerEvent::RideCancelled { ride_id });
    Ok(updated)
}

fn generate_otp() -> String {
    rand::thread_rng().gen_range(1000..10000).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{cancel, create_ride, reschedule, CreateRide};
    use crate::config::Config;
    use crate::error::AppError;
    use crate::models::ride::{Preferences, RideStatus, VehicleType};
    use crate::state::AppState;

    fn request(minutes_ahead: Option<i64>) -> CreateRide {
        CreateRide {
            rider_id: Uuid::from_u128(42),
            rider_phone: "+15550100".to_string(),
            pickup_address: "1 Main St".to_string(),
            dropoff_address: "9 Elm St".to_string(),
            vehicle_type: VehicleType::Sedan,
            preferences: Preferences::default(),
            scheduled_for: minutes_ahead.map(|mins| Utc::now() + Duration::minutes(mins)),
        }
    }

    #[test]
    fn scheduled_ride_needs_30_minutes_lead() {
        let state = AppState::new(Config::default());
        let result = create_ride(&state, request(Some(10)), Utc::now());

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(state.rides.is_empty());
    }

    #[test]
    fn scheduled_ride_capped_at_7_days() {
        let state = AppState::new(Config::default());
        let result = create_ride(&state, request(Some(8 * 24 * 60)), Utc::now());

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn immediate_ride_enters_searching() {
        let state = AppState::new(Config::default());
        let ride = create_ride(&state, request(None), Utc::now()).unwrap();

        assert_eq!(ride.status, RideStatus::Searching);
        assert!(!ride.is_scheduled);
        assert_eq!(ride.otp.len(), 4);
    }

    #[test]
    fn scheduled_ride_enters_scheduled() {
        let state = AppState::new(Config::default());
        let ride = create_ride(&state, request(Some(45)), Utc::now()).unwrap();

        assert_eq!(ride.status, RideStatus::Scheduled);
        assert!(ride.is_scheduled);
        assert!(!ride.reminder_sent);
        assert!(ride.driver.is_none());
    }

    #[test]
    fn reschedule_rejects_short_lead_and_mutates_nothing() {
        let state = AppState::new(Config::default());
        let now = Utc::now();
        let ride = create_ride(&state, request(Some(60)), now).unwrap();

        let result = reschedule(&state, ride.id, now + Duration::minutes(10), now);

        assert!(matches!(result, Err(AppError::Validation(_))));
        let unchanged = state.rides.get(&ride.id).unwrap();
        assert_eq!(unchanged.scheduled_for, ride.scheduled_for);
        assert!(!unchanged.reminder_sent);
    }

    #[test]
    fn reschedule_moves_time_and_resets_reminder() {
        let state = AppState::new(Config::default());
        let now = Utc::now();
        let ride = create_ride(&state, request(Some(60)), now).unwrap();

        state
            .rides
            .update_if(ride.id, |_| true, |r| r.reminder_sent = true)
            .unwrap();

        let new_time = now + Duration::minutes(120);
        let updated = reschedule(&state, ride.id, new_time, now).unwrap();

        assert_eq!(updated.scheduled_for, new_time);
        assert!(!updated.reminder_sent);
        assert_eq!(updated.status, RideStatus::Scheduled);
    }

    #[test]
    fn reschedule_rejects_terminal_and_ongoing() {
        let state = AppState::new(Config::default());
        let now = Utc::now();
        let ride = create_ride(&state, request(Some(60)), now).unwrap();

        for status in [RideStatus::Ongoing, RideStatus::Completed, RideStatus::Cancelled] {
            state
                .rides
                .update_if(ride.id, |_| true, |r| r.status = status)
                .unwrap();

            let result = reschedule(&state, ride.id, now + Duration::minutes(90), now);
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn cancel_is_idempotent() {
        let state = AppState::new(Config::default());
        let now = Utc::now();
        let ride = create_ride(&state, request(Some(60)), now).unwrap();

        let first = cancel(&state, ride.id, now).unwrap();
        assert_eq!(first.status, RideStatus::Cancelled);
        assert!(first.cancelled_at.is_some());

        let second = cancel(&state, ride.id, now + Duration::minutes(5)).unwrap();
        assert_eq!(second.status, RideStatus::Cancelled);
        assert_eq!(second.cancelled_at, first.cancelled_at);
    }

    #[test]
    fn cancel_rejects_completed() {
        let state = AppState::new(Config::default());
        let now = Utc::now();
        let ride = create_ride(&state, request(Some(60)), now).unwrap();

        state
            .rides
            .update_if(ride.id, |_| true, |r| r.status = RideStatus::Completed)
            .unwrap();

        assert!(matches!(
            cancel(&state, ride.id, now),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_ride_is_not_found() {
        let state = AppState::new(Config::default());
        let now = Utc::now();

        assert!(matches!(
            cancel(&state, Uuid::from_u128(999), now),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            reschedule(&state, Uuid::from_u128(999), now + Duration::minutes(60), now),
            Err(AppError::NotFound(_))
        ));
    }
}
