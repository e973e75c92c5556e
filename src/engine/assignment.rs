use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::Driver;
use crate::models::ride::{Ride, RideStatus};
use crate::notify::{self, Notifier, PushKind, PushMessage};
use crate::state::{AppState, SchedulerEvent};
use crate::store::StoreError;

const MAX_CLAIM_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Assigned(Uuid),
    NoDriverAvailable,
    Skipped,
}

impl AssignmentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AssignmentOutcome::Assigned(_) => "assigned",
            AssignmentOutcome::NoDriverAvailable => "no_driver",
            AssignmentOutcome::Skipped => "skipped",
        }
    }
}

pub async fn try_assign(
    state: &AppState,
    notifier: &dyn Notifier,
    ride: &Ride,
    now: DateTime<Utc>,
) -> Result<AssignmentOutcome, AppError> {
    // Re-read before acting: the ride may have been cancelled, rescheduled,
    // or picked up by an overlapping cycle since the scan.
    let Some(current) = state.rides.get(&ride.id) else {
        return Ok(AssignmentOutcome::Skipped);
    };

    if current.status != RideStatus::Scheduled || current.driver_assigned_at.is_some() {
        return Ok(AssignmentOutcome::Skipped);
    }

    for _ in 0..MAX_CLAIM_ATTEMPTS {
        let Some(candidate) = state
            .drivers
            .best_available(current.vehicle_type, &current.preferences)
        else {
            notify_no_driver(state, notifier, &current).await;
            let _ = state
                .events
                .send(SchedulerEvent::NoDriverAvailable { ride_id: current.id });
            return Ok(AssignmentOutcome::NoDriverAvailable);
        };

        let driver = match state.drivers.claim(candidate.id) {
            Ok(driver) => driver,
            // Lost the claim to a concurrent assignment; rematch.
            Err(StoreError::PreconditionFailed(_)) => continue,
            Err(err) => return Err(err.into()),
        };

        let bound = state.rides.update_if(
            current.id,
            |r| r.status == RideStatus::Scheduled && r.driver.is_none(),
            |r| {
                r.driver = Some(driver.id);
                r.status = RideStatus::Confirmed;
                r.driver_assigned_at = Some(now);
            },
        );

        match bound {
            Ok(updated) => {
                state.refresh_driver_gauge();
                notify_assigned(state, notifier, &updated, &driver).await;
                let _ = state.events.send(SchedulerEvent::DriverAssigned {
                    ride_id: updated.id,
                    driver_id: driver.id,
                });
                info!(ride_id = %updated.id, driver_id = %driver.id, "driver assigned");
                return Ok(AssignmentOutcome::Assigned(driver.id));
            }
            Err(err) => {
                // Ride changed under us; hand the claimed driver back so the
                // binding never half-applies.
                if let Err(release_err) = state.drivers.release(driver.id) {
                    warn!(
                        driver_id = %driver.id,
                        error = %release_err,
                        "failed to release driver after lost ride race"
                    );
                }
                warn!(ride_id = %current.id, error = %err, "ride changed during assignment");
                return Ok(AssignmentOutcome::Skipped);
            }
        }
    }

    warn!(ride_id = %current.id, "giving up after repeated driver claim races");
    Ok(AssignmentOutcome::Skipped)
}

async fn notify_assigned(state: &AppState, notifier: &dyn Notifier, ride: &Ride, driver: &Driver) {
    let timeout = state.config.notify_timeout();

    notify::push_bounded(
        notifier,
        timeout,
        ride.rider_id,
        PushMessage {
            title: "Driver Assigned".to_string(),
            body: format!("{} will pick you up at {}", driver.name, ride.pickup_address),
            ride_id: ride.id,
            kind: PushKind::DriverAssigned,
        },
    )
    .await;

    notify::push_bounded(
        notifier,
        timeout,
        driver.id,
        PushMessage {
            title: "New Scheduled Ride".to_string(),
            body: format!(
                "Pickup: {} at {}",
                ride.pickup_address,
                notify::format_pickup_time(ride.scheduled_for)
            ),
            ride_id: ride.id,
            kind: PushKind::NewRide,
        },
    )
    .await;
}

async fn notify_no_driver(state: &AppState, notifier: &dyn Notifier, ride: &Ride) {
    let timeout = state.config.notify_timeout();

    notify::push_bounded(
        notifier,
        timeout,
        ride.rider_id,
        PushMessage {
            title: "Driver Availability Issue".to_string(),
            body: "We're having trouble finding a driver. We'll keep trying, or you can reschedule."
                .to_string(),
            ride_id: ride.id,
            kind: PushKind::NoDriver,
        },
    )
    .await;

    notify::sms_bounded(
        notifier,
        timeout,
        &ride.rider_phone,
        &format!(
            "We're still searching for a driver for your {} ride. \
             Reply RESCHEDULE to change the time or CANCEL to cancel. OTP: {}",
            notify::format_pickup_time(ride.scheduled_for),
            ride.otp
        ),
    )
    .await;
}
