use dashmap::DashMap;
use uuid::Uuid;

use crate::engine::window::TimeWindow;
use crate::models::ride::{Ride, RideStatus};
use crate::store::StoreError;

#[derive(Default)]
pub struct RideStore {
    rides: DashMap<Uuid, Ride>,
}

impl RideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ride: Ride) {
        self.rides.insert(ride.id, ride);
    }

    pub fn get(&self, id: &Uuid) -> Option<Ride> {
        self.rides.get(id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<Ride> {
        self.rides.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    pub fn needing_assignment(&self, window: &TimeWindow) -> Vec<Ride> {
        self.rides
            .iter()
            .filter_map(|entry| {
                let ride = entry.value();
                let needs_driver = ride.status == RideStatus::Scheduled
                    && ride.is_scheduled
                    && ride.driver_assigned_at.is_none()
                    && window.contains(ride.scheduled_for);

                if needs_driver {
                    Some(ride.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn needing_reminder(&self, window: &TimeWindow) -> Vec<Ride> {
        self.rides
            .iter()
            .filter_map(|entry| {
                let ride = entry.value();
                let needs_reminder = matches!(
                    ride.status,
                    RideStatus::Scheduled | RideStatus::Confirmed
                ) && !ride.reminder_sent
                    && window.contains(ride.scheduled_for);

                if needs_reminder {
                    Some(ride.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Conditional write: `apply` runs under the entry lock only if `check`
    /// still holds, so concurrent cycles cannot clobber each other's state.
    pub fn update_if<C, A>(&self, id: Uuid, check: C, apply: A) -> Result<Ride, StoreError>
    where
        C: FnOnce(&Ride) -> bool,
        A: FnOnce(&mut Ride),
    {
        let mut entry = self.rides.get_mut(&id).ok_or(StoreError::RideNotFound(id))?;

        if !check(entry.value()) {
            return Err(StoreError::PreconditionFailed(id));
        }

        apply(entry.value_mut());
        Ok(entry.value().clone())
    }
}
