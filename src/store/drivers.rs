use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::driver::{Driver, Gender};
use crate::models::ride::{Preferences, VehicleType};
use crate::store::StoreError;

#[derive(Default)]
pub struct DriverStore {
    drivers: DashMap<Uuid, Driver>,
}

impl DriverStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, driver: Driver) {
        self.drivers.insert(driver.id, driver);
    }

    pub fn get(&self, id: &Uuid) -> Option<Driver> {
        self.drivers.get(id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<Driver> {
        self.drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn available_count(&self) -> usize {
        self.drivers
            .iter()
            .filter(|entry| entry.value().is_available)
            .count()
    }

    pub fn best_available(
        &self,
        vehicle_type: VehicleType,
        preferences: &Preferences,
    ) -> Option<Driver> {
        let candidates: Vec<Driver> = self
            .drivers
            .iter()
            .filter_map(|entry| {
                let driver = entry.value();
                let matches = driver.is_available
                    && driver.vehicle_type == vehicle_type
                    && (!preferences.female_driver || driver.gender == Gender::Female);

                if matches {
                    Some(driver.clone())
                } else {
                    None
                }
            })
            .collect();

        // Highest rating wins; ties broken by id so a snapshot always
        // produces the same pick.
        candidates.into_iter().max_by(|a, b| {
            a.rating
                .total_cmp(&b.rating)
                .then_with(|| b.id.cmp(&a.id))
        })
    }

    /// Marks the driver busy, but only if still available.
    pub fn claim(&self, id: Uuid) -> Result<Driver, StoreError> {
        let mut entry = self
            .drivers
            .get_mut(&id)
            .ok_or(StoreError::DriverNotFound(id))?;

        if !entry.value().is_available {
            return Err(StoreError::PreconditionFailed(id));
        }

        entry.value_mut().is_available = false;
        entry.value_mut().updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    /// Reverts availability after unbinding. Rejects a release of an already
    /// available driver so two paths cannot both free the same slot.
    pub fn release(&self, id: Uuid) -> Result<Driver, StoreError> {
        let mut entry = self
            .drivers
            .get_mut(&id)
            .ok_or(StoreError::DriverNotFound(id))?;

        if entry.value().is_available {
            return Err(StoreError::PreconditionFailed(id));
        }

        entry.value_mut().is_available = true;
        entry.value_mut().updated_at = Utc::now();
        Ok(entry.value().clone())
    }
}
