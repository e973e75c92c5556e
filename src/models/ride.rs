use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Cycle,
    Bike,
    Auto,
    Sedan,
    Suv,
    Luxury,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Scheduled,
    Searching,
    Confirmed,
    Ongoing,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub female_driver: bool,
    pub pet_friendly: bool,
    pub wheelchair: bool,
    pub silent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub rider_phone: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub vehicle_type: VehicleType,
    pub preferences: Preferences,
    pub otp: String,
    pub status: RideStatus,
    pub is_scheduled: bool,
    pub scheduled_for: DateTime<Utc>,
    pub reminder_sent: bool,
    pub driver: Option<Uuid>,
    pub driver_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}
