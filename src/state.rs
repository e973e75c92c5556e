use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::observability::metrics::Metrics;
use crate::store::drivers::DriverStore;
use crate::store::rides::RideStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SchedulerEvent {
    DriverAssigned { ride_id: Uuid, driver_id: Uuid },
    NoDriverAvailable { ride_id: Uuid },
    ReminderSent { ride_id: Uuid },
    RideRescheduled { ride_id: Uuid },
    RideCancelled { ride_id: Uuid },
}

pub struct AppState {
    pub config: Config,
    pub rides: RideStore,
    pub drivers: DriverStore,
    pub events: broadcast::Sender<SchedulerEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let (events, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            config,
            rides: RideStore::new(),
            drivers: DriverStore::new(),
            events,
            metrics: Metrics::new(),
        }
    }

    pub fn refresh_driver_gauge(&self) {
        self.metrics
            .available_drivers
            .set(self.drivers.available_count() as i64);
    }
}
