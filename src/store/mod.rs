pub mod drivers;
pub mod rides;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ride {0} not found")]
    RideNotFound(Uuid),

    #[error("driver {0} not found")]
    DriverNotFound(Uuid),

    #[error("precondition failed for {0}")]
    PreconditionFailed(Uuid),
}
