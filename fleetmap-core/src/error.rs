use fleetmap_contracts::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Subscription failed: {0}")]
    Subscribe(#[source] StoreError),

    #[error("Courier tracker is not running")]
    TrackerStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
