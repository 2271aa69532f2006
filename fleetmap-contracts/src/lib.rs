//! Trait surfaces that describe the collaborators of the fleetmap engine.

pub mod error;
pub mod files;
pub mod map;
pub mod store;

pub use error::{ResolveError, StoreError};

/// Frequently used contracts for driver and adapter crates.
pub mod prelude {
    pub use super::error::{ResolveError, StoreError};
    pub use super::files::FileUrlResolver;
    pub use super::map::{MapNotification, MapNotificationSender, MapWidget};
    pub use super::store::{ChangeSink, RecordStore, RoleQuery, Unsubscribe};
}
