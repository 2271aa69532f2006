//! Core data model definitions shared across fleetmap crates.
#![allow(missing_docs)]

pub mod error;
pub mod events;
pub mod geo;
pub mod ids;
pub mod prelude;
pub mod record;
pub mod roles;
pub mod user;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use events::{ChangeAction, ChangeEvent};
pub use geo::{LatLng, LatLngBounds, Marker};
pub use ids::RecordId;
pub use record::RawRecord;
pub use roles::RoleSet;
pub use user::{UserRow, UserStatus};
