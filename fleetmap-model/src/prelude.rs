//! Flat snapshot of the model surface for UI and driver code.

pub use super::error::{ModelError, Result as ModelResult};
pub use super::events::{ChangeAction, ChangeEvent};
pub use super::geo::{LatLng, LatLngBounds, Marker};
pub use super::ids::RecordId;
pub use super::record::RawRecord;
pub use super::roles::RoleSet;
pub use super::user::{UserRow, UserStatus};
