//! Configuration for the fleetmap courier dashboard.
//!
//! Values are layered: a `.env` file, then a TOML file, then process
//! environment variables, with built-in defaults filling whatever is left.
//! The loaded [`Config`] is checked against guard rails before it is handed
//! out, and converts into the engine's settings types.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, error::ConfigLoadError};
pub use models::{
    AvatarConfig, Config, ConfigMetadata, MapConfig, RealtimeConfig,
    StoreConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
