//! # Fleetmap Core
//!
//! Realtime location-reconciliation and map-state engine for the courier
//! dashboard.
//!
//! ## Overview
//!
//! The engine ingests a live change stream of user records, normalizes the
//! backend's inconsistent field encodings into a stable [`UserRow`] view
//! model, merges each change into an ordered in-memory collection, and
//! derives map state (markers, bounds, zoom) from the result.
//!
//! - [`normalize`]: raw record to canonical row, never fails
//! - [`reconcile`]: pure `(snapshot, event) -> snapshot'` reducer
//! - [`geo`]: coordinate and status predicates, derived subsets
//! - [`viewport`]: auto-fit, one-shot zoom clamp, camera state, headless map
//! - [`subscription`]: at-most-one live subscription per mounted view
//! - [`view`]: mount-scoped state joining bulk loads and the change stream
//! - [`tracker`]: the async loop that drives all of the above
//!
//! ## Feature Flags
//!
//! - `pocketbase` (default): HTTP + realtime client for a PocketBase backend
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fleetmap_core::{
//!     normalize::Normalizer,
//!     pocketbase::{PocketBaseClient, PocketBaseFiles},
//!     tracker::{CourierTracker, TrackerSettings},
//!     viewport::HeadlessMap,
//! };
//!
//! async fn watch() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = TrackerSettings::default();
//!     let client = PocketBaseClient::new("http://127.0.0.1:8090", "users")?;
//!     let files = PocketBaseFiles::new(client.base_url().clone());
//!     let normalizer = Normalizer::new().with_resolver(Arc::new(files));
//!     let (map, map_events) = HeadlessMap::with_channel(&settings.map);
//!
//!     let tracker = CourierTracker::new(
//!         Arc::new(client),
//!         normalizer,
//!         Box::new(map),
//!         map_events,
//!         settings,
//!     );
//!     let handle = tracker.spawn();
//!     let mut updates = handle.updates();
//!     updates.changed().await?;
//!     println!("{} couriers", updates.borrow().rows.len());
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod error;
pub mod geo;
pub mod normalize;
pub mod reconcile;
pub mod subscription;
pub mod tracker;
pub mod view;
pub mod viewport;

#[cfg(feature = "pocketbase")]
pub mod pocketbase;

pub use error::{CoreError, Result};
pub use fleetmap_contracts as contracts;
pub use fleetmap_model as model;
pub use fleetmap_model::{
    ChangeAction, ChangeEvent, LatLng, LatLngBounds, Marker, RawRecord,
    RecordId, RoleSet, UserRow, UserStatus,
};
pub use reconcile::{CourierSnapshot, ReconcileOutcome};
pub use subscription::{SubscriptionManager, SubscriptionState};
pub use tracker::{
    CourierTracker, TrackerCommand, TrackerHandle, TrackerSettings,
    TrackerSnapshot,
};
pub use viewport::{HeadlessMap, MapSettings, MapState};
