use fleetmap_model::{LatLng, LatLngBounds, Marker};
use std::fmt;
use tokio::sync::mpsc;

/// Notifications a map widget raises asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapNotification {
    /// The visible region changed (fit, pan, zoom, resize).
    BoundsChanged,
}

/// Channel a widget uses to raise [`MapNotification`]s.
pub type MapNotificationSender = mpsc::UnboundedSender<MapNotification>;

/// The interactive map the dashboard draws couriers on.
///
/// Commands are fire-and-forget; the widget reports the visible region
/// changing through its notification channel rather than return values.
pub trait MapWidget: Send + fmt::Debug {
    /// Auto-fit the viewport to `bounds`.
    fn fit_bounds(&mut self, bounds: LatLngBounds);

    /// Current zoom level, if the widget has settled on one.
    fn zoom(&self) -> Option<f64>;

    /// Current center, if the widget has settled on one.
    fn center(&self) -> Option<LatLng>;

    fn set_zoom(&mut self, zoom: f64);

    fn set_center(&mut self, center: LatLng);

    /// Replace the full marker set.
    fn set_markers(&mut self, markers: &[Marker]);
}
