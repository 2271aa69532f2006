//! In-process [`MapWidget`] for the CLI and tests.
//!
//! Fits use Web-Mercator math on 256px tiles at the configured viewport
//! size, floored to whole zoom levels the way slippy-map widgets do.

use std::f64::consts::PI;

use fleetmap_contracts::map::{
    MapNotification, MapNotificationSender, MapWidget,
};
use fleetmap_model::{LatLng, LatLngBounds, Marker};
use tokio::sync::mpsc;
use tracing::trace;

use super::state::MapSettings;

const TILE_SIZE: f64 = 256.0;

#[derive(Debug)]
pub struct HeadlessMap {
    center: LatLng,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    width: f64,
    height: f64,
    markers: Vec<Marker>,
    fit_count: usize,
    notifier: Option<MapNotificationSender>,
}

impl HeadlessMap {
    pub fn new(settings: &MapSettings) -> Self {
        Self {
            center: settings.default_center,
            zoom: settings.clamp_zoom(settings.default_zoom),
            min_zoom: settings.min_zoom,
            max_zoom: settings.max_zoom,
            width: f64::from(settings.viewport_width.max(1)),
            height: f64::from(settings.viewport_height.max(1)),
            markers: Vec::new(),
            fit_count: 0,
            notifier: None,
        }
    }

    /// A map that raises bounds-changed notices on the returned receiver.
    pub fn with_channel(
        settings: &MapSettings,
    ) -> (Self, mpsc::UnboundedReceiver<MapNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut map = Self::new(settings);
        map.notifier = Some(tx);
        (map, rx)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Number of auto-fits performed so far.
    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    /// Whole zoom level at which `bounds` fits the viewport.
    pub fn zoom_for_bounds(&self, bounds: &LatLngBounds) -> f64 {
        let lat_fraction = (mercator_y(bounds.north_east.lat)
            - mercator_y(bounds.south_west.lat))
            / PI;
        let mut lng_span = bounds.lng_span();
        if lng_span < 0.0 {
            lng_span += 360.0;
        }
        let lng_fraction = lng_span / 360.0;

        let lat_zoom = level_for(self.height, lat_fraction);
        let lng_zoom = level_for(self.width, lng_fraction);
        lat_zoom
            .min(lng_zoom)
            .min(self.max_zoom)
            .max(self.min_zoom)
    }

    fn notify(&self) {
        if let Some(tx) = &self.notifier {
            // Receiver gone means nobody is listening for clamps anymore.
            let _ = tx.send(MapNotification::BoundsChanged);
        }
    }
}

fn mercator_y(lat: f64) -> f64 {
    let sin = lat.to_radians().sin();
    let rad_x2 = ((1.0 + sin) / (1.0 - sin)).ln() / 2.0;
    rad_x2.clamp(-PI, PI) / 2.0
}

fn level_for(pixels: f64, fraction: f64) -> f64 {
    if fraction <= 0.0 || !fraction.is_finite() {
        return f64::INFINITY;
    }
    (pixels / TILE_SIZE / fraction).log2().floor()
}

impl MapWidget for HeadlessMap {
    fn fit_bounds(&mut self, bounds: LatLngBounds) {
        self.center = bounds.center();
        self.zoom = self.zoom_for_bounds(&bounds);
        self.fit_count += 1;
        trace!(center = %self.center, zoom = self.zoom, "fitted bounds");
        self.notify();
    }

    fn zoom(&self) -> Option<f64> {
        Some(self.zoom)
    }

    fn center(&self) -> Option<LatLng> {
        Some(self.center)
    }

    fn set_zoom(&mut self, zoom: f64) {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.notify();
        }
    }

    fn set_center(&mut self, center: LatLng) {
        if center != self.center {
            self.center = center;
            self.notify();
        }
    }

    fn set_markers(&mut self, markers: &[Marker]) {
        self.markers = markers.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_bounds_fit_at_max_zoom() {
        let map = HeadlessMap::new(&MapSettings::default());
        let bounds = LatLngBounds::from_point(LatLng::new(11.0, -74.0));
        assert_eq!(map.zoom_for_bounds(&bounds), 18.0);
    }

    #[test]
    fn whole_world_fits_at_min_zoom() {
        let map = HeadlessMap::new(&MapSettings::default());
        let bounds = LatLngBounds {
            south_west: LatLng::new(-85.0, -180.0),
            north_east: LatLng::new(85.0, 180.0),
        };
        assert_eq!(map.zoom_for_bounds(&bounds), 3.0);
    }

    #[test]
    fn city_sized_bounds_land_mid_range() {
        let map = HeadlessMap::new(&MapSettings::default());
        let bounds = LatLngBounds {
            south_west: LatLng::new(11.20, -74.23),
            north_east: LatLng::new(11.26, -74.17),
        };
        let zoom = map.zoom_for_bounds(&bounds);
        assert!((12.0..=14.0).contains(&zoom), "zoom was {zoom}");
    }

    #[tokio::test]
    async fn fit_and_zoom_changes_raise_notifications() {
        let settings = MapSettings::default();
        let (mut map, mut rx) = HeadlessMap::with_channel(&settings);

        map.fit_bounds(LatLngBounds::from_point(LatLng::new(1.0, 1.0)));
        assert_eq!(rx.recv().await, Some(MapNotification::BoundsChanged));

        map.set_zoom(18.0);
        assert!(rx.try_recv().is_err());

        map.set_zoom(16.0);
        assert_eq!(rx.recv().await, Some(MapNotification::BoundsChanged));
        assert_eq!(map.fit_count(), 1);
    }
}
