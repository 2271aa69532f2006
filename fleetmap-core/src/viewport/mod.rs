//! Viewport derivation: auto-fit to the active couriers, then a one-shot
//! zoom clamp once the widget reports where it landed.

pub mod headless;
pub mod state;

pub use headless::HeadlessMap;
pub use state::{MapSettings, MapState};

use fleetmap_contracts::map::MapWidget;
use fleetmap_model::{LatLngBounds, UserRow};
use tracing::debug;

use crate::geo::valid_position;

/// Zoom assumed when the widget cannot report one yet.
const UNKNOWN_ZOOM_FALLBACK: f64 = 12.0;

/// Minimal box around every located row, `None` when there is nothing to
/// cover.
pub fn derive_bounds<'a, I>(rows: I) -> Option<LatLngBounds>
where
    I: IntoIterator<Item = &'a UserRow>,
{
    LatLngBounds::from_points(rows.into_iter().filter_map(valid_position))
}

/// Clamp that fires on the first bounds-changed notice after a fit and then
/// detaches. Manual zooming afterwards is never constrained.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomClamp {
    ceiling: f64,
    armed: bool,
}

impl ZoomClamp {
    pub fn new(ceiling: f64) -> Self {
        Self {
            ceiling,
            armed: false,
        }
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Handle one bounds-changed notice. Returns the zoom it clamped to, if
    /// it had to.
    pub fn on_bounds_changed(&mut self, map: &mut dyn MapWidget) -> Option<f64> {
        if !std::mem::take(&mut self.armed) {
            return None;
        }
        let zoom = map.zoom().unwrap_or(UNKNOWN_ZOOM_FALLBACK);
        if zoom > self.ceiling {
            debug!(zoom, ceiling = self.ceiling, "clamping zoom after fit");
            map.set_zoom(self.ceiling);
            Some(self.ceiling)
        } else {
            None
        }
    }
}

/// Fit the widget to the active couriers and arm the clamp.
///
/// An empty set leaves the viewport exactly where it is.
pub fn fit<'a, I>(
    map: &mut dyn MapWidget,
    clamp: &mut ZoomClamp,
    active: I,
) -> Option<LatLngBounds>
where
    I: IntoIterator<Item = &'a UserRow>,
{
    let bounds = derive_bounds(active)?;
    map.fit_bounds(bounds);
    clamp.arm();
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmap_model::{LatLng, UserStatus};

    fn located(lat: f64, lng: f64) -> UserRow {
        UserRow {
            id: format!("{lat}:{lng}").into(),
            created: None,
            name: String::new(),
            email: None,
            phone: String::new(),
            role: None,
            status: UserStatus::Active,
            lat: Some(lat),
            lng: Some(lng),
            avatar_url: String::new(),
        }
    }

    #[test]
    fn empty_set_leaves_viewport_alone() {
        let settings = MapSettings::default();
        let mut map = HeadlessMap::new(&settings);
        let mut clamp = ZoomClamp::new(settings.fit_zoom_ceiling);

        let before = (map.center(), map.zoom());
        assert_eq!(fit(&mut map, &mut clamp, std::iter::empty()), None);
        assert_eq!((map.center(), map.zoom()), before);
        assert!(!clamp.is_armed());
        assert_eq!(map.fit_count(), 0);
    }

    #[test]
    fn bounds_skip_sentinel_positions() {
        let rows = [located(0.0, 0.0), located(1.0, 2.0), located(-3.0, 4.0)];
        let bounds = derive_bounds(&rows).unwrap();
        assert_eq!(bounds.south_west, LatLng::new(-3.0, 2.0));
        assert_eq!(bounds.north_east, LatLng::new(1.0, 4.0));
    }

    #[test]
    fn single_point_fit_is_clamped_once() {
        let settings = MapSettings::default();
        let mut map = HeadlessMap::new(&settings);
        let mut clamp = ZoomClamp::new(settings.fit_zoom_ceiling);

        let rows = [located(11.0, -74.0)];
        fit(&mut map, &mut clamp, &rows).unwrap();
        assert_eq!(map.zoom(), Some(settings.max_zoom));

        assert_eq!(clamp.on_bounds_changed(&mut map), Some(16.0));
        assert_eq!(map.zoom(), Some(16.0));

        // Detached: a later manual zoom-in is left alone.
        map.set_zoom(18.0);
        assert_eq!(clamp.on_bounds_changed(&mut map), None);
        assert_eq!(map.zoom(), Some(18.0));
    }

    #[test]
    fn wide_fit_is_not_clamped() {
        let settings = MapSettings::default();
        let mut map = HeadlessMap::new(&settings);
        let mut clamp = ZoomClamp::new(settings.fit_zoom_ceiling);

        let rows = [located(10.0, -75.0), located(12.0, -73.0)];
        fit(&mut map, &mut clamp, &rows).unwrap();
        let fitted = map.zoom().unwrap();
        assert!(fitted < 16.0);
        assert_eq!(clamp.on_bounds_changed(&mut map), None);
        assert_eq!(map.zoom(), Some(fitted));
        assert!(!clamp.is_armed());
    }
}
