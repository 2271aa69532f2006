use fleetmap_contracts::map::MapWidget;
use fleetmap_model::{LatLng, UserRow};
use serde::Serialize;
use tracing::debug;

/// Santa Marta, where the operators are.
pub const DEFAULT_CENTER: LatLng = LatLng::new(11.2408, -74.1990);

#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub default_center: LatLng,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Highest zoom an auto-fit may settle on.
    pub fit_zoom_ceiling: f64,
    /// Zoom used when focusing a single courier or searched place.
    pub focus_zoom: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            default_center: DEFAULT_CENTER,
            default_zoom: 8.0,
            min_zoom: 3.0,
            max_zoom: 18.0,
            fit_zoom_ceiling: 16.0,
            focus_zoom: 15.0,
            viewport_width: 1024,
            viewport_height: 768,
        }
    }
}

impl MapSettings {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

/// Camera and search state owned by the dashboard view.
///
/// The autocomplete selection is only remembered; it reaches the viewport
/// when the operator asks for it through [`MapState::go_to_search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapState {
    pub center: LatLng,
    pub zoom: f64,
    pub search_marker: Option<LatLng>,
    pub last_place: Option<LatLng>,
}

impl MapState {
    pub fn new(settings: &MapSettings) -> Self {
        Self {
            center: settings.default_center,
            zoom: settings.clamp_zoom(settings.default_zoom),
            search_marker: None,
            last_place: None,
        }
    }

    /// Browser geolocation resolved: recenter near the operator.
    pub fn operator_located(&mut self, map: &mut dyn MapWidget, at: LatLng) {
        debug!(center = %at, "centering on operator location");
        self.center = at;
        map.set_center(at);
    }

    pub fn place_selected(&mut self, place: LatLng) {
        self.last_place = Some(place);
    }

    /// Commit the last selected place. Returns `false` when nothing has
    /// been selected yet.
    pub fn go_to_search(
        &mut self,
        map: &mut dyn MapWidget,
        settings: &MapSettings,
    ) -> bool {
        let Some(place) = self.last_place else {
            return false;
        };
        self.focus(map, settings, place);
        true
    }

    /// Focus a courier picked from the side list. Rows missing either
    /// coordinate are ignored; `0,0` is still a coordinate here.
    pub fn center_on_user(
        &mut self,
        map: &mut dyn MapWidget,
        settings: &MapSettings,
        row: &UserRow,
    ) -> bool {
        let Some(position) = row.coordinates() else {
            debug!(id = %row.id, "courier has no location to center on");
            return false;
        };
        self.focus(map, settings, position);
        true
    }

    /// Pull the widget's settled camera back into the state.
    pub fn sync_from(&mut self, map: &dyn MapWidget) {
        if let Some(center) = map.center() {
            self.center = center;
        }
        if let Some(zoom) = map.zoom() {
            self.zoom = zoom;
        }
    }

    fn focus(
        &mut self,
        map: &mut dyn MapWidget,
        settings: &MapSettings,
        at: LatLng,
    ) {
        self.center = at;
        self.zoom = settings.clamp_zoom(settings.focus_zoom);
        self.search_marker = Some(at);
        map.set_center(at);
        map.set_zoom(self.zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::HeadlessMap;
    use fleetmap_model::UserStatus;

    #[test]
    fn starts_at_default_camera() {
        let settings = MapSettings::default();
        let state = MapState::new(&settings);
        assert_eq!(state.center, DEFAULT_CENTER);
        assert_eq!(state.zoom, 8.0);
        assert_eq!(state.search_marker, None);
    }

    #[test]
    fn selection_waits_for_explicit_go() {
        let settings = MapSettings::default();
        let mut map = HeadlessMap::new(&settings);
        let mut state = MapState::new(&settings);

        assert!(!state.go_to_search(&mut map, &settings));

        let place = LatLng::new(4.711, -74.0721);
        state.place_selected(place);
        assert_eq!(state.center, DEFAULT_CENTER);
        assert_eq!(map.center(), Some(DEFAULT_CENTER));

        assert!(state.go_to_search(&mut map, &settings));
        assert_eq!(state.center, place);
        assert_eq!(state.zoom, 15.0);
        assert_eq!(state.search_marker, Some(place));
        assert_eq!(map.center(), Some(place));
        assert_eq!(map.zoom(), Some(15.0));
    }

    #[test]
    fn center_on_user_requires_both_coordinates() {
        let settings = MapSettings::default();
        let mut map = HeadlessMap::new(&settings);
        let mut state = MapState::new(&settings);
        let mut row = UserRow {
            id: "c1".into(),
            created: None,
            name: "C1".into(),
            email: None,
            phone: String::new(),
            role: None,
            status: UserStatus::Inactive,
            lat: Some(11.0),
            lng: None,
            avatar_url: String::new(),
        };

        assert!(!state.center_on_user(&mut map, &settings, &row));
        assert_eq!(state.search_marker, None);

        row.lng = Some(-74.0);
        assert!(state.center_on_user(&mut map, &settings, &row));
        assert_eq!(state.center, LatLng::new(11.0, -74.0));
        assert_eq!(state.search_marker, Some(LatLng::new(11.0, -74.0)));
    }

    #[test]
    fn center_on_user_accepts_origin() {
        let settings = MapSettings::default();
        let mut map = HeadlessMap::new(&settings);
        let mut state = MapState::new(&settings);
        let row = UserRow {
            id: "c0".into(),
            created: None,
            name: "C0".into(),
            email: None,
            phone: String::new(),
            role: None,
            status: UserStatus::Active,
            lat: Some(0.0),
            lng: Some(0.0),
            avatar_url: String::new(),
        };

        assert!(state.center_on_user(&mut map, &settings, &row));
        assert_eq!(state.center, LatLng::new(0.0, 0.0));
        assert_eq!(state.zoom, 15.0);
        assert_eq!(map.center(), Some(LatLng::new(0.0, 0.0)));
    }
}
