pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

use fleetmap_core::normalize::Normalizer;
use fleetmap_core::pocketbase::RealtimeSettings;
use fleetmap_core::tracker::TrackerSettings;
use fleetmap_core::viewport::MapSettings;
use fleetmap_model::{LatLng, RoleSet};
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub realtime: RealtimeConfig,
    pub map: MapConfig,
    pub avatar: AvatarConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn courier_roles(&self) -> RoleSet {
        RoleSet::new(self.store.courier_roles.iter().cloned())
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            roles: self.courier_roles(),
            bulk_limit: self.store.bulk_limit,
            map: self.map.to_settings(),
        }
    }

    pub fn realtime_settings(&self) -> RealtimeSettings {
        RealtimeSettings {
            subscribe_timeout: self.realtime.subscribe_timeout,
            max_retries: self.realtime.max_retries,
        }
    }

    /// Apply the avatar settings to a normalizer.
    pub fn configure_normalizer(&self, normalizer: Normalizer) -> Normalizer {
        normalizer
            .with_avatar_placeholder(self.avatar.placeholder.clone())
            .with_avatar_thumb(self.avatar.thumb.clone())
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: Url,
    pub collection: String,
    pub courier_roles: Vec<String>,
    pub bulk_limit: usize,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub subscribe_timeout: Duration,
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub default_center: LatLng,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub fit_zoom_ceiling: f64,
    pub focus_zoom: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl MapConfig {
    pub fn to_settings(&self) -> MapSettings {
        MapSettings {
            default_center: self.default_center,
            default_zoom: self.default_zoom,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            fit_zoom_ceiling: self.fit_zoom_ceiling,
            focus_zoom: self.focus_zoom,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        let defaults = MapSettings::default();
        Self {
            default_center: defaults.default_center,
            default_zoom: defaults.default_zoom,
            min_zoom: defaults.min_zoom,
            max_zoom: defaults.max_zoom,
            fit_zoom_ceiling: defaults.fit_zoom_ceiling,
            focus_zoom: defaults.focus_zoom,
            viewport_width: defaults.viewport_width,
            viewport_height: defaults.viewport_height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub placeholder: String,
    /// `None` requests full-size avatars.
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
