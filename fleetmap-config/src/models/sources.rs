use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use fleetmap_model::LatLng;
use serde::Deserialize;

use crate::util::{parse_csv, parse_duration};

pub const ENV_CONFIG_PATH: &str = "FLEETMAP_CONFIG";
pub const ENV_STORE_URL: &str = "FLEETMAP_STORE_URL";
pub const ENV_COLLECTION: &str = "FLEETMAP_COLLECTION";
pub const ENV_COURIER_ROLES: &str = "FLEETMAP_COURIER_ROLES";
pub const ENV_BULK_LIMIT: &str = "FLEETMAP_BULK_LIMIT";
pub const ENV_REQUEST_TIMEOUT: &str = "FLEETMAP_REQUEST_TIMEOUT";
pub const ENV_SUBSCRIBE_TIMEOUT: &str = "FLEETMAP_SUBSCRIBE_TIMEOUT";
pub const ENV_REALTIME_MAX_RETRIES: &str = "FLEETMAP_REALTIME_MAX_RETRIES";
pub const ENV_DEFAULT_CENTER: &str = "FLEETMAP_DEFAULT_CENTER";
pub const ENV_DEFAULT_ZOOM: &str = "FLEETMAP_DEFAULT_ZOOM";
pub const ENV_FIT_ZOOM_CEILING: &str = "FLEETMAP_FIT_ZOOM_CEILING";
pub const ENV_AVATAR_PLACEHOLDER: &str = "FLEETMAP_AVATAR_PLACEHOLDER";

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub store: FileStoreConfig,
    #[serde(default)]
    pub realtime: FileRealtimeConfig,
    #[serde(default)]
    pub map: FileMapConfig,
    #[serde(default)]
    pub avatar: FileAvatarConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileStoreConfig {
    pub base_url: Option<String>,
    pub collection: Option<String>,
    pub courier_roles: Option<Vec<String>>,
    pub bulk_limit: Option<usize>,
    /// Humantime string, e.g. `"30s"`.
    pub request_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRealtimeConfig {
    pub subscribe_timeout: Option<String>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileMapConfig {
    /// `[lat, lng]`
    pub default_center: Option<[f64; 2]>,
    pub default_zoom: Option<f64>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub fit_zoom_ceiling: Option<f64>,
    pub focus_zoom: Option<f64>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileAvatarConfig {
    pub placeholder: Option<String>,
    /// Empty string disables thumbnails.
    pub thumb: Option<String>,
}

/// Environment-derived configuration values.
///
/// Values that are present but unparseable are kept in `rejected` so the
/// loader can report them instead of silently using a default.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub store_url: Option<String>,
    pub collection: Option<String>,
    pub courier_roles: Option<Vec<String>>,
    pub bulk_limit: Option<usize>,
    pub request_timeout: Option<Duration>,
    pub subscribe_timeout: Option<Duration>,
    pub realtime_max_retries: Option<u32>,
    pub default_center: Option<LatLng>,
    pub default_zoom: Option<f64>,
    pub fit_zoom_ceiling: Option<f64>,
    pub avatar_placeholder: Option<String>,
    pub rejected: Vec<(&'static str, String)>,
}

impl EnvConfig {
    /// Process environment first, then `.env` entries that it does not set.
    pub fn gather_with(dotenv: &HashMap<String, String>) -> Self {
        Self::from_lookup(|name| {
            std::env::var(name).ok().or_else(|| dotenv.get(name).cloned())
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = Self::default();
        let var = |name: &str| {
            lookup(name).filter(|value| !value.trim().is_empty())
        };

        env_config.config_path = var(ENV_CONFIG_PATH).map(PathBuf::from);
        env_config.store_url = var(ENV_STORE_URL).map(|s| s.trim().to_string());
        env_config.collection =
            var(ENV_COLLECTION).map(|s| s.trim().to_string());
        env_config.courier_roles = var(ENV_COURIER_ROLES).map(|s| parse_csv(&s));
        env_config.avatar_placeholder = var(ENV_AVATAR_PLACEHOLDER);

        env_config.bulk_limit = env_config
            .parse_var(var(ENV_BULK_LIMIT), ENV_BULK_LIMIT, |s| {
                s.trim().parse().ok()
            });
        env_config.request_timeout = env_config.parse_var(
            var(ENV_REQUEST_TIMEOUT),
            ENV_REQUEST_TIMEOUT,
            parse_duration,
        );
        env_config.subscribe_timeout = env_config.parse_var(
            var(ENV_SUBSCRIBE_TIMEOUT),
            ENV_SUBSCRIBE_TIMEOUT,
            parse_duration,
        );
        env_config.realtime_max_retries = env_config.parse_var(
            var(ENV_REALTIME_MAX_RETRIES),
            ENV_REALTIME_MAX_RETRIES,
            |s| s.trim().parse().ok(),
        );
        env_config.default_center = env_config.parse_var(
            var(ENV_DEFAULT_CENTER),
            ENV_DEFAULT_CENTER,
            |s| s.parse::<LatLng>().ok(),
        );
        env_config.default_zoom = env_config
            .parse_var(var(ENV_DEFAULT_ZOOM), ENV_DEFAULT_ZOOM, |s| {
                s.trim().parse().ok()
            });
        env_config.fit_zoom_ceiling = env_config.parse_var(
            var(ENV_FIT_ZOOM_CEILING),
            ENV_FIT_ZOOM_CEILING,
            |s| s.trim().parse().ok(),
        );

        env_config
    }

    fn parse_var<T>(
        &mut self,
        raw: Option<String>,
        name: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let raw = raw?;
        let parsed = parse(&raw);
        if parsed.is_none() {
            self.rejected.push((name, raw));
        }
        parsed
    }
}
