use thiserror::Error;

use crate::models::Config;

/// Largest page the list endpoint serves in one request.
pub const MAX_BULK_LIMIT: usize = 500;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigGuardRailError {
    #[error("store URL {url} must use http or https")]
    UnsupportedScheme { url: String },
    #[error("store.bulk_limit must be within 1..={MAX_BULK_LIMIT}, got {0}")]
    BulkLimitOutOfRange(usize),
    #[error("store.courier_roles must name at least one role")]
    NoCourierRoles,
    #[error("store.collection must not be empty")]
    EmptyCollection,
    #[error(
        "map zoom levels out of order: min {min} <= default {default} <= max {max} does not hold"
    )]
    ZoomOrder { min: f64, default: f64, max: f64 },
    #[error("map.fit_zoom_ceiling {ceiling} is above map.max_zoom {max}")]
    FitCeilingAboveMax { ceiling: f64, max: f64 },
    #[error("map.default_center {lat},{lng} is not a valid coordinate")]
    CenterOutOfRange { lat: f64, lng: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let store = &config.store;
    let map = &config.map;

    if !matches!(store.base_url.scheme(), "http" | "https") {
        return Err(ConfigGuardRailError::UnsupportedScheme {
            url: store.base_url.to_string(),
        });
    }

    if store.collection.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyCollection);
    }

    if !(1..=MAX_BULK_LIMIT).contains(&store.bulk_limit) {
        return Err(ConfigGuardRailError::BulkLimitOutOfRange(store.bulk_limit));
    }

    if store.courier_roles.is_empty() {
        return Err(ConfigGuardRailError::NoCourierRoles);
    }

    if !(map.min_zoom <= map.default_zoom && map.default_zoom <= map.max_zoom)
    {
        return Err(ConfigGuardRailError::ZoomOrder {
            min: map.min_zoom,
            default: map.default_zoom,
            max: map.max_zoom,
        });
    }

    if map.fit_zoom_ceiling > map.max_zoom {
        return Err(ConfigGuardRailError::FitCeilingAboveMax {
            ceiling: map.fit_zoom_ceiling,
            max: map.max_zoom,
        });
    }

    let center = map.default_center;
    if center.validate().is_err() {
        return Err(ConfigGuardRailError::CenterOutOfRange {
            lat: center.lat,
            lng: center.lng,
        });
    }

    if map.fit_zoom_ceiling > map.focus_zoom + 2.0 {
        warnings.push_with_hint(
            format!(
                "map.fit_zoom_ceiling {} is well above map.focus_zoom {}; a lone courier will fit closer than a manual focus",
                map.fit_zoom_ceiling, map.focus_zoom
            ),
            "Lower fit_zoom_ceiling or raise focus_zoom",
        );
    }

    if store.base_url.scheme() == "http"
        && store
            .base_url
            .host_str()
            .is_some_and(|host| !is_local_host(host))
    {
        warnings.push_with_hint(
            format!("store URL {} is not using TLS", store.base_url),
            "Use https for stores outside the local network",
        );
    }

    Ok(warnings)
}

fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
}
