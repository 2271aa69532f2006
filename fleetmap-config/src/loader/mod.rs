pub mod error;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fleetmap_core::normalize::{
    DEFAULT_AVATAR_PLACEHOLDER, DEFAULT_AVATAR_THUMB,
};
use fleetmap_core::pocketbase::RealtimeSettings;
use fleetmap_core::tracker::DEFAULT_BULK_LIMIT;
use fleetmap_model::{LatLng, RoleSet};
use tracing::debug;
use url::Url;

use crate::models::{
    AvatarConfig, Config, ConfigMetadata, MapConfig, RealtimeConfig,
    StoreConfig,
    sources::{EnvConfig, FileConfig},
};
use crate::validation::{self, ConfigWarnings};
use error::ConfigLoadError;

pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:8090";
pub const DEFAULT_COLLECTION: &str = "users";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["fleetmap.toml", "config/fleetmap.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Directory the default config locations are relative to.
    pub search_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
    vars: Option<HashMap<String, String>>,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self {
            options,
            vars: None,
        }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_search_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.options.search_dir = Some(dir.into());
        self
    }

    /// Use these variables instead of the process environment.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let dotenv = self.read_env_file()?;
        let env_file_loaded = dotenv.is_some();
        let dotenv = dotenv.unwrap_or_default();

        let env_config = match &self.vars {
            Some(vars) => EnvConfig::from_lookup(|name| {
                vars.get(name).or_else(|| dotenv.get(name)).cloned()
            }),
            None => EnvConfig::gather_with(&dotenv),
        };

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = self.compose_config(
            file_config,
            env_config,
            config_path,
            env_file_loaded,
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    /// `.env` entries, without touching the process environment.
    fn read_env_file(
        &self,
    ) -> Result<Option<HashMap<String, String>>, ConfigLoadError> {
        let iter = match &self.options.env_file {
            Some(path) => dotenvy::from_path_iter(path),
            None => dotenvy::dotenv_iter(),
        };
        let iter = match iter {
            Ok(iter) => iter,
            Err(dotenvy::Error::Io(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut entries = HashMap::new();
        for item in iter {
            let (key, value) = item?;
            entries.insert(key, value);
        }
        Ok(Some(entries))
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match self.default_location() {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        debug!(path = %path.display(), "reading configuration file");
        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn default_location(&self) -> Option<PathBuf> {
        let root = self
            .options
            .search_dir
            .as_deref()
            .unwrap_or_else(|| Path::new("."));
        DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|candidate| candidate.is_file())
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if file_config.is_none() {
            warnings.push_with_hint(
                "No fleetmap.toml detected; using environment variables and defaults",
                "Create fleetmap.toml or set FLEETMAP_CONFIG to point at one",
            );
        }
        for (name, value) in &env.rejected {
            warnings.push_with_hint(
                format!("Ignoring unparseable {name}='{value}'"),
                "The file value or the default is used instead",
            );
        }

        let FileConfig {
            store: file_store,
            realtime: file_realtime,
            map: file_map,
            avatar: file_avatar,
        } = file_config.unwrap_or_default();

        let raw_url = env
            .store_url
            .or(file_store.base_url)
            .unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        let base_url = Url::parse(raw_url.trim()).map_err(|source| {
            ConfigLoadError::InvalidStoreUrl {
                url: raw_url.clone(),
                source,
            }
        })?;

        let store = StoreConfig {
            base_url,
            collection: env
                .collection
                .or(file_store.collection)
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            courier_roles: env
                .courier_roles
                .or(file_store.courier_roles)
                .unwrap_or_else(|| RoleSet::couriers().roles().to_vec()),
            bulk_limit: env
                .bulk_limit
                .or(file_store.bulk_limit)
                .unwrap_or(DEFAULT_BULK_LIMIT),
            request_timeout: match env.request_timeout {
                Some(timeout) => timeout,
                None => file_duration(
                    "store.request_timeout",
                    file_store.request_timeout,
                )?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            },
        };

        let realtime_defaults = RealtimeSettings::default();
        let realtime = RealtimeConfig {
            subscribe_timeout: match env.subscribe_timeout {
                Some(timeout) => timeout,
                None => file_duration(
                    "realtime.subscribe_timeout",
                    file_realtime.subscribe_timeout,
                )?
                .unwrap_or(realtime_defaults.subscribe_timeout),
            },
            max_retries: env
                .realtime_max_retries
                .or(file_realtime.max_retries)
                .unwrap_or(realtime_defaults.max_retries),
        };

        let map_defaults = MapConfig::default();
        let map = MapConfig {
            default_center: env
                .default_center
                .or(file_map
                    .default_center
                    .map(|[lat, lng]| LatLng::new(lat, lng)))
                .unwrap_or(map_defaults.default_center),
            default_zoom: env
                .default_zoom
                .or(file_map.default_zoom)
                .unwrap_or(map_defaults.default_zoom),
            min_zoom: file_map.min_zoom.unwrap_or(map_defaults.min_zoom),
            max_zoom: file_map.max_zoom.unwrap_or(map_defaults.max_zoom),
            fit_zoom_ceiling: env
                .fit_zoom_ceiling
                .or(file_map.fit_zoom_ceiling)
                .unwrap_or(map_defaults.fit_zoom_ceiling),
            focus_zoom: file_map.focus_zoom.unwrap_or(map_defaults.focus_zoom),
            viewport_width: file_map
                .viewport_width
                .unwrap_or(map_defaults.viewport_width),
            viewport_height: file_map
                .viewport_height
                .unwrap_or(map_defaults.viewport_height),
        };

        let avatar = AvatarConfig {
            placeholder: env
                .avatar_placeholder
                .or(file_avatar.placeholder)
                .unwrap_or_else(|| DEFAULT_AVATAR_PLACEHOLDER.to_string()),
            thumb: match file_avatar.thumb {
                Some(thumb) if thumb.trim().is_empty() => None,
                Some(thumb) => Some(thumb),
                None => Some(DEFAULT_AVATAR_THUMB.to_string()),
            },
        };

        let config = Config {
            store,
            realtime,
            map,
            avatar,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

fn file_duration(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<Duration>, ConfigLoadError> {
    raw.map(|value| {
        humantime::parse_duration(value.trim()).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                key,
                value: value.clone(),
                source,
            }
        })
    })
    .transpose()
}
