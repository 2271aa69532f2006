//! Raw backend record to canonical [`UserRow`].
//!
//! Every field check happens here and only here. Normalization is total:
//! a missing or mistyped field degrades to a documented default instead of
//! producing an error, so consumers never see backend encodings.

use std::sync::Arc;

use fleetmap_contracts::files::FileUrlResolver;
use fleetmap_model::{RawRecord, RecordId, UserRow, UserStatus};
use serde_json::Value;
use tracing::debug;

/// Display name used when a record has neither a name nor a username.
pub const UNNAMED_USER: &str = "(unnamed)";

/// Avatar shown when a record has no avatar or its URL cannot be built.
pub const DEFAULT_AVATAR_PLACEHOLDER: &str = "assets/img/placeholder-user.png";

pub const DEFAULT_AVATAR_THUMB: &str = "100x100";

/// Backend field names. The canonical model never exposes these.
pub mod fields {
    pub const ID: &str = "id";
    pub const CREATED: &str = "created";
    pub const NAME: &str = "name";
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const EMAIL_VISIBILITY: &str = "emailVisibility";
    pub const PHONE: &str = "phone";
    pub const AVATAR: &str = "avatar";
    pub const STATUS: &str = "status";
    pub const ROLE: &str = "type";
    pub const LEGACY_ROLE: &str = "rolw";
    pub const LAT: &str = "lat";
    pub const LNG: &str = "long";
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    resolver: Option<Arc<dyn FileUrlResolver>>,
    avatar_placeholder: String,
    avatar_thumb: Option<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Without a resolver every row gets the placeholder avatar.
    pub fn new() -> Self {
        Self {
            resolver: None,
            avatar_placeholder: DEFAULT_AVATAR_PLACEHOLDER.to_string(),
            avatar_thumb: Some(DEFAULT_AVATAR_THUMB.to_string()),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn FileUrlResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_avatar_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.avatar_placeholder = placeholder.into();
        self
    }

    pub fn with_avatar_thumb(mut self, thumb: Option<String>) -> Self {
        self.avatar_thumb = thumb;
        self
    }

    pub fn avatar_placeholder(&self) -> &str {
        &self.avatar_placeholder
    }

    pub fn normalize(&self, raw: &RawRecord) -> UserRow {
        UserRow {
            id: raw
                .str_field(fields::ID)
                .map(RecordId::from)
                .unwrap_or_default(),
            created: raw.non_empty_str(fields::CREATED).map(str::to_string),
            name: raw
                .non_empty_str(fields::NAME)
                .or_else(|| raw.non_empty_str(fields::USERNAME))
                .unwrap_or(UNNAMED_USER)
                .to_string(),
            email: if raw.is_truthy(fields::EMAIL_VISIBILITY) {
                raw.non_empty_str(fields::EMAIL).map(str::to_string)
            } else {
                None
            },
            phone: raw.str_field(fields::PHONE).unwrap_or_default().to_string(),
            role: role_values(raw).next().map(str::to_string),
            status: normalize_status(raw.get(fields::STATUS)),
            lat: raw.number_field(fields::LAT),
            lng: raw.number_field(fields::LNG),
            avatar_url: self.avatar_url(raw),
        }
    }

    fn avatar_url(&self, raw: &RawRecord) -> String {
        let (Some(resolver), Some(file_name)) =
            (&self.resolver, raw.non_empty_str(fields::AVATAR))
        else {
            return self.avatar_placeholder.clone();
        };

        match resolver.file_url(raw, file_name, self.avatar_thumb.as_deref()) {
            Ok(url) => url,
            Err(err) => {
                debug!(
                    id = raw.str_field(fields::ID).unwrap_or_default(),
                    error = %err,
                    "avatar url unavailable, using placeholder"
                );
                self.avatar_placeholder.clone()
            }
        }
    }
}

/// Collapse `true` / `"active"` to active; anything else is inactive.
pub fn normalize_status(value: Option<&Value>) -> UserStatus {
    match value {
        Some(Value::Bool(true)) => UserStatus::Active,
        Some(Value::String(text)) if text == "active" => UserStatus::Active,
        _ => UserStatus::Inactive,
    }
}

/// Non-empty role values in precedence order: primary field, then legacy.
pub fn role_values(raw: &RawRecord) -> impl Iterator<Item = &str> {
    [fields::ROLE, fields::LEGACY_ROLE]
        .into_iter()
        .filter_map(|key| raw.non_empty_str(key))
}
