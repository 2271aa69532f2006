use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use fleetmap_contracts::{
    StoreError,
    store::{ChangeSink, RecordStore, RoleQuery, Unsubscribe},
};
use fleetmap_model::RawRecord;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::filter::role_filter;
use super::realtime::{self, RealtimeSettings, collection_topic};

/// Fields requested from the list endpoint: everything the normalizer and
/// the file resolver read.
pub const USER_FIELDS: &str = "id,created,name,username,email,emailVisibility,\
phone,avatar,status,type,rolw,lat,long,collectionId,collectionName";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PocketBase-backed [`RecordStore`] for one collection.
#[derive(Clone)]
pub struct PocketBaseClient {
    http: Client,
    /// No total timeout: the realtime response body never ends.
    stream_http: Client,
    base_url: Url,
    collection: String,
    request_timeout: Duration,
    realtime: RealtimeSettings,
}

impl fmt::Debug for PocketBaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PocketBaseClient")
            .field("base_url", &self.base_url.as_str())
            .field("collection", &self.collection)
            .field("request_timeout", &self.request_timeout)
            .field("realtime", &self.realtime)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

impl PocketBaseClient {
    pub fn new(
        base_url: &str,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url).map_err(|err| {
            StoreError::Endpoint(format!("'{base_url}': {err}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(StoreError::Endpoint(format!(
                "'{base_url}' is not an http(s) URL"
            )));
        }

        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(StoreError::Endpoint("collection name is empty".into()));
        }

        info!(%base_url, %collection, "creating PocketBase client");
        Ok(Self {
            http: build_http(Some(DEFAULT_REQUEST_TIMEOUT))?,
            stream_http: build_http(None)?,
            base_url,
            collection,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            realtime: RealtimeSettings::default(),
        })
    }

    /// Total timeout for list requests.
    pub fn with_request_timeout(
        mut self,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        self.http = build_http(Some(timeout))?;
        self.request_timeout = timeout;
        Ok(self)
    }

    pub fn with_realtime(mut self, settings: RealtimeSettings) -> Self {
        self.realtime = settings;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::Endpoint(format!(
                    "'{}' cannot be a base URL",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET /api/collections/{collection}/records` for the given query.
    pub fn list_url(&self, query: &RoleQuery) -> Result<Url, StoreError> {
        let mut url = self.endpoint(&[
            "api",
            "collections",
            self.collection.as_str(),
            "records",
        ])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("page", "1")
                .append_pair("perPage", &query.limit.to_string())
                .append_pair("sort", "-created")
                .append_pair("fields", USER_FIELDS);
            if let Some(filter) = role_filter(&query.roles) {
                pairs.append_pair("filter", &filter);
            }
        }
        Ok(url)
    }

    pub fn realtime_url(&self) -> Result<Url, StoreError> {
        self.endpoint(&["api", "realtime"])
    }
}

fn build_http(timeout: Option<Duration>) -> Result<Client, StoreError> {
    let builder = Client::builder().connect_timeout(STREAM_CONNECT_TIMEOUT);
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    builder
        .build()
        .map_err(|err| StoreError::Transport(err.to_string()))
}

/// The `message` of a PocketBase error body, or the raw body.
pub(super) async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.message)
        .unwrap_or(body)
}

async fn status_error(
    status: StatusCode,
    response: reqwest::Response,
) -> StoreError {
    StoreError::Status {
        status: status.as_u16(),
        message: error_message(response).await,
    }
}

#[async_trait]
impl RecordStore for PocketBaseClient {
    async fn list_by_roles(
        &self,
        query: &RoleQuery,
    ) -> Result<Vec<RawRecord>, StoreError> {
        if query.roles.is_empty() || query.limit == 0 {
            return Ok(Vec::new());
        }
        let url = self.list_url(query)?;
        debug!(%url, "listing records");

        let response = self.http.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                StoreError::Timeout(self.request_timeout)
            } else {
                StoreError::Transport(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let list: ListResponse = response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        debug!(count = list.items.len(), "records listed");
        Ok(list.items)
    }

    async fn subscribe(
        &self,
        sink: ChangeSink,
    ) -> Result<Unsubscribe, StoreError> {
        realtime::subscribe(
            self.stream_http.clone(),
            self.realtime_url()?,
            collection_topic(&self.collection),
            self.realtime.clone(),
            sink,
        )
        .await
    }
}
