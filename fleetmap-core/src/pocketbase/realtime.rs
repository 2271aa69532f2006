//! PocketBase realtime: one SSE connection, topics registered per client id.
//!
//! The server opens every connection with a `PB_CONNECT` message carrying a
//! fresh client id. Topics are bound to that id with a POST, so the
//! registration is repeated after every reconnect.

use std::time::Duration;

use fleetmap_contracts::{
    StoreError,
    store::{ChangeSink, Unsubscribe},
};
use fleetmap_model::ChangeEvent;
use eventsource_stream::Event as MessageEvent;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use url::Url;

use super::client::error_message;

const CONNECT_EVENT: &str = "PB_CONNECT";
const MAX_BACKOFF_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeSettings {
    /// How long `subscribe` waits for the first registration.
    pub subscribe_timeout: Duration,
    /// Consecutive failed connections before the session gives up.
    pub max_retries: u32,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            subscribe_timeout: Duration::from_secs(10),
            max_retries: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectPayload {
    client_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionRequest<'a> {
    client_id: &'a str,
    subscriptions: [&'a str; 1],
}

/// `users/*` style topic covering every record of a collection.
pub fn collection_topic(collection: &str) -> String {
    format!("{collection}/*")
}

/// Decode one realtime message body.
pub fn parse_change(data: &str) -> Result<ChangeEvent, StoreError> {
    serde_json::from_str(data).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Delay before reconnect attempt `retry` (1-based): 1s doubling, capped.
pub fn backoff_delay(retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    Duration::from_secs(2u64.pow(exponent).min(MAX_BACKOFF_SECS))
}

/// Open a realtime session and wait until the topic is registered.
///
/// Fails as soon as the first connection or registration does. Only a
/// session that registered once reconnects with backoff. The returned
/// capability aborts the session task.
pub(crate) async fn subscribe(
    http: reqwest::Client,
    realtime_url: Url,
    topic: String,
    settings: RealtimeSettings,
    sink: ChangeSink,
) -> Result<Unsubscribe, StoreError> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let timeout = settings.subscribe_timeout;
    let session = RealtimeSession {
        http,
        realtime_url,
        topic,
        settings,
        sink,
        ready: Some(ready_tx),
        retry_count: 0,
    };
    let task = tokio::spawn(session.run());

    let registered = match tokio::time::timeout(timeout, ready_rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(StoreError::Subscribe(
            "realtime session ended before registering".into(),
        )),
        Err(_) => Err(StoreError::Timeout(timeout)),
    };

    match registered {
        Ok(()) => Ok(Unsubscribe::new(move || task.abort())),
        Err(err) => {
            task.abort();
            Err(err)
        }
    }
}

enum SessionEnd {
    /// Nobody is listening anymore.
    SinkClosed,
    Failed(StoreError),
}

struct RealtimeSession {
    http: reqwest::Client,
    realtime_url: Url,
    topic: String,
    settings: RealtimeSettings,
    sink: ChangeSink,
    ready: Option<oneshot::Sender<Result<(), StoreError>>>,
    retry_count: u32,
}

impl RealtimeSession {
    async fn run(mut self) {
        loop {
            if self.retry_count > 0 {
                let delay = backoff_delay(self.retry_count);
                info!(
                    "Retrying realtime connection after {:?} (attempt #{})",
                    delay,
                    self.retry_count + 1
                );
                tokio::time::sleep(delay).await;
            }

            match self.connect_once().await {
                SessionEnd::SinkClosed => {
                    debug!("change sink closed, ending realtime session");
                    return;
                }
                SessionEnd::Failed(err) => {
                    if let Some(ready) = self.ready.take() {
                        error!(error = %err, "realtime registration failed");
                        let _ = ready.send(Err(err));
                        return;
                    }
                    self.retry_count += 1;
                    if self.retry_count > self.settings.max_retries {
                        error!(
                            error = %err,
                            "Max retries exceeded for realtime connection"
                        );
                        // Dropping the sink closes the stream for the caller.
                        return;
                    }
                    warn!(error = %err, "realtime connection lost");
                }
            }
        }
    }

    async fn connect_once(&mut self) -> SessionEnd {
        info!(url = %self.realtime_url, "opening realtime connection");
        let request = self.http.get(self.realtime_url.clone());
        let mut source = match EventSource::new(request) {
            Ok(source) => source,
            Err(err) => {
                return SessionEnd::Failed(StoreError::Transport(err.to_string()));
            }
        };

        while let Some(event) = source.next().await {
            let message = match event {
                Ok(Event::Open) => {
                    debug!("realtime stream open");
                    continue;
                }
                Ok(Event::Message(message)) => message,
                Err(err) => {
                    source.close();
                    return SessionEnd::Failed(map_source_error(err));
                }
            };

            if message.event == CONNECT_EVENT {
                if let Err(err) = self.register(&message.id, &message.data).await {
                    source.close();
                    return SessionEnd::Failed(err);
                }
                self.retry_count = 0;
                if let Some(ready) = self.ready.take() {
                    let _ = ready.send(Ok(()));
                }
                info!(topic = %self.topic, "realtime topic registered");
            } else if message.event == self.topic {
                if !self.forward(&message) {
                    source.close();
                    return SessionEnd::SinkClosed;
                }
            } else {
                debug!(event = %message.event, "ignoring realtime message");
            }
        }

        SessionEnd::Failed(StoreError::Closed)
    }

    /// False once nobody is listening.
    fn forward(&self, message: &MessageEvent) -> bool {
        if message.data.is_empty() {
            return true;
        }
        match parse_change(&message.data) {
            Ok(change) => self.sink.send(change).is_ok(),
            Err(err) => {
                warn!(error = %err, "skipping malformed realtime message");
                true
            }
        }
    }

    async fn register(
        &self,
        event_id: &str,
        data: &str,
    ) -> Result<(), StoreError> {
        let client_id = serde_json::from_str::<ConnectPayload>(data)
            .map(|payload| payload.client_id)
            .ok()
            .filter(|id| !id.is_empty())
            .or_else(|| (!event_id.is_empty()).then(|| event_id.to_string()))
            .ok_or_else(|| {
                StoreError::Subscribe("PB_CONNECT without client id".into())
            })?;

        let body = SubscriptionRequest {
            client_id: &client_id,
            subscriptions: [self.topic.as_str()],
        };
        let response = self
            .http
            .post(self.realtime_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = error_message(response).await;
            Err(StoreError::Subscribe(format!(
                "{}: {message}",
                status.as_u16()
            )))
        }
    }
}

fn map_source_error(err: reqwest_eventsource::Error) -> StoreError {
    match err {
        reqwest_eventsource::Error::StreamEnded => StoreError::Closed,
        reqwest_eventsource::Error::InvalidStatusCode(status, _) => {
            StoreError::Status {
                status: status.as_u16(),
                message: "realtime endpoint rejected the connection".into(),
            }
        }
        other => StoreError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmap_model::ChangeAction;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let delays: Vec<u64> =
            (1..=7).map(|retry| backoff_delay(retry).as_secs()).collect();
        assert_eq!(delays, [1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(backoff_delay(u32::MAX).as_secs(), 30);
    }

    #[test]
    fn parses_realtime_payload() {
        let change = parse_change(
            r#"{"action":"update","record":{"id":"a","status":true}}"#,
        )
        .unwrap();
        assert_eq!(change.action, ChangeAction::Update);
        assert_eq!(change.record.str_field("id"), Some("a"));

        let created =
            parse_change(r#"{"action":"create","record":{"id":"b"}}"#).unwrap();
        assert_eq!(created.action, ChangeAction::Insert);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        assert!(matches!(
            parse_change("not json"),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn subscription_body_shape() {
        let body = SubscriptionRequest {
            client_id: "abc",
            subscriptions: ["users/*"],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"clientId": "abc", "subscriptions": ["users/*"]})
        );
        assert_eq!(collection_topic("users"), "users/*");
    }
}
