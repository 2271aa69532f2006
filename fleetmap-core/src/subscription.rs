//! At-most-one live change-stream subscription per mounted view.
//!
//! ```text
//! Unsubscribed -> Subscribing -> Subscribed -> Unsubscribed
//!                     |                            ^
//!                     +------- (subscribe failed) -+
//! ```

use std::fmt;
use std::sync::Arc;

use fleetmap_contracts::{
    StoreError,
    store::{RecordStore, Unsubscribe},
};
use fleetmap_model::ChangeEvent;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsubscribed => "unsubscribed",
            Self::Subscribing => "subscribing",
            Self::Subscribed => "subscribed",
        })
    }
}

/// Owns the single subscription handle of a view.
///
/// The store is passed in explicitly; there is no ambient connection.
/// Dropping the manager tears the subscription down.
pub struct SubscriptionManager {
    store: Arc<dyn RecordStore>,
    state: SubscriptionState,
    handle: Option<Unsubscribe>,
    events: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
    last_error: Option<StoreError>,
    established: u64,
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("store", &self.store)
            .field("state", &self.state)
            .field("has_handle", &self.handle.is_some())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            state: SubscriptionState::Unsubscribed,
            handle: None,
            events: None,
            last_error: None,
            established: 0,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Why the last subscription attempt failed or the stream ended.
    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    /// Subscriptions successfully established over the manager's lifetime.
    pub fn established(&self) -> u64 {
        self.established
    }

    /// Retire any current subscription, then establish a new one.
    ///
    /// On failure the manager stays `Unsubscribed` and the error is kept
    /// for [`last_error`](Self::last_error) as well as returned.
    pub async fn subscribe(&mut self) -> Result<()> {
        self.begin();
        self.establish().await
    }

    /// Retire any current subscription and enter `Subscribing`.
    ///
    /// Split from [`establish`](Self::establish) so a caller can publish
    /// the `Subscribing` state while the store call is pending.
    pub fn begin(&mut self) {
        self.teardown();
        self.state = SubscriptionState::Subscribing;
        debug!("subscribing to courier change stream");
    }

    /// Ask the store for the stream. Call after [`begin`](Self::begin).
    pub async fn establish(&mut self) -> Result<()> {
        if self.state != SubscriptionState::Subscribing {
            self.begin();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        match self.store.subscribe(tx).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.events = Some(rx);
                self.state = SubscriptionState::Subscribed;
                self.last_error = None;
                self.established += 1;
                info!("courier change stream subscribed");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "courier change stream subscribe failed");
                self.state = SubscriptionState::Unsubscribed;
                self.last_error = Some(err.clone());
                Err(CoreError::Subscribe(err))
            }
        }
    }

    /// Next event in delivery order.
    ///
    /// Pends forever while unsubscribed, so it can sit in a `select!`
    /// unconditionally. Returns `None` once when the stream closes.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        let Some(events) = self.events.as_mut() else {
            return std::future::pending().await;
        };

        match events.recv().await {
            Some(event) => Some(event),
            None => {
                warn!("courier change stream closed by store");
                self.release();
                self.last_error = Some(StoreError::Closed);
                None
            }
        }
    }

    /// Unconditional teardown. A no-op when nothing was ever established.
    pub fn teardown(&mut self) {
        if self.handle.is_some() {
            info!("tearing down courier change stream");
        }
        self.release();
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.call();
        }
        self.events = None;
        self.state = SubscriptionState::Unsubscribed;
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.release();
    }
}
