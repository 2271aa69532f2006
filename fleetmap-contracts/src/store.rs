use crate::error::StoreError;

use async_trait::async_trait;
use fleetmap_model::{ChangeEvent, RawRecord, RoleSet};
use std::fmt;
use tokio::sync::mpsc;

/// Where a store delivers change events, one at a time, in delivery order.
pub type ChangeSink = mpsc::UnboundedSender<ChangeEvent>;

/// Bulk-list parameters: records whose role matches `roles`, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleQuery {
    pub roles: RoleSet,
    pub limit: usize,
}

impl RoleQuery {
    pub fn new(roles: RoleSet, limit: usize) -> Self {
        Self { roles, limit }
    }
}

/// Remote record store backing the dashboard.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Up to `query.limit` records matching the role set, sorted by creation
    /// time descending.
    async fn list_by_roles(
        &self,
        query: &RoleQuery,
    ) -> Result<Vec<RawRecord>, StoreError>;

    /// Start forwarding collection changes into `sink`.
    ///
    /// Resolves once the subscription is live. The returned capability stops
    /// delivery when invoked.
    async fn subscribe(&self, sink: ChangeSink)
    -> Result<Unsubscribe, StoreError>;
}

/// Opaque "stop listening" capability handed out by a subscription.
///
/// Invoking it more than once is impossible by construction; dropping it
/// without calling [`Unsubscribe::call`] leaves the subscription running.
pub struct Unsubscribe(Box<dyn FnOnce() + Send + 'static>);

impl Unsubscribe {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(release))
    }

    /// A capability that releases nothing.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn call(self) {
        (self.0)()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe(..)")
    }
}
