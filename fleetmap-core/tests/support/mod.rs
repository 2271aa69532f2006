#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetmap_core::contracts::StoreError;
use fleetmap_core::contracts::store::{
    ChangeSink, RecordStore, RoleQuery, Unsubscribe,
};
use fleetmap_core::normalize::Normalizer;
use fleetmap_core::tracker::{
    CourierTracker, TrackerHandle, TrackerSettings, TrackerSnapshot,
};
use fleetmap_core::viewport::HeadlessMap;
use fleetmap_core::{ChangeEvent, RawRecord};
use serde_json::Value;
use tokio::sync::Notify;

/// In-memory record store. Bulk loads can be held back with [`gated`].
#[derive(Debug, Default)]
pub struct FakeStore {
    records: Mutex<Vec<RawRecord>>,
    gate: Option<Arc<Notify>>,
    subscribe_gate: Option<Arc<Notify>>,
    sinks: Mutex<Vec<ChangeSink>>,
    active: Arc<AtomicUsize>,
    subscribe_calls: AtomicUsize,
    list_calls: AtomicUsize,
    fail_subscribe: AtomicBool,
    fail_list: AtomicBool,
}

impl FakeStore {
    pub fn with_records(records: Vec<Value>) -> Arc<Self> {
        let store = Self::default();
        store.set_records(records);
        Arc::new(store)
    }

    /// Bulk loads block until [`release_load`](Self::release_load).
    pub fn gated(records: Vec<Value>) -> Arc<Self> {
        let store = Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::default()
        };
        store.set_records(records);
        Arc::new(store)
    }

    /// Subscribe calls block until
    /// [`release_subscribe`](Self::release_subscribe).
    pub fn gated_subscribe(records: Vec<Value>) -> Arc<Self> {
        let store = Self {
            subscribe_gate: Some(Arc::new(Notify::new())),
            ..Self::default()
        };
        store.set_records(records);
        Arc::new(store)
    }

    pub fn set_records(&self, records: Vec<Value>) {
        *self.records.lock().unwrap() =
            records.into_iter().map(RawRecord::from_value).collect();
    }

    pub fn release_load(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn release_subscribe(&self) {
        if let Some(gate) = &self.subscribe_gate {
            gate.notify_one();
        }
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Deliver an event on the most recent subscription.
    pub fn push(&self, action: &str, record: Value) -> bool {
        let sinks = self.sinks.lock().unwrap();
        sinks.last().is_some_and(|sink| {
            sink.send(ChangeEvent::new(action, RawRecord::from_value(record)))
                .is_ok()
        })
    }

    /// Drop every sink, as a store does when its connection dies.
    pub fn close_streams(&self) {
        self.sinks.lock().unwrap().clear();
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn list_by_roles(
        &self,
        query: &RoleQuery,
    ) -> Result<Vec<RawRecord>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 500,
                message: "boom".into(),
            });
        }
        let records = self.records.lock().unwrap();
        Ok(records.iter().take(query.limit).cloned().collect())
    }

    async fn subscribe(
        &self,
        sink: ChangeSink,
    ) -> Result<Unsubscribe, StoreError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.subscribe_gate {
            gate.notified().await;
        }
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(StoreError::Subscribe("realtime disabled".into()));
        }
        self.sinks.lock().unwrap().push(sink);
        self.active.fetch_add(1, Ordering::SeqCst);
        let active = Arc::clone(&self.active);
        Ok(Unsubscribe::new(move || {
            active.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}

pub fn spawn_tracker(store: Arc<FakeStore>) -> TrackerHandle {
    spawn_tracker_with(store, TrackerSettings::default())
}

pub fn spawn_tracker_with(
    store: Arc<FakeStore>,
    settings: TrackerSettings,
) -> TrackerHandle {
    let (map, map_events) = HeadlessMap::with_channel(&settings.map);
    CourierTracker::new(
        store,
        Normalizer::new(),
        Box::new(map),
        map_events,
        settings,
    )
    .spawn()
}

/// Wait for a published snapshot matching `ready`.
pub async fn wait_for<F>(handle: &TrackerHandle, ready: F) -> TrackerSnapshot
where
    F: FnMut(&TrackerSnapshot) -> bool,
{
    let mut updates = handle.updates();
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(ready))
        .await
        .expect("timed out waiting for tracker snapshot")
        .expect("tracker stopped publishing")
        .clone()
}

pub fn row_ids(snapshot: &TrackerSnapshot) -> Vec<&str> {
    snapshot.rows.iter().map(|row| row.id.as_str()).collect()
}
