//! The courier map's event loop.
//!
//! One task owns the view, the subscription, the map widget and the zoom
//! clamp. Bulk-load results, stream events, widget notifications and
//! operator commands are funnelled into it and handled one at a time, so
//! the collection is never observed half-updated.

use std::fmt;
use std::sync::Arc;

use fleetmap_contracts::{
    StoreError,
    map::{MapNotification, MapWidget},
    store::{RecordStore, RoleQuery},
};
use fleetmap_model::{
    LatLng, Marker, RawRecord, RecordId, RoleSet, UserRow,
};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::geo;
use crate::normalize::Normalizer;
use crate::subscription::{SubscriptionManager, SubscriptionState};
use crate::view::{CourierView, LoadTicket, ViewChange, ViewUpdate};
use crate::viewport::{self, MapSettings, MapState, ZoomClamp};

/// Records requested by the initial load.
pub const DEFAULT_BULK_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub roles: RoleSet,
    pub bulk_limit: usize,
    pub map: MapSettings,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            roles: RoleSet::couriers(),
            bulk_limit: DEFAULT_BULK_LIMIT,
            map: MapSettings::default(),
        }
    }
}

/// Operator intents delivered to a running tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCommand {
    /// Bulk-load again and re-establish the change stream.
    Reload,
    /// Re-fit the viewport to the current active couriers.
    Refit,
    /// Autocomplete picked a place. Remembered, not shown.
    PlaceSelected(LatLng),
    /// Move to the last picked place.
    GoToSearch,
    CenterOnUser(RecordId),
    OperatorLocated(LatLng),
    Shutdown,
}

/// Everything a renderer needs, published after every handled input.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub revision: u64,
    pub rows: Vec<UserRow>,
    pub markers: Vec<Marker>,
    pub has_couriers: bool,
    pub map: MapState,
    pub subscription: SubscriptionState,
    pub loading: bool,
    /// Why live updates are unavailable, if they are.
    pub stream_error: Option<String>,
    pub load_error: Option<String>,
}

impl TrackerSnapshot {
    /// Located couriers of any status, for the list beside the map.
    pub fn side_list(&self) -> impl Iterator<Item = &UserRow> {
        self.rows.iter().filter(|row| geo::has_coords(row))
    }
}

type LoadResult = (LoadTicket, std::result::Result<Vec<RawRecord>, StoreError>);

pub struct CourierTracker {
    store: Arc<dyn RecordStore>,
    view: CourierView,
    subscriptions: SubscriptionManager,
    map: Box<dyn MapWidget>,
    map_events: mpsc::UnboundedReceiver<MapNotification>,
    clamp: ZoomClamp,
    map_state: MapState,
    settings: TrackerSettings,
    load_error: Option<String>,
    revision: u64,
}

impl fmt::Debug for CourierTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierTracker")
            .field("view", &self.view)
            .field("subscriptions", &self.subscriptions)
            .field("map", &self.map)
            .field("clamp", &self.clamp)
            .field("map_state", &self.map_state)
            .finish_non_exhaustive()
    }
}

impl CourierTracker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        normalizer: Normalizer,
        map: Box<dyn MapWidget>,
        map_events: mpsc::UnboundedReceiver<MapNotification>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            subscriptions: SubscriptionManager::new(Arc::clone(&store)),
            store,
            view: CourierView::new(normalizer, settings.roles.clone()),
            map,
            map_events,
            clamp: ZoomClamp::new(settings.map.fit_zoom_ceiling),
            map_state: MapState::new(&settings.map),
            settings,
            load_error: None,
            revision: 0,
        }
    }

    /// Mount the view and drive it on the current runtime until shutdown.
    pub fn spawn(mut self) -> TrackerHandle {
        let ticket = self.view.mount();
        info!(roles = ?self.settings.roles.roles(), "courier view mounted");

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates) = watch::channel(self.snapshot());
        let task = tokio::spawn(self.run(ticket, command_rx, updates_tx));
        TrackerHandle {
            commands,
            updates,
            task,
        }
    }

    async fn run(
        mut self,
        ticket: LoadTicket,
        mut commands: mpsc::UnboundedReceiver<TrackerCommand>,
        updates: watch::Sender<TrackerSnapshot>,
    ) {
        let (load_tx, mut load_rx) = mpsc::unbounded_channel::<LoadResult>();

        self.start_bulk_load(ticket, &load_tx);
        self.resubscribe(&updates).await;
        self.publish(&updates);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(TrackerCommand::Shutdown) | None => break,
                    Some(command) => {
                        self.handle_command(command, &load_tx, &updates).await;
                    }
                },
                Some((ticket, result)) = load_rx.recv() => {
                    self.handle_load(ticket, result);
                }
                event = self.subscriptions.next_event() => {
                    if let Some(event) = event {
                        let update = self.view.apply_event(event);
                        self.after_update(update);
                    }
                }
                Some(notice) = self.map_events.recv() => {
                    self.handle_map_notice(notice);
                }
            }
            self.publish(&updates);
        }

        self.subscriptions.teardown();
        self.view.unmount();
        self.publish(&updates);
        info!("courier view unmounted");
    }

    async fn handle_command(
        &mut self,
        command: TrackerCommand,
        load_tx: &mpsc::UnboundedSender<LoadResult>,
        updates: &watch::Sender<TrackerSnapshot>,
    ) {
        debug!(?command, "tracker command");
        match command {
            TrackerCommand::Reload => {
                if let Some(ticket) = self.view.reload() {
                    self.start_bulk_load(ticket, load_tx);
                    self.resubscribe(updates).await;
                }
            }
            TrackerCommand::Refit => self.refit(),
            TrackerCommand::PlaceSelected(place) => {
                self.map_state.place_selected(place);
            }
            TrackerCommand::GoToSearch => {
                if !self
                    .map_state
                    .go_to_search(self.map.as_mut(), &self.settings.map)
                {
                    debug!("no place selected yet");
                }
            }
            TrackerCommand::CenterOnUser(id) => {
                match self.view.snapshot().get(&id) {
                    Some(row) => {
                        self.map_state.center_on_user(
                            self.map.as_mut(),
                            &self.settings.map,
                            row,
                        );
                    }
                    None => debug!(%id, "center requested for unknown courier"),
                }
            }
            TrackerCommand::OperatorLocated(at) => {
                self.map_state.operator_located(self.map.as_mut(), at);
            }
            TrackerCommand::Shutdown => {}
        }
    }

    fn start_bulk_load(
        &self,
        ticket: LoadTicket,
        load_tx: &mpsc::UnboundedSender<LoadResult>,
    ) {
        let store = Arc::clone(&self.store);
        let query =
            RoleQuery::new(self.settings.roles.clone(), self.settings.bulk_limit);
        let load_tx = load_tx.clone();
        tokio::spawn(async move {
            let result = store.list_by_roles(&query).await;
            // Tracker already gone: the result is dropped with the channel.
            let _ = load_tx.send((ticket, result));
        });
    }

    /// Subscribers see `Subscribing` while the store call is pending.
    async fn resubscribe(
        &mut self,
        updates: &watch::Sender<TrackerSnapshot>,
    ) {
        self.subscriptions.begin();
        self.publish(updates);
        if let Err(err) = self.subscriptions.establish().await {
            warn!(error = %err, "live courier updates unavailable");
        }
    }

    fn handle_load(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<Vec<RawRecord>, StoreError>,
    ) {
        let update = match result {
            Ok(records) => {
                let update = self.view.complete_bulk_load(ticket, records);
                if update.change != ViewChange::Discarded {
                    self.load_error = None;
                }
                update
            }
            Err(err) => {
                let update = self.view.fail_bulk_load(ticket);
                if update.change == ViewChange::BulkLoadFailed {
                    warn!(error = %err, "courier bulk load failed");
                    self.load_error = Some(err.to_string());
                }
                update
            }
        };
        self.after_update(update);
    }

    fn after_update(&mut self, update: ViewUpdate) {
        if update.change == ViewChange::Discarded {
            return;
        }
        self.map.set_markers(&geo::markers(self.view.snapshot()));
        if update.refit {
            self.refit();
        }
    }

    fn refit(&mut self) {
        let active = geo::active_with_coords(self.view.snapshot());
        match viewport::fit(self.map.as_mut(), &mut self.clamp, active) {
            Some(bounds) => debug!(?bounds, "viewport fitted to couriers"),
            None => debug!("no active couriers, viewport left as is"),
        }
        self.map_state.sync_from(self.map.as_ref());
    }

    fn handle_map_notice(&mut self, notice: MapNotification) {
        match notice {
            MapNotification::BoundsChanged => {
                self.clamp.on_bounds_changed(self.map.as_mut());
                self.map_state.sync_from(self.map.as_ref());
            }
        }
    }

    fn snapshot(&self) -> TrackerSnapshot {
        let couriers = self.view.snapshot();
        TrackerSnapshot {
            revision: self.revision,
            rows: couriers.rows().to_vec(),
            markers: geo::markers(couriers),
            has_couriers: geo::has_couriers(couriers),
            map: self.map_state.clone(),
            subscription: self.subscriptions.state(),
            loading: self.view.is_loading(),
            stream_error: self
                .subscriptions
                .last_error()
                .map(ToString::to_string),
            load_error: self.load_error.clone(),
        }
    }

    fn publish(&mut self, updates: &watch::Sender<TrackerSnapshot>) {
        self.revision += 1;
        updates.send_replace(self.snapshot());
    }
}

/// Control side of a spawned [`CourierTracker`].
///
/// Dropping the handle stops the tracker and tears its subscription down.
#[derive(Debug)]
pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<TrackerCommand>,
    updates: watch::Receiver<TrackerSnapshot>,
    task: JoinHandle<()>,
}

impl TrackerHandle {
    pub fn updates(&self) -> watch::Receiver<TrackerSnapshot> {
        self.updates.clone()
    }

    pub fn current(&self) -> TrackerSnapshot {
        self.updates.borrow().clone()
    }

    pub fn send(&self, command: TrackerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::TrackerStopped)
    }

    pub fn reload(&self) -> Result<()> {
        self.send(TrackerCommand::Reload)
    }

    pub fn refit(&self) -> Result<()> {
        self.send(TrackerCommand::Refit)
    }

    pub fn place_selected(&self, place: LatLng) -> Result<()> {
        self.send(TrackerCommand::PlaceSelected(place))
    }

    pub fn go_to_search(&self) -> Result<()> {
        self.send(TrackerCommand::GoToSearch)
    }

    pub fn center_on_user(&self, id: impl Into<RecordId>) -> Result<()> {
        self.send(TrackerCommand::CenterOnUser(id.into()))
    }

    pub fn operator_located(&self, at: LatLng) -> Result<()> {
        self.send(TrackerCommand::OperatorLocated(at))
    }

    /// Stop the loop and wait for teardown to finish.
    pub async fn shutdown(self) -> Result<()> {
        // A closed channel means the loop already exited.
        let _ = self.commands.send(TrackerCommand::Shutdown);
        self.task
            .await
            .map_err(|err| CoreError::Internal(err.to_string()))
    }
}
