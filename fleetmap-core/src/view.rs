//! Mount-scoped courier state.
//!
//! The bulk load and the change stream are not transactionally linked, so
//! the view accepts stream events at any time. Events that land before the
//! bulk load are applied right away and remembered; once the load arrives
//! they are replayed on top of it, so neither source can undo the other.

use fleetmap_model::{
    ChangeAction, ChangeEvent, LatLng, RawRecord, RecordId, RoleSet,
};
use tracing::{debug, info};

use crate::geo;
use crate::normalize::{Normalizer, role_values};
use crate::reconcile::{self, CourierSnapshot, ReconcileOutcome};

/// Identifies one bulk load. Results carrying a stale ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewChange {
    BulkLoaded { rows: usize, replayed: usize },
    BulkLoadFailed,
    Reconciled(ReconcileOutcome),
    /// Late result for an unmounted view or a superseded load.
    Discarded,
}

/// What the caller should do after feeding the view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewUpdate {
    pub change: ViewChange,
    /// The active-with-coords set may have moved; re-derive the viewport.
    pub refit: bool,
}

impl ViewUpdate {
    fn discarded() -> Self {
        Self {
            change: ViewChange::Discarded,
            refit: false,
        }
    }
}

#[derive(Debug)]
pub struct CourierView {
    normalizer: Normalizer,
    roles: RoleSet,
    snapshot: CourierSnapshot,
    mounted: bool,
    generation: u64,
    awaiting_load: bool,
    early_events: Vec<ChangeEvent>,
    fitted_positions: Vec<(RecordId, LatLng)>,
}

impl CourierView {
    pub fn new(normalizer: Normalizer, roles: RoleSet) -> Self {
        Self {
            normalizer,
            roles,
            snapshot: CourierSnapshot::empty(),
            mounted: false,
            generation: 0,
            awaiting_load: false,
            early_events: Vec::new(),
            fitted_positions: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> &CourierSnapshot {
        &self.snapshot
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_loading(&self) -> bool {
        self.awaiting_load
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Start a fresh mount with an empty collection.
    pub fn mount(&mut self) -> LoadTicket {
        self.mounted = true;
        self.snapshot = CourierSnapshot::empty();
        self.fitted_positions.clear();
        self.begin_load()
    }

    /// Request another bulk load for the current mount. Rows stay visible
    /// until the new load lands.
    pub fn reload(&mut self) -> Option<LoadTicket> {
        self.mounted.then(|| self.begin_load())
    }

    /// Discard all state. Later results for this mount are dropped.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.generation += 1;
        self.awaiting_load = false;
        self.early_events.clear();
        self.snapshot = CourierSnapshot::empty();
        self.fitted_positions.clear();
    }

    fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.awaiting_load = true;
        self.early_events.clear();
        LoadTicket {
            generation: self.generation,
        }
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.mounted && ticket.generation == self.generation
    }

    pub fn complete_bulk_load(
        &mut self,
        ticket: LoadTicket,
        records: Vec<RawRecord>,
    ) -> ViewUpdate {
        if !self.is_current(ticket) {
            debug!(
                generation = ticket.generation,
                "discarding stale courier bulk load"
            );
            return ViewUpdate::discarded();
        }

        let rows = records
            .iter()
            .map(|record| self.normalizer.normalize(record))
            .filter(|row| !row.id.is_empty())
            .collect();
        self.snapshot = CourierSnapshot::from_bulk_load(rows);
        let loaded = self.snapshot.len();

        let early = std::mem::take(&mut self.early_events);
        let replayed = early.len();
        for event in &early {
            self.snapshot =
                reconcile::apply(&self.snapshot, event, &self.normalizer)
                    .snapshot;
        }
        self.awaiting_load = false;
        self.fitted_positions = geo::active_positions(&self.snapshot);

        info!(
            rows = self.snapshot.len(),
            loaded, replayed, "courier bulk load applied"
        );
        ViewUpdate {
            change: ViewChange::BulkLoaded {
                rows: self.snapshot.len(),
                replayed,
            },
            refit: true,
        }
    }

    /// The load failed; the stream keeps the view alive with what it has.
    pub fn fail_bulk_load(&mut self, ticket: LoadTicket) -> ViewUpdate {
        if !self.is_current(ticket) {
            return ViewUpdate::discarded();
        }
        self.awaiting_load = false;
        self.early_events.clear();
        ViewUpdate {
            change: ViewChange::BulkLoadFailed,
            refit: false,
        }
    }

    /// Reconcile one stream event in delivery order.
    pub fn apply_event(&mut self, event: ChangeEvent) -> ViewUpdate {
        if !self.mounted {
            return ViewUpdate::discarded();
        }

        let event = self.scope_to_roles(event);
        let result =
            reconcile::apply(&self.snapshot, &event, &self.normalizer);
        self.snapshot = result.snapshot;

        if self.awaiting_load {
            self.early_events.push(event);
        }

        let refit = result.outcome.changed() && self.positions_moved();
        ViewUpdate {
            change: ViewChange::Reconciled(result.outcome),
            refit,
        }
    }

    /// A record that names roles, none of them tracked, leaves the view.
    /// Records that carry no role fields are partial updates and pass.
    fn scope_to_roles(&self, event: ChangeEvent) -> ChangeEvent {
        if matches!(event.action, ChangeAction::Delete) {
            return event;
        }
        let tracked = {
            let mut roles = role_values(&event.record).peekable();
            roles.peek().is_none() || self.roles.matches_any(roles)
        };
        if tracked {
            return event;
        }
        debug!("record outside tracked roles, treating as delete");
        ChangeEvent {
            action: ChangeAction::Delete,
            record: event.record,
        }
    }

    fn positions_moved(&mut self) -> bool {
        let positions = geo::active_positions(&self.snapshot);
        if positions == self.fitted_positions {
            return false;
        }
        self.fitted_positions = positions;
        true
    }
}
