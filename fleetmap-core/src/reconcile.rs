//! Change reconciliation: one event in, one new immutable snapshot out.
//!
//! Snapshots are never mutated in place. [`apply`] builds a fresh sequence
//! so callers can diff the previous and next snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use fleetmap_model::{ChangeAction, ChangeEvent, RecordId, UserRow};
use tracing::{debug, warn};

use crate::normalize::Normalizer;

/// Ordered, id-unique courier collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourierSnapshot {
    rows: Arc<[UserRow]>,
}

impl CourierSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keeps the given order; later duplicates of an id are dropped.
    pub fn from_rows(rows: Vec<UserRow>) -> Self {
        let mut seen = HashSet::with_capacity(rows.len());
        let rows: Vec<UserRow> = rows
            .into_iter()
            .filter(|row| seen.insert(row.id.clone()))
            .collect();
        Self { rows: rows.into() }
    }

    /// Initial-load ordering: newest `created` first, rows without a
    /// timestamp last, ties keep their input order.
    pub fn from_bulk_load(mut rows: Vec<UserRow>) -> Self {
        rows.sort_by(|a, b| b.created.cmp(&a.created));
        Self::from_rows(rows)
    }

    pub fn rows(&self) -> &[UserRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UserRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.rows.iter().position(|row| &row.id == id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&UserRow> {
        self.rows.iter().find(|row| &row.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.rows.iter().map(|row| &row.id)
    }
}

impl<'a> IntoIterator for &'a CourierSnapshot {
    type Item = &'a UserRow;
    type IntoIter = std::slice::Iter<'a, UserRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Why an event left the collection untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The record carried no usable id.
    MissingId,
    /// Delete for an id the collection does not hold.
    AbsentId,
    UnrecognizedAction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// New id, prepended at index 0.
    Inserted,
    /// Existing id merged in place.
    Updated { index: usize },
    Removed { index: usize },
    Ignored(IgnoreReason),
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Ignored(_))
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub snapshot: CourierSnapshot,
    pub outcome: ReconcileOutcome,
}

/// Apply a single change event.
///
/// Any non-delete action resolves by id: a match is merged in place, a miss
/// is prepended, whatever the declared action was. Deleting an absent id is
/// a no-op. Unrecognized action tags are ignored.
pub fn apply(
    snapshot: &CourierSnapshot,
    event: &ChangeEvent,
    normalizer: &Normalizer,
) -> Reconciled {
    let incoming = normalizer.normalize(&event.record);

    let outcome_only = |reason: IgnoreReason| Reconciled {
        snapshot: snapshot.clone(),
        outcome: ReconcileOutcome::Ignored(reason),
    };

    if incoming.id.is_empty() {
        warn!(action = %event.action, "change event without record id ignored");
        return outcome_only(IgnoreReason::MissingId);
    }

    let existing = snapshot.position(&incoming.id);

    match (&event.action, existing) {
        (ChangeAction::Unrecognized(tag), _) => {
            warn!(
                action = %tag,
                id = %incoming.id,
                "unrecognized change action ignored"
            );
            outcome_only(IgnoreReason::UnrecognizedAction(tag.clone()))
        }
        (ChangeAction::Delete, None) => {
            debug!(id = %incoming.id, "delete for untracked id");
            outcome_only(IgnoreReason::AbsentId)
        }
        (ChangeAction::Delete, Some(index)) => {
            let mut rows = snapshot.rows().to_vec();
            rows.remove(index);
            debug!(id = %incoming.id, index, "row removed");
            Reconciled {
                snapshot: CourierSnapshot { rows: rows.into() },
                outcome: ReconcileOutcome::Removed { index },
            }
        }
        (ChangeAction::Insert | ChangeAction::Update, Some(index)) => {
            let mut rows = snapshot.rows().to_vec();
            let merged = merge_rows(&rows[index], incoming);
            rows[index] = merged;
            debug!(id = %rows[index].id, index, "row merged");
            Reconciled {
                snapshot: CourierSnapshot { rows: rows.into() },
                outcome: ReconcileOutcome::Updated { index },
            }
        }
        (ChangeAction::Insert | ChangeAction::Update, None) => {
            debug!(id = %incoming.id, action = %event.action, "row prepended");
            let mut rows = Vec::with_capacity(snapshot.len() + 1);
            rows.push(incoming);
            rows.extend(snapshot.rows().iter().cloned());
            Reconciled {
                snapshot: CourierSnapshot { rows: rows.into() },
                outcome: ReconcileOutcome::Inserted,
            }
        }
    }
}

/// Shallow merge with `previous` as the base: every field the normalizer
/// produced on `next` wins, optional fields it left empty keep their old
/// value.
pub fn merge_rows(previous: &UserRow, next: UserRow) -> UserRow {
    UserRow {
        id: next.id,
        created: next.created.or_else(|| previous.created.clone()),
        name: next.name,
        email: next.email.or_else(|| previous.email.clone()),
        phone: next.phone,
        role: next.role.or_else(|| previous.role.clone()),
        status: next.status,
        lat: next.lat.or(previous.lat),
        lng: next.lng.or(previous.lng),
        avatar_url: next.avatar_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmap_model::{RawRecord, UserStatus};
    use serde_json::{Value, json};

    fn event(action: &str, record: Value) -> ChangeEvent {
        ChangeEvent::new(action, RawRecord::from_value(record))
    }

    fn seeded(ids: &[&str]) -> CourierSnapshot {
        let normalizer = Normalizer::new();
        CourierSnapshot::from_rows(
            ids.iter()
                .map(|id| {
                    normalizer.normalize(&RawRecord::from_value(json!({
                        "id": id,
                        "status": true,
                        "lat": 1.0,
                        "long": 2.0,
                    })))
                })
                .collect(),
        )
    }

    fn ids(snapshot: &CourierSnapshot) -> Vec<&str> {
        snapshot.ids().map(RecordId::as_str).collect()
    }

    #[test]
    fn delete_removes_in_place_and_is_idempotent() {
        let normalizer = Normalizer::new();
        let start = seeded(&["a", "b", "c"]);
        let delete_b = event("delete", json!({"id": "b"}));

        let once = apply(&start, &delete_b, &normalizer);
        assert_eq!(once.outcome, ReconcileOutcome::Removed { index: 1 });
        assert_eq!(ids(&once.snapshot), ["a", "c"]);

        let twice = apply(&once.snapshot, &delete_b, &normalizer);
        assert_eq!(
            twice.outcome,
            ReconcileOutcome::Ignored(IgnoreReason::AbsentId)
        );
        assert_eq!(twice.snapshot, once.snapshot);
    }

    #[test]
    fn update_keeps_position_and_neighbours() {
        let normalizer = Normalizer::new();
        let start = seeded(&["a", "b", "c"]);
        let result = apply(
            &start,
            &event("update", json!({"id": "b", "status": false})),
            &normalizer,
        );

        assert_eq!(result.outcome, ReconcileOutcome::Updated { index: 1 });
        assert_eq!(ids(&result.snapshot), ["a", "b", "c"]);
        let b = &result.snapshot.rows()[1];
        assert_eq!(b.status, UserStatus::Inactive);
        assert_eq!((b.lat, b.lng), (Some(1.0), Some(2.0)));
        assert_eq!(result.snapshot.rows()[0], start.rows()[0]);
        assert_eq!(result.snapshot.rows()[2], start.rows()[2]);
    }

    #[test]
    fn update_for_unknown_id_prepends_once() {
        let normalizer = Normalizer::new();
        let start = seeded(&["a", "b"]);
        let result = apply(
            &start,
            &event("update", json!({"id": "z", "status": "active"})),
            &normalizer,
        );

        assert_eq!(result.outcome, ReconcileOutcome::Inserted);
        assert_eq!(ids(&result.snapshot), ["z", "a", "b"]);

        let again = apply(
            &result.snapshot,
            &event("insert", json!({"id": "z"})),
            &normalizer,
        );
        assert_eq!(again.outcome, ReconcileOutcome::Updated { index: 0 });
        assert_eq!(ids(&again.snapshot), ["z", "a", "b"]);
    }

    #[test]
    fn input_snapshot_is_not_mutated() {
        let normalizer = Normalizer::new();
        let start = seeded(&["a"]);
        let before = start.clone();
        let _ = apply(
            &start,
            &event("update", json!({"id": "a", "lat": 50.0})),
            &normalizer,
        );
        let _ = apply(&start, &event("delete", json!({"id": "a"})), &normalizer);
        assert_eq!(start, before);
    }

    #[test]
    fn unrecognized_and_idless_events_are_ignored() {
        let normalizer = Normalizer::new();
        let start = seeded(&["a"]);

        let odd = apply(
            &start,
            &event("archive", json!({"id": "a"})),
            &normalizer,
        );
        assert_eq!(
            odd.outcome,
            ReconcileOutcome::Ignored(IgnoreReason::UnrecognizedAction(
                "archive".into()
            ))
        );
        assert_eq!(odd.snapshot, start);

        let idless =
            apply(&start, &event("update", json!({"status": true})), &normalizer);
        assert_eq!(
            idless.outcome,
            ReconcileOutcome::Ignored(IgnoreReason::MissingId)
        );
    }

    #[test]
    fn merge_keeps_previous_optional_fields() {
        let normalizer = Normalizer::new();
        let previous = normalizer.normalize(&RawRecord::from_value(json!({
            "id": "a",
            "created": "2024-01-01",
            "email": "a@example.com",
            "emailVisibility": true,
            "type": "repartidor",
            "lat": 10.0,
            "long": 20.0,
            "phone": "1",
        })));
        let next = normalizer.normalize(&RawRecord::from_value(json!({
            "id": "a",
            "long": 21.0,
        })));

        let merged = merge_rows(&previous, next);
        assert_eq!(merged.created.as_deref(), Some("2024-01-01"));
        assert_eq!(merged.email.as_deref(), Some("a@example.com"));
        assert_eq!(merged.role.as_deref(), Some("repartidor"));
        assert_eq!((merged.lat, merged.lng), (Some(10.0), Some(21.0)));
        // Always-populated fields come from the newer row.
        assert_eq!(merged.phone, "");
    }

    #[test]
    fn bulk_load_orders_newest_first_and_dedupes() {
        let normalizer = Normalizer::new();
        let rows = [
            json!({"id": "old", "created": "2024-01-01 00:00:00.000Z"}),
            json!({"id": "none"}),
            json!({"id": "new", "created": "2024-03-01 00:00:00.000Z"}),
            json!({"id": "old", "created": "2023-01-01 00:00:00.000Z"}),
        ]
        .into_iter()
        .map(|value| normalizer.normalize(&RawRecord::from_value(value)))
        .collect();

        let snapshot = CourierSnapshot::from_bulk_load(rows);
        assert_eq!(ids(&snapshot), ["new", "old", "none"]);
        assert_eq!(
            snapshot.get(&"old".into()).unwrap().created.as_deref(),
            Some("2024-01-01 00:00:00.000Z")
        );
    }
}
