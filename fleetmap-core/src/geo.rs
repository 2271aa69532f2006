//! Coordinate and status predicates plus the projections built on them.
//!
//! Everything here is a read-only view over a [`CourierSnapshot`].

use fleetmap_model::{LatLng, Marker, RecordId, UserRow};

use crate::reconcile::CourierSnapshot;

/// Both coordinates finite and not the `0,0` "no location" sentinel.
pub fn has_coords(row: &UserRow) -> bool {
    valid_position(row).is_some()
}

pub fn valid_position(row: &UserRow) -> Option<LatLng> {
    row.coordinates()
        .filter(|point| point.is_finite() && !point.is_null_island())
}

/// Rows rendered as markers: active and located.
pub fn active_with_coords(snapshot: &CourierSnapshot) -> Vec<&UserRow> {
    snapshot
        .iter()
        .filter(|row| row.is_active() && has_coords(row))
        .collect()
}

/// Rows listed beside the map: located, any status.
pub fn all_with_coords(snapshot: &CourierSnapshot) -> Vec<&UserRow> {
    snapshot.iter().filter(|row| has_coords(row)).collect()
}

pub fn markers(snapshot: &CourierSnapshot) -> Vec<Marker> {
    snapshot
        .iter()
        .filter(|row| row.is_active())
        .filter_map(|row| {
            valid_position(row).map(|position| Marker {
                id: row.id.clone(),
                position,
                title: row.name.clone(),
            })
        })
        .collect()
}

/// Whether the "no couriers" banner should be hidden.
pub fn has_couriers(snapshot: &CourierSnapshot) -> bool {
    snapshot.iter().any(|row| row.is_active() && has_coords(row))
}

/// Identity of the active-with-coords set, used to decide whether a change
/// needs a viewport re-fit.
pub fn active_positions(
    snapshot: &CourierSnapshot,
) -> Vec<(RecordId, LatLng)> {
    snapshot
        .iter()
        .filter(|row| row.is_active())
        .filter_map(|row| valid_position(row).map(|p| (row.id.clone(), p)))
        .collect()
}
