use std::sync::Arc;

use anyhow::{Context, Result};
use fleetmap_config::Config;
use fleetmap_core::tracker::{CourierTracker, TrackerSnapshot};
use fleetmap_core::viewport::{self, HeadlessMap};
use tracing::{error, info, warn};

use super::{WatchArgs, normalizer};

pub async fn run(config: &Config, args: WatchArgs) -> Result<()> {
    let client = args.store.client(config)?;
    let normalizer = normalizer(config, &client);
    let settings = config.tracker_settings();
    let (map, map_events) = HeadlessMap::with_channel(&settings.map);

    info!(
        url = %client.base_url(),
        collection = client.collection(),
        "watching couriers, Ctrl-C to stop"
    );
    let handle = CourierTracker::new(
        Arc::new(client),
        normalizer,
        Box::new(map),
        map_events,
        settings,
    )
    .spawn();

    let mut updates = handle.updates();
    let mut reporter = SnapshotReporter::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("courier tracker stopped unexpectedly");
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                reporter.report(&snapshot);
            }
            signal = &mut ctrl_c => {
                if let Err(err) = signal {
                    error!(error = %err, "cannot listen for Ctrl-C");
                }
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    handle
        .shutdown()
        .await
        .context("courier tracker did not shut down cleanly")
}

/// Logs snapshots, and stream or load errors once per occurrence.
#[derive(Debug, Default)]
struct SnapshotReporter {
    stream_error: Option<String>,
    load_error: Option<String>,
}

impl SnapshotReporter {
    fn report(&mut self, snapshot: &TrackerSnapshot) {
        let bounds = viewport::derive_bounds(
            snapshot.rows.iter().filter(|row| row.is_active()),
        );
        info!(
            revision = snapshot.revision,
            rows = snapshot.rows.len(),
            markers = snapshot.markers.len(),
            located = snapshot.side_list().count(),
            center = %snapshot.map.center,
            zoom = snapshot.map.zoom,
            bounds = ?bounds,
            subscription = %snapshot.subscription,
            loading = snapshot.loading,
            "courier map updated"
        );

        if snapshot.stream_error != self.stream_error {
            if let Some(err) = &snapshot.stream_error {
                warn!(error = %err, "live updates unavailable");
            }
            self.stream_error = snapshot.stream_error.clone();
        }
        if snapshot.load_error != self.load_error {
            if let Some(err) = &snapshot.load_error {
                warn!(error = %err, "courier list could not be loaded");
            }
            self.load_error = snapshot.load_error.clone();
        }
    }
}
