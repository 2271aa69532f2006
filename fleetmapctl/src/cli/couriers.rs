use std::io::{self, Write};

use anyhow::{Context, Result};
use fleetmap_config::Config;
use fleetmap_core::contracts::store::{RecordStore, RoleQuery};
use fleetmap_core::geo;
use fleetmap_core::view::CourierView;
use fleetmap_core::UserRow;
use tracing::info;

use super::{CouriersArgs, normalizer};

pub async fn run(config: &Config, args: CouriersArgs) -> Result<()> {
    let client = args.store.client(config)?;
    let roles = config.courier_roles();
    let query = RoleQuery::new(roles.clone(), config.store.bulk_limit);

    info!(url = %client.base_url(), roles = ?roles.roles(), "listing couriers");
    let records = client
        .list_by_roles(&query)
        .await
        .context("courier bulk load failed")?;

    let mut view = CourierView::new(normalizer(config, &client), roles);
    let ticket = view.mount();
    view.complete_bulk_load(ticket, records);
    let snapshot = view.snapshot();

    let rows: Vec<&UserRow> = if args.located {
        geo::all_with_coords(snapshot)
    } else {
        snapshot.iter().collect()
    };
    info!(
        listed = rows.len(),
        active = geo::active_with_coords(snapshot).len(),
        "couriers loaded"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        for row in rows {
            serde_json::to_writer(&mut out, row)?;
            writeln!(out)?;
        }
    } else {
        write_table(&mut out, &rows)?;
    }
    out.flush()?;
    Ok(())
}

fn write_table(out: &mut impl Write, rows: &[&UserRow]) -> io::Result<()> {
    let name_width = rows
        .iter()
        .map(|row| row.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    writeln!(
        out,
        "{:<16} {:<name_width$} {:<8} {:<14} POSITION",
        "ID", "NAME", "STATUS", "PHONE"
    )?;
    for row in rows {
        let position = match geo::valid_position(row) {
            Some(at) => at.to_string(),
            None => "-".to_string(),
        };
        writeln!(
            out,
            "{:<16} {:<name_width$} {:<8} {:<14} {}",
            row.id.as_str(),
            row.name,
            row.status,
            row.phone,
            position
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmap_core::{RecordId, UserStatus};

    fn row(id: &str, name: &str, lat: Option<f64>) -> UserRow {
        UserRow {
            id: RecordId::parse(id).unwrap(),
            created: None,
            name: name.to_string(),
            email: None,
            phone: "300".to_string(),
            role: Some("repartidor".to_string()),
            status: UserStatus::Active,
            lat,
            lng: lat,
            avatar_url: String::new(),
        }
    }

    #[test]
    fn table_pads_to_longest_name() {
        let rows = [row("a", "Ana María", Some(11.0)), row("b", "Bo", None)];
        let refs: Vec<&UserRow> = rows.iter().collect();
        let mut out = Vec::new();
        write_table(&mut out, &refs).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("Ana María"));
        assert!(lines[1].contains("active"));
        assert!(lines[2].ends_with(" -"));
    }
}
