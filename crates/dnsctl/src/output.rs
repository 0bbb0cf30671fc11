//! Table rendering for listings and change reports.

use dnsctl_core::{sort_records, ChangeSet, Record};
use tabled::settings::{Padding, Style};
use tabled::{Table, Tabled};

/// Longest value string printed on one row; longer values wrap onto
/// continuation rows.
const MAX_VALUE_WIDTH: usize = 48;

#[derive(Tabled)]
#[tabled(rename_all = "UPPERCASE")]
struct RecordRow {
    name: String,
    #[tabled(rename = "TYPE")]
    rtype: String,
    ttl: String,
    value: String,
}

#[derive(Tabled)]
#[tabled(rename_all = "UPPERCASE")]
struct ChangeRow {
    action: String,
    name: String,
    #[tabled(rename = "TYPE")]
    rtype: String,
    value: String,
}

fn render<R: Tabled>(rows: Vec<R>) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::empty())
        .with(Padding::new(0, 1, 0, 0));
    table.to_string()
}

/// Split a value into display chunks no wider than `MAX_VALUE_WIDTH`,
/// respecting character boundaries.
fn wrap_value(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = value.chars().collect();
    chars
        .chunks(MAX_VALUE_WIDTH)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn record_rows(record: &Record) -> Vec<RecordRow> {
    let mut rows = Vec::new();
    for value in &record.values {
        for (i, chunk) in wrap_value(value).into_iter().enumerate() {
            if i == 0 && rows.is_empty() {
                rows.push(RecordRow {
                    name: record.name.clone(),
                    rtype: record.rtype.to_string(),
                    ttl: record.ttl.to_string(),
                    value: chunk,
                });
            } else {
                // continuation row: only the value column is populated
                rows.push(RecordRow {
                    name: String::new(),
                    rtype: String::new(),
                    ttl: String::new(),
                    value: chunk,
                });
            }
        }
    }
    rows
}

/// Print records sorted into reversed-label order.
pub fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("no records");
        return;
    }
    let mut records = records.to_vec();
    sort_records(&mut records);
    let rows: Vec<RecordRow> = records.iter().flat_map(|r| record_rows(r)).collect();
    println!("{}", render(rows));
}

/// Print what a mutating operation added and deleted.
pub fn print_changes(changes: &ChangeSet) {
    if changes.is_empty() {
        println!("no changes");
        return;
    }
    let row = |action: &str, record: &Record| ChangeRow {
        action: action.to_string(),
        name: record.name.clone(),
        rtype: record.rtype.to_string(),
        value: record.values.join(" "),
    };
    let rows: Vec<ChangeRow> = changes
        .additions
        .iter()
        .map(|r| row("ADD", r))
        .chain(changes.deletions.iter().map(|r| row("DEL", r)))
        .collect();
    println!("{}", render(rows));
}

/// Print the zone table: which provider serves which zone.
pub fn print_zones(zones: &[(String, String)]) {
    #[derive(Tabled)]
    #[tabled(rename_all = "UPPERCASE")]
    struct ZoneRow {
        zone: String,
        provider: String,
    }
    if zones.is_empty() {
        println!("no zones configured");
        return;
    }
    let mut rows: Vec<ZoneRow> = zones
        .iter()
        .map(|(zone, provider)| ZoneRow {
            zone: zone.clone(),
            provider: provider.clone(),
        })
        .collect();
    rows.sort_by(|a, b| a.zone.cmp(&b.zone));
    println!("{}", render(rows));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_char_boundaries() {
        let value = "é".repeat(50);
        let chunks = wrap_value(&value);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 48);
        assert_eq!(chunks[1].chars().count(), 2);
    }

    #[test]
    fn short_values_stay_on_one_row() {
        assert_eq!(wrap_value("192.0.2.1"), vec!["192.0.2.1".to_string()]);
        assert_eq!(wrap_value(""), vec![String::new()]);
    }

    #[test]
    fn continuation_rows_leave_name_empty() {
        let record = Record::new(
            "www.example.com.",
            dnsctl_core::RecordType::Txt,
            300,
            vec!["x".repeat(60)],
        );
        let rows = record_rows(&record);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "www.example.com.");
        assert!(rows[1].name.is_empty());
        assert_eq!(rows[1].value.len(), 12);
    }
}
