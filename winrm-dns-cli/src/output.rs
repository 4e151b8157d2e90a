//! Console output: bordered record tables or pretty JSON.

use serde_json::json;
use winrm_dns_provider::Record;

use crate::duration::format_ttl;

const HEADERS: [&str; 6] = ["DnsZone", "Name", "Type", "Value", "TTL", "ID"];

/// Prints records as a table, or as a JSON array when `json` is set.
pub fn print_records(records: &[Record], json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(records)
                .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize: {e}\"}}"))
        );
    } else if records.is_empty() {
        println!("No records found.");
    } else {
        print!("{}", render_table(records));
    }
}

pub fn print_exists(exists: bool, json: bool) {
    if json {
        println!("{}", json!({ "exists": exists }));
    } else {
        println!("{exists}");
    }
}

/// Prints the confirmation for a removed record.
pub fn print_deleted(record: &Record, json: bool) {
    let id = record.identity().to_string();
    if json {
        println!("{}", json!({ "status": "deleted", "id": id }));
    } else {
        println!("Deleted {id}");
    }
}

pub fn render_table(records: &[Record]) -> String {
    let rows: Vec<[String; 6]> = records
        .iter()
        .map(|r| {
            [
                r.zone.clone(),
                r.name.clone(),
                r.record_type.to_string(),
                r.value.clone(),
                format_ttl(r.ttl),
                r.identity().to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = {
        let mut line = String::from("+");
        for width in widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let format_row = |cells: &[&str]| {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(widths) {
            let pad = width - cell.chars().count();
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(pad + 1));
            line.push('|');
        }
        line.push('\n');
        line
    };

    let mut table = border.clone();
    table.push_str(&format_row(&HEADERS));
    table.push_str(&border);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        table.push_str(&format_row(&cells));
    }
    table.push_str(&border);
    table
}
