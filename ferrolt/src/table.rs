//! Parser for the `show card` status table.
//!
//! The device prints a banner, a whitespace-aligned table and a prompt:
//!
//! ```text
//! show card
//! Shelf Slot CfgType RealType Port  HardVer SoftVer   Status
//! -------------------------------------------------------------
//! 1     1    PRWGS   PRWGS    0     V1.0    V1.2.3    INSERVICE
//! 1     3    GTGH    GTGH     16    V1.0    V2.1.0    INSERVICE
//! 1     4    GTGH             16                      OFFLINE
//! ZXAN(config)#
//! ```
//!
//! Everything from the marker onward is read as a header line plus rows.
//! Rows are mapped onto header names by position; lines that do not fit
//! (the dashed rule, the prompt, rows with missing cells) simply fail the
//! filters and are dropped.

use std::collections::HashMap;

use log::debug;
use serde::Deserialize;

/// Column names and tokens of the status table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// Text that begins the table header.
    pub marker: String,

    /// Shelf column header.
    pub shelf_column: String,

    /// Slot column header.
    pub slot_column: String,

    /// Port-count column header.
    pub port_column: String,

    /// Status column header.
    pub status_column: String,

    /// Status value of a card that is up.
    pub in_service: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            marker: "Shelf".to_string(),
            shelf_column: "Shelf".to_string(),
            slot_column: "Slot".to_string(),
            port_column: "Port".to_string(),
            status_column: "Status".to_string(),
            in_service: "INSERVICE".to_string(),
        }
    }
}

/// An in-service card with at least one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardRow {
    pub shelf: u32,
    pub slot: u32,
    pub port: u32,
}

/// Turns raw `show card` output into [`CardRow`]s.
#[derive(Debug, Clone, Default)]
pub struct StatusTableParser {
    layout: TableLayout,
}

impl StatusTableParser {
    /// Create a parser for the given layout.
    pub fn new(layout: TableLayout) -> Self {
        Self { layout }
    }

    /// The layout in use.
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Parse the table, keeping in-service cards with ports, in source order.
    ///
    /// Returns `None` when the marker does not occur in `raw`.
    pub fn parse(&self, raw: &str) -> Option<Vec<CardRow>> {
        let start = raw.find(self.layout.marker.as_str())?;
        let mut lines = raw[start..].lines();

        let header: Vec<&str> = lines.next()?.split_whitespace().collect();

        let rows = lines
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| self.parse_row(&header, line))
            .collect();

        Some(rows)
    }

    fn parse_row(&self, header: &[&str], line: &str) -> Option<CardRow> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() > header.len() {
            debug!("Dropping row with more cells than the header: {:?}", line);
            return None;
        }

        let cells: HashMap<&str, &str> = header.iter().copied().zip(fields).collect();
        let layout = &self.layout;

        if cells.get(layout.status_column.as_str()) != Some(&layout.in_service.as_str()) {
            return None;
        }

        let number = |column: &str| -> Option<u32> {
            let value = cells.get(column)?;
            match value.parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    debug!("Dropping row with non-numeric {}: {:?}", column, value);
                    None
                }
            }
        };

        let row = CardRow {
            shelf: number(&layout.shelf_column)?,
            slot: number(&layout.slot_column)?,
            port: number(&layout.port_column)?,
        };

        (row.port > 0).then_some(row)
    }
}
