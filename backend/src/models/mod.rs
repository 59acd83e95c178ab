//! Domain models for the asset catalog.
//!
//! - [`Table`] - Normalized sheet: unique column names plus rows of named cells
//! - [`AssetRow`] - One asset line, every column name mapped to its raw text
//! - [`AssetGroup`] - Rows sharing the same group key after filtering
//! - [`ColumnRole`] - Semantic role a column plays (station, type, ...)
//!
//! Tables are immutable once built. Every filter or grouping pass produces
//! new values and leaves the source table untouched, so a table can be
//! shared behind an `Arc` between concurrent views.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Asset Row
// =============================================================================

/// A single data row. Cells are aligned with the table's column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRow {
    columns: Arc<[String]>,
    cells: Vec<String>,
}

impl AssetRow {
    /// Value of the named column, `None` if the table has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.cells[i].as_str())
    }

    /// Value at a column position.
    pub fn get_at(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// Raw cells in column order.
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(String::as_str))
    }
}

impl Serialize for AssetRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Emitted as an object in column order.
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

// =============================================================================
// Table
// =============================================================================

/// Normalized sheet data.
///
/// An empty table (no columns, no rows) means "no data"; it is the normal
/// outcome for a sheet too short to carry headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Arc<[String]>,
    rows: Vec<AssetRow>,
}

impl Table {
    /// Table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            columns: Arc::from(Vec::new()),
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and raw rows.
    ///
    /// Short rows are padded with empty strings, cells past the last
    /// column are dropped.
    pub fn new(columns: Vec<String>, raw_rows: &[Vec<String>]) -> Self {
        let columns: Arc<[String]> = Arc::from(columns);
        let width = columns.len();

        let rows = raw_rows
            .iter()
            .map(|raw| {
                let cells = (0..width)
                    .map(|i| raw.get(i).cloned().unwrap_or_default())
                    .collect();
                AssetRow {
                    columns: Arc::clone(&columns),
                    cells,
                }
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names in sheet order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows in sheet order.
    pub fn rows(&self) -> &[AssetRow] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table carries no data.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// New table without the first `n` columns.
    ///
    /// The sheet keeps a spacer column before the asset number; views drop
    /// it before resolving roles.
    pub fn drop_leading_columns(&self, n: usize) -> Table {
        if n == 0 {
            return self.clone();
        }
        let n = n.min(self.columns.len());
        let columns = self.columns[n..].to_vec();
        let raw: Vec<Vec<String>> = self.rows.iter().map(|r| r.cells[n..].to_vec()).collect();
        Table::new(columns, &raw)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Table", 2)?;
        s.serialize_field("columns", &*self.columns)?;
        s.serialize_field("rows", &self.rows)?;
        s.end()
    }
}

// =============================================================================
// Asset Group
// =============================================================================

/// Rows sharing one group key, in original row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetGroup {
    /// Value of the group-by column shared by every row.
    pub key: String,
    /// Number of rows in the group.
    pub count: usize,
    /// The rows themselves.
    pub rows: Vec<AssetRow>,
}

impl AssetGroup {
    pub fn new(key: String, rows: Vec<AssetRow>) -> Self {
        Self {
            key,
            count: rows.len(),
            rows,
        }
    }
}

// =============================================================================
// Column Role
// =============================================================================

/// Semantic role of a column in the asset sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Asset number / tag.
    AssetId,
    /// Station the asset belongs to.
    Station,
    /// Classification ("Tools", "Equipment").
    Type,
    /// Human-readable asset name.
    AssetName,
    Quantity,
    Length,
    Width,
    Height,
    Voltage,
    Power,
    Status,
}

impl ColumnRole {
    /// Every role, in sheet order.
    pub const ALL: [ColumnRole; 11] = [
        ColumnRole::AssetId,
        ColumnRole::Station,
        ColumnRole::Type,
        ColumnRole::AssetName,
        ColumnRole::Quantity,
        ColumnRole::Length,
        ColumnRole::Width,
        ColumnRole::Height,
        ColumnRole::Voltage,
        ColumnRole::Power,
        ColumnRole::Status,
    ];

    /// Roles every view depends on.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ColumnRole::AssetId | ColumnRole::Station | ColumnRole::Type | ColumnRole::AssetName
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssetId => "asset_id",
            Self::Station => "station",
            Self::Type => "type",
            Self::AssetName => "asset_name",
            Self::Quantity => "quantity",
            Self::Length => "length",
            Self::Width => "width",
            Self::Height => "height",
            Self::Voltage => "voltage",
            Self::Power => "power",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
