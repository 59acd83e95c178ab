//! Filter rows and bucket them into asset groups.
//!
//! ```text
//! Table rows                        filters: Station == "Hot Station"
//! ┌───────────────────────────┐              Type contains "equip"
//! │ Hot    Equipment   Oven   │     ┌──────────────────────────┐
//! │ Hot    Tools       Whisk  │  →  │ "Mixer"  count 1  [row]   │
//! │ Hot    Equipment   Oven   │     │ "Oven"   count 2  [r, r]  │
//! │ Hot    Equipment   Mixer  │     └──────────────────────────┘
//! └───────────────────────────┘     group keys sorted ascending
//! ```
//!
//! Group keys are ordered byte-wise (`"Oven" < "Whisk" < "whisk"`). Rows
//! keep their table order inside a group. Nothing is paginated: a renderer
//! that lays cards out N per line can use [`chunk_groups`].

use std::collections::BTreeMap;

use super::filter::{Filter, FilterSet, ALL};
use crate::error::{ColumnError, ColumnResult};
use crate::models::{AssetGroup, AssetRow, Table};

/// A validated filter + group-by query over one table.
#[derive(Debug, Clone)]
pub struct GroupQuery<'t> {
    table: &'t Table,
    filters: FilterSet,
    group_index: usize,
}

impl<'t> GroupQuery<'t> {
    /// Validate filters and the group-by column against `table`.
    pub fn new(table: &'t Table, filters: &[Filter], group_by: &str) -> ColumnResult<Self> {
        let filters = FilterSet::new(table, filters)?;
        let group_index =
            table
                .column_index(group_by)
                .ok_or_else(|| ColumnError::FilterOnMissingColumn {
                    column: group_by.to_string(),
                })?;

        Ok(Self {
            table,
            filters,
            group_index,
        })
    }

    /// Rows passing every filter, in table order.
    pub fn filtered(&self) -> Vec<&'t AssetRow> {
        self.filters.apply(self.table)
    }

    /// Filtered rows bucketed by group key, keys ascending.
    pub fn groups(&self) -> Vec<AssetGroup> {
        let mut buckets: BTreeMap<&str, Vec<AssetRow>> = BTreeMap::new();

        for row in self.filtered() {
            let key = row.get_at(self.group_index).unwrap_or("");
            buckets.entry(key).or_default().push(row.clone());
        }

        buckets
            .into_iter()
            .map(|(key, rows)| AssetGroup::new(key.to_string(), rows))
            .collect()
    }

    /// Sorted distinct group keys of the filtered rows.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<&str> = self
            .filtered()
            .into_iter()
            .map(|row| row.get_at(self.group_index).unwrap_or(""))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys.into_iter().map(String::from).collect()
    }

    /// The one group whose key is `key`, for drill-down.
    pub fn select(&self, key: &str) -> Option<AssetGroup> {
        let rows: Vec<AssetRow> = self
            .filtered()
            .into_iter()
            .filter(|row| row.get_at(self.group_index) == Some(key))
            .cloned()
            .collect();

        if rows.is_empty() {
            None
        } else {
            Some(AssetGroup::new(key.to_string(), rows))
        }
    }
}

/// Filter `table` and group the surviving rows by `group_by`.
///
/// An empty result is a normal outcome (nothing to show), not an error.
/// Errors only come from unknown column names.
///
/// # Example
/// ```
/// use assettag::models::Table;
/// use assettag::transform::{filter_and_group, Filter};
///
/// let columns = vec!["Station".to_string(), "Asset Name".to_string()];
/// let rows = vec![
///     vec!["Hot Station".to_string(), "Whisk".to_string()],
///     vec!["Hot Station".to_string(), "Oven".to_string()],
///     vec!["Hot Station".to_string(), "Whisk".to_string()],
/// ];
/// let table = Table::new(columns, &rows);
///
/// let groups = filter_and_group(&table, &[Filter::exact("Station", "Hot Station")], "Asset Name").unwrap();
/// assert_eq!(groups[0].key, "Oven");
/// assert_eq!(groups[1].key, "Whisk");
/// assert_eq!(groups[1].count, 2);
/// ```
pub fn filter_and_group(
    table: &Table,
    filters: &[Filter],
    group_by: &str,
) -> ColumnResult<Vec<AssetGroup>> {
    Ok(GroupQuery::new(table, filters, group_by)?.groups())
}

/// Rows behind a single group, or `None` when no row matches.
pub fn select_group(
    table: &Table,
    filters: &[Filter],
    group_by: &str,
    key: &str,
) -> ColumnResult<Option<AssetGroup>> {
    Ok(GroupQuery::new(table, filters, group_by)?.select(key))
}

/// Options for a selector over `column`: [`ALL`] first, then the sorted
/// distinct values of the filtered rows.
pub fn selector_options(table: &Table, filters: &[Filter], column: &str) -> ColumnResult<Vec<String>> {
    let keys = GroupQuery::new(table, filters, column)?.keys();
    Ok(std::iter::once(ALL.to_string()).chain(keys).collect())
}

/// Split groups into lines of at most `per_line` cards.
pub fn chunk_groups(groups: &[AssetGroup], per_line: usize) -> Vec<&[AssetGroup]> {
    groups.chunks(per_line.max(1)).collect()
}
