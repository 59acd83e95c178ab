//! Row filters.
//!
//! A filter is `(column, predicate, value)`. Filters combine with AND. The
//! selector value [`ALL`] means "no restriction": such a filter is dropped
//! before anything is evaluated.

use serde::{Deserialize, Serialize};

use crate::error::{ColumnError, ColumnResult};
use crate::models::{AssetRow, Table};

/// Selector value meaning "do not filter on this column".
pub const ALL: &str = "All";

/// How a filter compares a cell to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Case-sensitive equality.
    ExactMatch,
    /// Case-insensitive substring. Empty cells never match.
    ContainsCi,
}

/// A single column filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub predicate: Predicate,
    pub value: String,
}

impl Filter {
    pub fn exact(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::ExactMatch,
            value: value.into(),
        }
    }

    pub fn contains_ci(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::ContainsCi,
            value: value.into(),
        }
    }

    /// True when the value is the [`ALL`] sentinel.
    pub fn is_all(&self) -> bool {
        self.value == ALL
    }
}

/// Filter bound to a column position of one table.
#[derive(Debug, Clone)]
struct BoundFilter {
    index: usize,
    predicate: Predicate,
    /// Lowercased once for `ContainsCi`.
    value: String,
}

impl BoundFilter {
    fn matches(&self, row: &AssetRow) -> bool {
        let cell = row.get_at(self.index).unwrap_or("");
        match self.predicate {
            Predicate::ExactMatch => cell == self.value,
            Predicate::ContainsCi => !cell.is_empty() && cell.to_lowercase().contains(&self.value),
        }
    }
}

/// Validated filter list for one table.
///
/// Column names are checked here, so evaluating rows cannot fail.
#[derive(Debug, Clone)]
pub struct FilterSet {
    filters: Vec<BoundFilter>,
}

impl FilterSet {
    /// Validate `filters` against `table`.
    ///
    /// Every referenced column must exist, including those of "All"
    /// filters, which are then skipped.
    pub fn new(table: &Table, filters: &[Filter]) -> ColumnResult<Self> {
        let mut bound = Vec::with_capacity(filters.len());

        for filter in filters {
            let index = table
                .column_index(&filter.column)
                .ok_or_else(|| ColumnError::FilterOnMissingColumn {
                    column: filter.column.clone(),
                })?;

            if filter.is_all() {
                continue;
            }

            let value = match filter.predicate {
                Predicate::ExactMatch => filter.value.clone(),
                Predicate::ContainsCi => filter.value.to_lowercase(),
            };

            bound.push(BoundFilter {
                index,
                predicate: filter.predicate,
                value,
            });
        }

        Ok(Self { filters: bound })
    }

    /// True when the row passes every filter.
    pub fn matches(&self, row: &AssetRow) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Rows of `table` passing every filter, in table order.
    pub fn apply<'t>(&self, table: &'t Table) -> Vec<&'t AssetRow> {
        table.rows().iter().filter(|row| self.matches(row)).collect()
    }

    /// Number of active (non-"All") filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let columns = ["Station", "Type", "Asset Name"].map(String::from).to_vec();
        let rows: Vec<Vec<String>> = [
            ["Hot Station", "Equipment", "Oven"],
            ["Hot Station", "Tools", "Whisk"],
            ["Pastry Station", "Small Equipment", "Mixer"],
            ["Pastry Station", "", "Whisk"],
        ]
        .iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect();
        Table::new(columns, &rows)
    }

    fn names(rows: &[&AssetRow]) -> Vec<String> {
        rows.iter()
            .map(|r| r.get("Asset Name").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_exact_match_is_case_sensitive() {
        let t = table();
        let set = FilterSet::new(&t, &[Filter::exact("Station", "hot station")]).unwrap();
        assert!(set.apply(&t).is_empty());

        let set = FilterSet::new(&t, &[Filter::exact("Station", "Hot Station")]).unwrap();
        assert_eq!(names(&set.apply(&t)), vec!["Oven", "Whisk"]);
    }

    #[test]
    fn test_contains_ci() {
        let t = table();
        let set = FilterSet::new(&t, &[Filter::contains_ci("Type", "equip")]).unwrap();
        assert_eq!(names(&set.apply(&t)), vec!["Oven", "Mixer"]);
    }

    #[test]
    fn test_contains_ci_never_matches_empty_cell() {
        let t = table();
        // Even an empty needle must not match an empty cell
        let set = FilterSet::new(&t, &[Filter::contains_ci("Type", "")]).unwrap();
        assert_eq!(names(&set.apply(&t)), vec!["Oven", "Whisk", "Mixer"]);
    }

    #[test]
    fn test_filters_combine_with_and() {
        let t = table();
        let set = FilterSet::new(
            &t,
            &[
                Filter::exact("Station", "Pastry Station"),
                Filter::contains_ci("Type", "EQUIPMENT"),
            ],
        )
        .unwrap();
        assert_eq!(names(&set.apply(&t)), vec!["Mixer"]);
    }

    #[test]
    fn test_all_sentinel_is_skipped() {
        let t = table();
        let with_all = FilterSet::new(
            &t,
            &[Filter::exact("Station", "Hot Station"), Filter::exact("Asset Name", ALL)],
        )
        .unwrap();
        let without = FilterSet::new(&t, &[Filter::exact("Station", "Hot Station")]).unwrap();

        assert_eq!(with_all.len(), 1);
        assert_eq!(names(&with_all.apply(&t)), names(&without.apply(&t)));
    }

    #[test]
    fn test_missing_column_fails_at_construction() {
        let t = table();
        let err = FilterSet::new(&t, &[Filter::exact("Status", ALL)]).unwrap_err();
        assert_eq!(
            err,
            ColumnError::FilterOnMissingColumn {
                column: "Status".into()
            }
        );
    }

    #[test]
    fn test_predicate_serde() {
        let filter: Filter = serde_json::from_str(
            r#"{"column": "Type", "predicate": "contains_ci", "value": "tools"}"#,
        )
        .unwrap();
        assert_eq!(filter, Filter::contains_ci("Type", "tools"));
    }
}
