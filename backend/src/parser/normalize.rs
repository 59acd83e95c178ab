//! Two-row header normalization.
//!
//! The asset sheet carries a banner in row 0 and splits every column title
//! across rows 1 and 2 (e.g. "Asset" above "Number"). Data starts at row 3.
//!
//! ```text
//! row 0 │ Commissary assets (banner, dropped)
//! row 1 │ Asset   │        │ Type │
//! row 2 │ Number  │ Name   │      │
//! ──────┼─────────┼────────┼──────┤
//! names │ Asset Number │ Name │ Type │
//! ```

use std::collections::HashMap;

use crate::models::Table;

/// Index of the first header row.
pub const HEADER_ROW_1: usize = 1;
/// Index of the second header row.
pub const HEADER_ROW_2: usize = 2;
/// Index of the first data row.
pub const FIRST_DATA_ROW: usize = 3;

/// Name used when both header cells are blank.
pub const UNNAMED: &str = "Unnamed";

/// Normalize raw sheet rows into a [`Table`].
///
/// Sheets with fewer than four rows have no data and produce
/// [`Table::empty`]. Never fails, never mutates `rows`.
///
/// # Example
/// ```
/// use assettag::parser::normalize;
///
/// let rows: Vec<Vec<String>> = vec![
///     vec!["Assets".into()],
///     vec!["Asset".into(), "".into()],
///     vec!["Number".into(), "Name".into()],
///     vec!["A-1".into(), "Whisk".into()],
/// ];
/// let table = normalize(&rows);
/// assert_eq!(table.columns(), &["Asset Number".to_string(), "Name".to_string()]);
/// assert_eq!(table.rows()[0].get("Name"), Some("Whisk"));
/// ```
pub fn normalize(rows: &[Vec<String>]) -> Table {
    if rows.len() <= FIRST_DATA_ROW {
        return Table::empty();
    }

    let combined = combine_headers(&rows[HEADER_ROW_1], &rows[HEADER_ROW_2]);
    let columns = make_unique(&combined);

    Table::new(columns, &rows[FIRST_DATA_ROW..])
}

/// Combine two partial header rows position by position.
///
/// Both cells are trimmed. Two non-empty cells are joined with a single
/// space, a lone non-empty cell is used as-is, two blanks give
/// [`UNNAMED`]. The shorter row contributes blanks.
pub fn combine_headers(row1: &[String], row2: &[String]) -> Vec<String> {
    let width = row1.len().max(row2.len());

    (0..width)
        .map(|i| {
            let h1 = row1.get(i).map(|s| s.trim()).unwrap_or("");
            let h2 = row2.get(i).map(|s| s.trim()).unwrap_or("");
            match (h1.is_empty(), h2.is_empty()) {
                (false, false) => format!("{} {}", h1, h2),
                (false, true) => h1.to_string(),
                (true, false) => h2.to_string(),
                (true, true) => UNNAMED.to_string(),
            }
        })
        .collect()
}

/// Make names unique, left to right.
///
/// The first occurrence stays bare; later ones get `_1`, `_2`, ...
/// counted per name.
pub fn make_unique(names: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    names
        .iter()
        .map(|name| match seen.get_mut(name.as_str()) {
            Some(count) => {
                *count += 1;
                format!("{}_{}", name, count)
            }
            None => {
                seen.insert(name.as_str(), 0);
                name.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn sheet(h1: &[&str], h2: &[&str], data: &[&[&str]]) -> Vec<Vec<String>> {
        let mut rows = vec![row(&["Commissary assets"]), row(h1), row(h2)];
        rows.extend(data.iter().map(|d| row(d)));
        rows
    }

    #[test]
    fn test_short_sheets_are_empty() {
        for n in 0..4 {
            let rows: Vec<Vec<String>> = (0..n).map(|_| row(&["a", "b"])).collect();
            let table = normalize(&rows);
            assert!(table.columns().is_empty(), "{} rows", n);
            assert!(table.rows().is_empty(), "{} rows", n);
        }
    }

    #[test]
    fn test_header_combination() {
        let combined = combine_headers(&row(&["Asset", "", "Type"]), &row(&["Number", "Name", ""]));
        assert_eq!(combined, vec!["Asset Number", "Name", "Type"]);
    }

    #[test]
    fn test_headers_are_trimmed() {
        let combined = combine_headers(&row(&["  Asset ", " "]), &row(&[" Number", "  "]));
        assert_eq!(combined, vec!["Asset Number", "Unnamed"]);
    }

    #[test]
    fn test_uneven_header_rows() {
        let combined = combine_headers(&row(&["Asset"]), &row(&["Number", "Status"]));
        assert_eq!(combined, vec!["Asset Number", "Status"]);
    }

    #[test]
    fn test_uniqueness_suffixes() {
        let unique = make_unique(&row(&["Type", "Type", "Type"]));
        assert_eq!(unique, vec!["Type", "Type_1", "Type_2"]);
    }

    #[test]
    fn test_uniqueness_counts_per_name() {
        let unique = make_unique(&row(&["Unnamed", "Name", "Unnamed", "Name", "Unnamed"]));
        assert_eq!(unique, vec!["Unnamed", "Name", "Unnamed_1", "Name_1", "Unnamed_2"]);
    }

    #[test]
    fn test_ragged_rows_pad_with_empty() {
        let rows = sheet(
            &["Asset", "", "Asset"],
            &["Number", "Station", "Name"],
            &[&["A-1"], &["A-2", "Hot Station", "Oven", "extra"]],
        );
        let table = normalize(&rows);

        assert_eq!(table.columns(), &row(&["Asset Number", "Station", "Asset Name"])[..]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get("Asset Number"), Some("A-1"));
        assert_eq!(table.rows()[0].get("Station"), Some(""));
        assert_eq!(table.rows()[0].get("Asset Name"), Some(""));
        assert_eq!(table.rows()[1].get("Asset Name"), Some("Oven"));
    }

    #[test]
    fn test_banner_is_ignored() {
        let rows = sheet(&["Name"], &[""], &[&["Whisk"]]);
        let table = normalize(&rows);
        assert_eq!(table.columns(), &row(&["Name"])[..]);
        assert_eq!(table.rows()[0].get("Name"), Some("Whisk"));
    }

    #[test]
    fn test_input_not_mutated() {
        let rows = sheet(&["Type", "Type"], &["", ""], &[&["Tools", "Equipment"]]);
        let before = rows.clone();
        let first = normalize(&rows);
        let second = normalize(&rows);

        assert_eq!(rows, before);
        assert_eq!(first, second);
        assert_eq!(first.columns(), &row(&["Type", "Type_1"])[..]);
    }
}
