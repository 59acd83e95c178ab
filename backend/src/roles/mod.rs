//! Column role mapping.
//!
//! The sheet schema is a contract with whoever maintains the spreadsheet,
//! not with this code: which column holds the station, the type, the asset
//! name and so on is configuration. A role points at a column either by
//! position or by name, and is resolved to a column name exactly once,
//! after normalization. Every view then works on names only.
//!
//! ```json
//! {
//!   "station": "Station",
//!   "type": 2,
//!   "asset_name": "Asset Name"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ColumnError, ColumnResult};
use crate::models::{ColumnRole, Table};

/// Reference to a column by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "#{}", i),
            ColumnRef::Name(n) => f.write_str(n),
        }
    }
}

/// Configured role → column mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMap {
    roles: BTreeMap<ColumnRole, ColumnRef>,
}

impl RoleMap {
    /// Empty mapping.
    pub fn new() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    /// Set (or replace) the column for a role.
    pub fn with(mut self, role: ColumnRole, column: ColumnRef) -> Self {
        self.roles.insert(role, column);
        self
    }

    pub fn get(&self, role: ColumnRole) -> Option<&ColumnRef> {
        self.roles.get(&role)
    }

    /// Overlay `other` on top of this mapping.
    pub fn merge(mut self, other: &RoleMap) -> Self {
        for (role, column) in &other.roles {
            self.roles.insert(*role, column.clone());
        }
        self
    }

    /// Resolve every role against the table's columns.
    ///
    /// Fails when a required role is unmapped, when any role names a column
    /// the table does not have, or when a required role's position is out
    /// of range. Optional roles mapped by position past the last column
    /// resolve to nothing: the sheet simply has no such detail column.
    pub fn resolve(&self, table: &Table) -> ColumnResult<ResolvedRoles> {
        let columns = table.columns();
        let mut resolved = BTreeMap::new();

        for role in ColumnRole::ALL {
            let Some(column) = self.roles.get(&role) else {
                if role.is_required() {
                    return Err(ColumnError::UnknownColumnRole {
                        role: role.to_string(),
                        column: "(unmapped)".to_string(),
                    });
                }
                continue;
            };

            let name = match column {
                ColumnRef::Name(name) if table.has_column(name) => Some(name.clone()),
                ColumnRef::Index(i) if *i < columns.len() => Some(columns[*i].clone()),
                ColumnRef::Index(_) if !role.is_required() => None,
                _ => {
                    return Err(ColumnError::UnknownColumnRole {
                        role: role.to_string(),
                        column: column.to_string(),
                    })
                }
            };

            if let Some(name) = name {
                resolved.insert(role, name);
            }
        }

        Ok(ResolvedRoles { columns: resolved })
    }
}

impl Default for RoleMap {
    /// Layout of the commissary sheet once its spacer column is dropped.
    fn default() -> Self {
        use ColumnRole::*;
        [
            (AssetId, 0),
            (Station, 1),
            (Type, 2),
            (AssetName, 3),
            (Quantity, 4),
            (Length, 5),
            (Width, 6),
            (Height, 7),
            (Voltage, 9),
            (Power, 10),
            (Status, 11),
        ]
        .into_iter()
        .fold(RoleMap::new(), |map, (role, i)| map.with(role, ColumnRef::Index(i)))
    }
}

/// Roles resolved to column names of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoles {
    columns: BTreeMap<ColumnRole, String>,
}

impl ResolvedRoles {
    /// Column name for a role, if the table has one.
    pub fn column(&self, role: ColumnRole) -> Option<&str> {
        self.columns.get(&role).map(String::as_str)
    }

    /// Column name for a required role.
    ///
    /// Resolution guarantees these exist; the fallback is never hit for a
    /// value obtained from [`RoleMap::resolve`].
    pub fn required(&self, role: ColumnRole) -> &str {
        self.column(role).unwrap_or_default()
    }

    pub fn station(&self) -> &str {
        self.required(ColumnRole::Station)
    }

    pub fn kind(&self) -> &str {
        self.required(ColumnRole::Type)
    }

    pub fn asset_name(&self) -> &str {
        self.required(ColumnRole::AssetName)
    }

    pub fn asset_id(&self) -> &str {
        self.required(ColumnRole::AssetId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> Table {
        Table::new(columns.iter().map(|s| s.to_string()).collect(), &[])
    }

    fn sheet_columns() -> Table {
        table(&[
            "Asset Number", "Station", "Type", "Asset Name", "Quantity", "Dimensions L",
            "Dimensions W", "Dimensions H", "Unnamed", "Voltage", "Power", "Status",
        ])
    }

    #[test]
    fn test_default_roles_resolve_on_full_sheet() {
        let roles = RoleMap::default().resolve(&sheet_columns()).unwrap();

        assert_eq!(roles.station(), "Station");
        assert_eq!(roles.kind(), "Type");
        assert_eq!(roles.asset_name(), "Asset Name");
        assert_eq!(roles.column(ColumnRole::Voltage), Some("Voltage"));
        assert_eq!(roles.column(ColumnRole::Status), Some("Status"));
    }

    #[test]
    fn test_optional_index_past_end_is_absent() {
        let roles = RoleMap::default()
            .resolve(&table(&["No", "Station", "Type", "Asset Name"]))
            .unwrap();

        assert_eq!(roles.asset_name(), "Asset Name");
        assert_eq!(roles.column(ColumnRole::Status), None);
    }

    #[test]
    fn test_required_index_past_end_fails() {
        let err = RoleMap::default()
            .resolve(&table(&["No", "Station"]))
            .unwrap_err();

        assert_eq!(
            err,
            ColumnError::UnknownColumnRole {
                role: "type".into(),
                column: "#2".into()
            }
        );
    }

    #[test]
    fn test_unknown_name_fails_loudly() {
        let map = RoleMap::default().with(ColumnRole::Status, ColumnRef::Name("State".into()));
        let err = map.resolve(&sheet_columns()).unwrap_err();

        assert!(err.to_string().contains("status"));
        assert!(err.to_string().contains("State"));
    }

    #[test]
    fn test_unmapped_required_role_fails() {
        let map = RoleMap::new()
            .with(ColumnRole::AssetId, ColumnRef::Index(0))
            .with(ColumnRole::Station, ColumnRef::Index(1))
            .with(ColumnRole::Type, ColumnRef::Index(2));

        assert!(map.resolve(&sheet_columns()).is_err());
    }

    #[test]
    fn test_roles_from_json() {
        let json = r#"{"station": "Station", "type": 2, "asset_name": "Asset Name"}"#;
        let overlay: RoleMap = serde_json::from_str(json).unwrap();

        assert_eq!(overlay.get(ColumnRole::Station), Some(&ColumnRef::Name("Station".into())));
        assert_eq!(overlay.get(ColumnRole::Type), Some(&ColumnRef::Index(2)));

        let roles = RoleMap::default().merge(&overlay).resolve(&sheet_columns()).unwrap();
        assert_eq!(roles.station(), "Station");
    }
}
