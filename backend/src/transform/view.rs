//! Catalog views: what a page shows, as plain data.
//!
//! ```text
//! ┌ Hot Station ┬ Fabrication Station ┬ Pastry Station ┬ Packing Station ┐  station tabs
//! │ ┌ Tools ┬ Equipment ┐                                                 │  type tabs
//! │ │ Asset name: [All ▾]                                                 │  selector
//! │ │ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐                               │  cards
//! │ │ │ Oven │ │Mixer │ │Scale │ │ ...  │                               │
//! │ │ │ 2    │ │ 1    │ │ 4    │ │      │                               │
//! └─┴─┴──────┴─┴──────┴─┴──────┴─┴──────┴───────────────────────────────┘
//! ```
//!
//! Which card is open is an explicit [`Selection`], usually restored from
//! the `station` / `type` / `asset` query parameters of the page URL. With
//! a station and an asset selected the page shows the detail list of that
//! card instead of the tabs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::filter::{Filter, ALL};
use super::grouper::{chunk_groups, GroupQuery};
use crate::config::CatalogLayout;
use crate::error::ColumnResult;
use crate::models::{AssetGroup, AssetRow, ColumnRole, Table};
use crate::roles::ResolvedRoles;

/// Shown when a detail column is absent from the sheet.
pub const NOT_AVAILABLE: &str = "N/A";

// =============================================================================
// Selection
// =============================================================================

/// Explicit view state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Station tab.
    #[serde(default)]
    pub station: Option<String>,
    /// Type tab.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Asset name; [`ALL`] or absent means every asset.
    #[serde(default)]
    pub asset: Option<String>,
}

impl Selection {
    /// Restore from URL query parameters. Blank values count as absent;
    /// other values are kept verbatim since group keys are raw cells.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            params
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .cloned()
        };

        Self {
            station: get("station"),
            kind: get("type"),
            asset: get("asset"),
        }
    }

    /// Asset filter value, [`ALL`] when none is selected.
    pub fn asset_or_all(&self) -> &str {
        self.asset.as_deref().unwrap_or(ALL)
    }

    /// A specific card is open.
    pub fn is_drill_down(&self) -> bool {
        self.station.is_some() && self.asset_or_all() != ALL
    }

    /// Close the open card, keeping the tabs.
    pub fn close(&self) -> Self {
        Self {
            station: self.station.clone(),
            kind: self.kind.clone(),
            asset: None,
        }
    }

    /// Query parameters encoding this selection.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref s) = self.station {
            params.push(("station", s.clone()));
        }
        if let Some(ref k) = self.kind {
            params.push(("type", k.clone()));
        }
        if let Some(ref a) = self.asset {
            params.push(("asset", a.clone()));
        }
        params
    }
}

// =============================================================================
// View Types
// =============================================================================

/// A tab label with the number of rows behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub name: String,
    pub count: usize,
}

/// One card: an asset name and how many items carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetCard {
    pub name: String,
    pub count: usize,
}

impl From<&AssetGroup> for AssetCard {
    fn from(group: &AssetGroup) -> Self {
        Self {
            name: group.key.clone(),
            count: group.count,
        }
    }
}

/// Content of one station / type tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeTabView {
    pub station: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Asset selector options, [`ALL`] first.
    pub options: Vec<String>,
    /// Selected option.
    pub selected: String,
    /// Cards in key order.
    pub cards: Vec<AssetCard>,
    /// Cards split into grid lines.
    pub lines: Vec<Vec<AssetCard>>,
}

impl TypeTabView {
    /// Nothing matches this tab.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Details of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: String,
    /// `"L × W × H cm"`.
    pub dimensions: String,
    pub voltage: String,
    pub power: String,
    pub status: String,
}

/// Drill-down into one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub station: String,
    pub asset: String,
    pub count: usize,
    pub items: Vec<AssetDetail>,
    /// Raw rows behind the card.
    pub rows: Vec<AssetRow>,
}

/// Everything a page needs for one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PageView {
    /// Tabs and cards.
    Tabs {
        stations: Vec<Tab>,
        types: Vec<Tab>,
        active: Option<TypeTabView>,
    },
    /// Detail list of one card.
    Detail(DetailView),
}

// =============================================================================
// Catalog View
// =============================================================================

/// Builds views over one normalized table.
#[derive(Debug, Clone, Copy)]
pub struct CatalogView<'a> {
    table: &'a Table,
    roles: &'a ResolvedRoles,
    layout: &'a CatalogLayout,
}

impl<'a> CatalogView<'a> {
    pub fn new(table: &'a Table, roles: &'a ResolvedRoles, layout: &'a CatalogLayout) -> Self {
        Self {
            table,
            roles,
            layout,
        }
    }

    fn station_filter(&self, station: &str) -> Filter {
        Filter::exact(self.roles.station(), station)
    }

    fn type_filter(&self, kind: &str) -> Filter {
        Filter::contains_ci(self.roles.kind(), kind)
    }

    fn count(&self, filters: &[Filter]) -> ColumnResult<usize> {
        Ok(GroupQuery::new(self.table, filters, self.roles.asset_name())?
            .filtered()
            .len())
    }

    /// Configured station tabs with their row counts.
    pub fn stations(&self) -> ColumnResult<Vec<Tab>> {
        self.layout
            .stations
            .iter()
            .map(|name| {
                Ok(Tab {
                    name: name.clone(),
                    count: self.count(&[self.station_filter(name)])?,
                })
            })
            .collect()
    }

    /// Configured type tabs of one station with their row counts.
    pub fn type_tabs(&self, station: &str) -> ColumnResult<Vec<Tab>> {
        self.layout
            .types
            .iter()
            .map(|kind| {
                Ok(Tab {
                    name: kind.clone(),
                    count: self.count(&[self.station_filter(station), self.type_filter(kind)])?,
                })
            })
            .collect()
    }

    /// Selector options and cards of one station / type tab.
    ///
    /// Options list every asset name of the tab whatever `asset` is; the
    /// cards are narrowed to `asset` unless it is [`ALL`].
    pub fn type_tab(&self, station: &str, kind: &str, asset: &str) -> ColumnResult<TypeTabView> {
        let asset_col = self.roles.asset_name();
        let mut filters = vec![self.station_filter(station), self.type_filter(kind)];

        let options = std::iter::once(ALL.to_string())
            .chain(GroupQuery::new(self.table, &filters, asset_col)?.keys())
            .collect();

        filters.push(Filter::exact(asset_col, asset));
        let groups = GroupQuery::new(self.table, &filters, asset_col)?.groups();

        let cards: Vec<AssetCard> = groups.iter().map(AssetCard::from).collect();
        let lines = chunk_groups(&groups, self.layout.cards_per_line)
            .into_iter()
            .map(|line| line.iter().map(AssetCard::from).collect())
            .collect();

        Ok(TypeTabView {
            station: station.to_string(),
            kind: kind.to_string(),
            options,
            selected: asset.to_string(),
            cards,
            lines,
        })
    }

    /// Every row of `station` whose asset name is exactly `asset`.
    ///
    /// The type tab is not part of the key: a card opens all items of that
    /// name at the station. `None` when nothing matches.
    pub fn details(&self, station: &str, asset: &str) -> ColumnResult<Option<DetailView>> {
        let group = GroupQuery::new(
            self.table,
            &[self.station_filter(station)],
            self.roles.asset_name(),
        )?
        .select(asset);

        Ok(group.map(|group| DetailView {
            station: station.to_string(),
            asset: group.key.clone(),
            count: group.count,
            items: group.rows.iter().map(|row| self.detail(row)).collect(),
            rows: group.rows,
        }))
    }

    /// Map one row to its detail fields.
    pub fn detail(&self, row: &AssetRow) -> AssetDetail {
        let field = |role: ColumnRole| -> String {
            self.roles
                .column(role)
                .and_then(|col| row.get(col))
                .unwrap_or(NOT_AVAILABLE)
                .to_string()
        };

        AssetDetail {
            id: field(ColumnRole::AssetId),
            kind: field(ColumnRole::Type),
            quantity: field(ColumnRole::Quantity),
            dimensions: format!(
                "{} × {} × {} cm",
                field(ColumnRole::Length),
                field(ColumnRole::Width),
                field(ColumnRole::Height)
            ),
            voltage: field(ColumnRole::Voltage),
            power: field(ColumnRole::Power),
            status: field(ColumnRole::Status),
        }
    }

    /// Build the page for a selection.
    ///
    /// A drill-down whose card no longer exists falls back to the tabs.
    /// Without a station the first configured tab is active; without a
    /// type the first type tab is.
    pub fn page(&self, selection: &Selection) -> ColumnResult<PageView> {
        if let (Some(station), true) = (&selection.station, selection.is_drill_down()) {
            if let Some(detail) = self.details(station, selection.asset_or_all())? {
                return Ok(PageView::Detail(detail));
            }
        }

        let stations = self.stations()?;
        let station = selection
            .station
            .clone()
            .or_else(|| self.layout.stations.first().cloned());

        let Some(station) = station else {
            return Ok(PageView::Tabs {
                stations,
                types: Vec::new(),
                active: None,
            });
        };

        let types = self.type_tabs(&station)?;
        let kind = selection
            .kind
            .clone()
            .or_else(|| self.layout.types.first().cloned());

        let active = match kind {
            Some(kind) => Some(self.type_tab(&station, &kind, selection.asset_or_all())?),
            None => None,
        };

        Ok(PageView::Tabs {
            stations,
            types,
            active,
        })
    }
}
