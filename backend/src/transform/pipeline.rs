//! High-level API: from a sheet source to a browsable catalog.
//!
//! Combines every step: fetch (through the cache), header normalization,
//! spacer column removal and column role resolution.
//!
//! # Example
//!
//! ```rust,ignore
//! use assettag::config::AppConfig;
//! use assettag::sheets::{SheetLocator, SheetSource};
//! use assettag::transform::{load_catalog, LoadOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let source = SheetSource::Remote(SheetLocator::parse("1AbC...", 0)?);
//!     let catalog = load_catalog(&source, &LoadOptions::from(&config)).await?;
//!
//!     if let Some(view) = catalog.view() {
//!         println!("{:?}", view.stations()?);
//!     }
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::view::CatalogView;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::cache::SheetCache;
use crate::config::{AppConfig, CatalogLayout, Credentials, DEFAULT_CACHE_DIR, DEFAULT_CACHE_TTL_SECS};
use crate::error::{CatalogResult, ColumnResult};
use crate::models::{ColumnRole, Table};
use crate::parser::normalize;
use crate::roles::ResolvedRoles;
use crate::sheets::{SheetClient, SheetSource};

/// Message shown for a sheet without data rows.
pub const NO_DATA: &str = "No data loaded";

/// How a load uses the fetch cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Serve a fresh cached copy, fetch otherwise.
    #[default]
    Use,
    /// Always fetch, then update the cache.
    Refresh,
    /// Always fetch, leave the cache alone.
    Bypass,
}

/// Options for [`load_catalog`]
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Sheet layout and column roles
    pub layout: CatalogLayout,
    /// Cache behaviour
    pub cache_mode: CacheMode,
    /// Cache lifetime
    pub cache_ttl: Duration,
    /// Cache directory
    pub cache_dir: PathBuf,
    /// Sheets API credentials
    pub credentials: Option<Credentials>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            layout: CatalogLayout::default(),
            cache_mode: CacheMode::Use,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            credentials: None,
        }
    }
}

impl From<&AppConfig> for LoadOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            layout: config.layout.clone(),
            cache_mode: CacheMode::Use,
            cache_ttl: config.cache_ttl,
            cache_dir: config.cache_dir.clone(),
            credentials: config.credentials.clone(),
        }
    }
}

/// A loaded, normalized sheet ready for views
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Normalized table, spacer columns removed
    pub table: Arc<Table>,
    /// Resolved roles; `None` when the sheet had no header rows
    pub roles: Option<ResolvedRoles>,
    /// Layout used to build views
    pub layout: CatalogLayout,
    /// Where the rows came from
    pub source: String,
    /// When the rows were fetched
    pub fetched_at: DateTime<Utc>,
    /// Whether the rows came from the cache
    pub from_cache: bool,
}

/// Serializable description of a catalog
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl Catalog {
    /// Build a catalog from raw sheet rows.
    pub fn from_rows(
        rows: &[Vec<String>],
        layout: CatalogLayout,
        source: impl Into<String>,
        fetched_at: DateTime<Utc>,
        from_cache: bool,
    ) -> ColumnResult<Self> {
        let table = normalize(rows).drop_leading_columns(layout.skip_leading_columns);

        let roles = if table.columns().is_empty() {
            None
        } else {
            Some(layout.roles.resolve(&table)?)
        };

        Ok(Self {
            table: Arc::new(table),
            roles,
            layout,
            source: source.into(),
            fetched_at,
            from_cache,
        })
    }

    /// True when there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.roles.is_none() || self.table.is_empty()
    }

    /// View builder, `None` when the sheet had no header rows.
    pub fn view(&self) -> Option<CatalogView<'_>> {
        self.roles
            .as_ref()
            .map(|roles| CatalogView::new(&self.table, roles, &self.layout))
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            source: self.source.clone(),
            fetched_at: self.fetched_at,
            from_cache: self.from_cache,
            row_count: self.table.len(),
            columns: self.table.columns().to_vec(),
        }
    }
}

/// Load a catalog, using a cache in `options.cache_dir`.
pub async fn load_catalog(source: &SheetSource, options: &LoadOptions) -> CatalogResult<Catalog> {
    let client = SheetClient::new(options.credentials.clone());
    let mut cache = SheetCache::with_dir(&options.cache_dir);
    load_catalog_with(&client, &mut cache, source, options).await
}

/// Load a catalog with an existing client and cache.
pub async fn load_catalog_with(
    client: &SheetClient,
    cache: &mut SheetCache,
    source: &SheetSource,
    options: &LoadOptions,
) -> CatalogResult<Catalog> {
    // Step 1: Raw rows
    log_info(format!("📖 Loading {}", source));
    let (rows, fetched_at, from_cache) = fetch_rows(client, cache, source, options).await?;

    // Step 2: Headers
    log_info("🔄 Normalizing headers...");
    let catalog = Catalog::from_rows(
        &rows,
        options.layout.clone(),
        source.to_string(),
        fetched_at,
        from_cache,
    )?;

    if catalog.table.columns().is_empty() {
        log_warning(format!("{} ({} rows, need at least 4)", NO_DATA, rows.len()));
        return Ok(catalog);
    }

    log_success(format!(
        "{} columns, {} assets",
        catalog.table.columns().len(),
        catalog.table.len()
    ));

    // Step 3: Roles
    if let Some(ref roles) = catalog.roles {
        for role in ColumnRole::ALL {
            match roles.column(role) {
                Some(column) => log_info_indent(format!("{:<10} → {}", role, column), 1),
                None => log_info_indent(format!("{:<10} → (absent)", role), 1),
            }
        }
    }

    if catalog.is_empty() {
        log_warning(NO_DATA);
    }

    Ok(catalog)
}

/// Raw rows of a source, honouring the cache mode.
async fn fetch_rows(
    client: &SheetClient,
    cache: &mut SheetCache,
    source: &SheetSource,
    options: &LoadOptions,
) -> CatalogResult<(Vec<Vec<String>>, DateTime<Utc>, bool)> {
    let Some(key) = source.cache_key() else {
        return Ok((client.load(source).await?, Utc::now(), false));
    };

    if options.cache_mode == CacheMode::Use {
        if let Some(hit) = cache.get_fresh(&key, options.cache_ttl) {
            log_success(format!(
                "Using cached copy ({}s old)",
                hit.age().num_seconds().max(0)
            ));
            return Ok((hit.rows.clone(), hit.fetched_at, true));
        }
    }

    let rows = client.load(source).await?;

    if options.cache_mode == CacheMode::Bypass {
        return Ok((rows, Utc::now(), false));
    }

    let stored = cache.put(&key, source.to_string(), rows)?;
    Ok((stored.rows.clone(), stored.fetched_at, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogError, ColumnError};
    use crate::roles::ColumnRef;
    use crate::sheets::SheetLocator;
    use tempfile::tempdir;

    const SHEET_CSV: &str = "\
,Commissary assets
,Asset,,,Asset,,Dimensions,Dimensions,Dimensions,,,,
,Number,Station,Type,Name,Quantity,L,W,H,Notes,Voltage,Power,Status
1,HS-01,Hot Station,Equipment,Oven,1,90,70,60,,220V,3kW,Working
2,HS-03,Hot Station,Tools,Whisk,6,,,,,,,
";

    fn raw(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn options(dir: &std::path::Path) -> LoadOptions {
        LoadOptions {
            cache_dir: dir.to_path_buf(),
            ..LoadOptions::default()
        }
    }

    #[test]
    fn test_default_options() {
        let opts = LoadOptions::default();
        assert_eq!(opts.cache_mode, CacheMode::Use);
        assert_eq!(opts.cache_ttl, Duration::from_secs(300));
        assert_eq!(opts.layout.skip_leading_columns, 1);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("assets.csv");
        std::fs::write(&path, SHEET_CSV).unwrap();

        let catalog = load_catalog(&SheetSource::File(path), &options(dir.path()))
            .await
            .unwrap();

        assert!(!catalog.is_empty());
        assert!(!catalog.from_cache);
        assert_eq!(catalog.table.len(), 2);
        assert_eq!(catalog.table.columns()[0], "Asset Number");

        let roles = catalog.roles.as_ref().unwrap();
        assert_eq!(roles.station(), "Station");
        assert_eq!(roles.asset_name(), "Asset Name");

        let tabs = catalog.view().unwrap().stations().unwrap();
        assert_eq!(tabs[0].count, 2);
    }

    #[tokio::test]
    async fn test_short_sheet_is_empty_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "Title\nA,B\nC,D\n").unwrap();

        let catalog = load_catalog(&SheetSource::File(path), &options(dir.path()))
            .await
            .unwrap();

        assert!(catalog.is_empty());
        assert!(catalog.view().is_none());
        assert_eq!(catalog.summary().row_count, 0);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let dir = tempdir().unwrap();
        let locator = SheetLocator::parse("cached-sheet", 0).unwrap();
        let rows: Vec<Vec<String>> = SHEET_CSV
            .lines()
            .map(|line| line.split(',').map(String::from).collect())
            .collect();

        let mut cache = SheetCache::with_dir(dir.path());
        cache.put(&locator.cache_key(), "seed", rows).unwrap();

        // No credentials and no network: only the cache can answer
        let catalog = load_catalog_with(
            &SheetClient::default().with_max_retries(1),
            &mut cache,
            &SheetSource::Remote(locator),
            &options(dir.path()),
        )
        .await
        .unwrap();

        assert!(catalog.from_cache);
        assert_eq!(catalog.table.len(), 2);
    }

    #[test]
    fn test_unknown_role_column_is_an_error() {
        let mut layout = CatalogLayout::default();
        layout.roles = layout
            .roles
            .with(ColumnRole::Station, ColumnRef::Name("Stations".into()));

        let rows = vec![
            raw(&["", "Assets"]),
            raw(&["", "Asset", "", "", "Asset"]),
            raw(&["", "Number", "Station", "Type", "Name"]),
            raw(&["1", "HS-01", "Hot Station", "Tools", "Whisk"]),
        ];

        let err = Catalog::from_rows(&rows, layout, "test", Utc::now(), false).unwrap_err();
        assert!(matches!(err, ColumnError::UnknownColumnRole { ref column, .. } if column == "Stations"));
        assert!(CatalogError::from(err).to_string().contains("Stations"));
    }

    #[test]
    fn test_header_only_sheet() {
        let rows = vec![
            raw(&["", "Assets"]),
            raw(&["", "Asset", "", "", "Asset"]),
            raw(&["", "Number", "Station", "Type", "Name"]),
            raw(&["", "", "", "", ""]),
        ];
        let catalog =
            Catalog::from_rows(&rows, CatalogLayout::default(), "test", Utc::now(), false).unwrap();

        assert_eq!(catalog.table.len(), 1);
        assert!(catalog.view().is_some());
    }
}
