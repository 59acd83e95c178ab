//! Application configuration.
//!
//! Two layers:
//!
//! - [`AppConfig`] - where the sheet lives and how long fetches are cached,
//!   read from the environment (a `.env` file is honoured via `dotenvy`).
//! - [`CatalogLayout`] - what the sheet looks like: spacer columns, station
//!   tabs, type tabs and column roles. Defaults match the commissary sheet;
//!   a JSON file named by `ASSETTAG_CONFIG` overrides any field.
//!
//! CLI flags override both.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::roles::RoleMap;

/// Sheet URL or id.
pub const ENV_SHEET_URL: &str = "ASSETTAG_SHEET_URL";
/// Zero-based worksheet index.
pub const ENV_SHEET_INDEX: &str = "ASSETTAG_SHEET_INDEX";
/// Fetch cache lifetime in seconds.
pub const ENV_CACHE_TTL: &str = "ASSETTAG_CACHE_TTL_SECS";
/// Fetch cache directory.
pub const ENV_CACHE_DIR: &str = "ASSETTAG_CACHE_DIR";
/// Path of a [`CatalogLayout`] JSON file.
pub const ENV_LAYOUT_FILE: &str = "ASSETTAG_CONFIG";
/// Google Sheets API key.
pub const ENV_API_KEY: &str = "GOOGLE_SHEETS_API_KEY";
/// OAuth access token for private sheets.
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";

/// Default fetch cache lifetime (5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default fetch cache directory (relative to current dir).
pub const DEFAULT_CACHE_DIR: &str = ".assettag/cache";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Credentials for the Sheets API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API key, enough for link-shared sheets.
    ApiKey(String),
    /// OAuth bearer token.
    AccessToken(String),
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Sheet URL or bare spreadsheet id.
    pub sheet_url: Option<String>,
    /// Zero-based worksheet index.
    pub sheet_index: usize,
    /// Fetch cache lifetime.
    pub cache_ttl: Duration,
    /// Fetch cache directory.
    pub cache_dir: PathBuf,
    /// Sheets API credentials; `None` falls back to the CSV export.
    pub credentials: Option<Credentials>,
    /// Sheet layout.
    pub layout: CatalogLayout,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheet_url: None,
            sheet_index: 0,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            credentials: None,
            layout: CatalogLayout::default(),
        }
    }
}

impl AppConfig {
    /// Load from environment variables, after reading `.env` if present.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.sheet_url = get(ENV_SHEET_URL);

        if let Some(v) = get(ENV_SHEET_INDEX) {
            config.sheet_index = parse_env(ENV_SHEET_INDEX, &v)?;
        }
        if let Some(v) = get(ENV_CACHE_TTL) {
            config.cache_ttl = Duration::from_secs(parse_env(ENV_CACHE_TTL, &v)?);
        }
        if let Some(v) = get(ENV_CACHE_DIR) {
            config.cache_dir = PathBuf::from(v);
        }

        // A token grants more than a key, prefer it
        config.credentials = get(ENV_ACCESS_TOKEN)
            .map(Credentials::AccessToken)
            .or_else(|| get(ENV_API_KEY).map(Credentials::ApiKey));

        if let Some(path) = get(ENV_LAYOUT_FILE) {
            config.layout = CatalogLayout::from_file(&path)?;
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Shape of the asset sheet and of the tabs built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogLayout {
    /// Columns dropped after normalization (the sheet has a spacer column).
    pub skip_leading_columns: usize,
    /// Station tabs, in display order.
    pub stations: Vec<String>,
    /// Type tabs, matched case-insensitively as substrings.
    pub types: Vec<String>,
    /// Cards per grid line.
    pub cards_per_line: usize,
    /// Role overrides, applied on top of [`RoleMap::default`].
    pub roles: RoleMap,
}

impl Default for CatalogLayout {
    fn default() -> Self {
        Self {
            skip_leading_columns: 1,
            stations: vec![
                "Hot Station".to_string(),
                "Fabrication Station".to_string(),
                "Pastry Station".to_string(),
                "Packing Station".to_string(),
            ],
            types: vec!["Tools".to_string(), "Equipment".to_string()],
            cards_per_line: 4,
            roles: RoleMap::default(),
        }
    }
}

impl CatalogLayout {
    /// Read a layout JSON file. Missing fields keep their defaults; `roles`
    /// entries override the default mapping one by one.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Parse a layout from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut layout: CatalogLayout = serde_json::from_str(json)?;
        layout.roles = RoleMap::default().merge(&layout.roles);
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnRole;
    use crate::roles::ColumnRef;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.sheet_index, 0);
        assert!(config.sheet_url.is_none());
        assert!(config.credentials.is_none());
        assert_eq!(config.layout.stations.len(), 4);
        assert_eq!(config.layout.skip_leading_columns, 1);
    }

    #[test]
    fn test_env_values() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_SHEET_URL, "https://docs.google.com/spreadsheets/d/abc123"),
            (ENV_SHEET_INDEX, "2"),
            (ENV_CACHE_TTL, "60"),
            (ENV_API_KEY, "key"),
            (ENV_ACCESS_TOKEN, "  "),
        ]))
        .unwrap();

        assert_eq!(config.sheet_index, 2);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.credentials, Some(Credentials::ApiKey("key".into())));
    }

    #[test]
    fn test_invalid_env_value() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_CACHE_TTL, "five")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_TTL));
    }

    #[test]
    fn test_layout_partial_json() {
        let layout = CatalogLayout::from_json(
            r#"{"stations": ["Bakery"], "roles": {"status": "Condition"}}"#,
        )
        .unwrap();

        assert_eq!(layout.stations, vec!["Bakery"]);
        assert_eq!(layout.types, vec!["Tools", "Equipment"]);
        assert_eq!(
            layout.roles.get(ColumnRole::Status),
            Some(&ColumnRef::Name("Condition".into()))
        );
        // Untouched roles keep the default mapping
        assert_eq!(layout.roles.get(ColumnRole::Station), Some(&ColumnRef::Index(1)));
    }

    #[test]
    fn test_layout_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{"skip_leading_columns": 0}"#).unwrap();

        let config =
            AppConfig::from_lookup(lookup(&[(ENV_LAYOUT_FILE, path.to_str().unwrap())])).unwrap();
        assert_eq!(config.layout.skip_leading_columns, 0);
    }

    #[test]
    fn test_layout_file_missing() {
        let err = CatalogLayout::from_file("/nonexistent/layout.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
