//! Error types for the asset catalog.
//!
//! - [`ColumnError`] - Column role / filter column resolution
//! - [`SheetError`] - Fetching and parsing raw sheet rows
//! - [`CacheError`] - Fetch cache persistence
//! - [`ConfigError`] - Environment and layout file configuration
//! - [`CatalogError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! A sheet with too few rows is NOT an error: it normalizes to an empty
//! table. Everything here is either I/O or caller configuration.

use thiserror::Error;

// =============================================================================
// Column Resolution Errors
// =============================================================================

/// A column referenced by configuration or by a filter does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    /// A configured role points at a column the table does not have.
    #[error("Column role '{role}' refers to unknown column '{column}'")]
    UnknownColumnRole { role: String, column: String },

    /// A filter or group-by references a column the table does not have.
    #[error("Filter references unknown column '{column}'")]
    FilterOnMissingColumn { column: String },
}

// =============================================================================
// Sheet Errors
// =============================================================================

/// Errors while obtaining raw sheet rows.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read a local file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Content could not be decoded.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// CSV content is malformed.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The sheet URL or id could not be understood.
    #[error("Invalid sheet locator: {0}")]
    InvalidLocator(String),

    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The spreadsheet service answered with an error.
    #[error("Sheets API error: {0}")]
    Api(String),

    /// The requested worksheet index does not exist.
    #[error("Worksheet {index} not found (spreadsheet has {available})")]
    WorksheetNotFound { index: usize, available: usize },

    /// Unexpected response body.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Cache Errors
// =============================================================================

/// Errors from the on-disk fetch cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error.
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Layout file could not be read.
    #[error("Cannot read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Layout file is not valid JSON for the layout schema.
    #[error("Invalid config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    /// No sheet source configured.
    #[error("No sheet configured: pass --input or --url, or set ASSETTAG_SHEET_URL")]
    MissingSource,
}

// =============================================================================
// Catalog Errors (top-level)
// =============================================================================

/// Top-level errors returned by [`crate::transform::pipeline::load_catalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Sheet fetch/parse error.
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Column configuration error.
    #[error("Column error: {0}")]
    Column(#[from] ColumnError),

    /// Cache error.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Catalog error.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for column resolution.
pub type ColumnResult<T> = Result<T, ColumnError>;

/// Result type for sheet operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ColumnError -> CatalogError
        let col_err = ColumnError::UnknownColumnRole {
            role: "station".into(),
            column: "Stations".into(),
        };
        let catalog_err: CatalogError = col_err.into();
        assert!(catalog_err.to_string().contains("Stations"));

        // SheetError -> CatalogError -> ServerError
        let sheet_err = SheetError::InvalidLocator("nope".into());
        let server_err: ServerError = CatalogError::from(sheet_err).into();
        assert!(server_err.to_string().contains("nope"));
    }

    #[test]
    fn test_filter_error_names_column() {
        let err = ColumnError::FilterOnMissingColumn {
            column: "Asset Name".into(),
        };
        assert_eq!(err.to_string(), "Filter references unknown column 'Asset Name'");
    }

    #[test]
    fn test_worksheet_not_found_format() {
        let err = SheetError::WorksheetNotFound { index: 4, available: 2 };
        let msg = err.to_string();
        assert!(msg.contains('4'));
        assert!(msg.contains('2'));
    }
}
