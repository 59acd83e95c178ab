//! # Assettag - Commissary asset catalog from a spreadsheet
//!
//! Assettag reads the asset sheet of a kitchen commissary (two header rows,
//! one row per physical item), normalizes it into a table and serves
//! station / type tabs, asset cards and per-card detail lists.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Google Sheet│────▶│   Sheets    │────▶│   Parser    │────▶│  Transform  │
//! │  / CSV file │     │  (+ cache)  │     │ (2 headers) │     │ (tabs/cards)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use assettag::{load_catalog, LoadOptions, SheetSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = SheetSource::File("assets.csv".into());
//!     let catalog = load_catalog(&source, &LoadOptions::default()).await.unwrap();
//!     println!("{} assets", catalog.table.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Table, rows, groups and column roles
//! - [`config`] - Environment and layout configuration
//! - [`parser`] - CSV ingestion and header normalization
//! - [`roles`] - Column role mapping
//! - [`transform`] - Filters, grouping, views and pipeline
//! - [`sheets`] - Spreadsheet fetching
//! - [`cache`] - Fetch cache
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;
pub mod roles;

// Transformation
pub mod transform;

// Fetching
pub mod cache;
pub mod sheets;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CacheError, CatalogError, ColumnError, ConfigError, SheetError, ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{AssetGroup, AssetRow, ColumnRole, Table};

// =============================================================================
// Re-exports - Normalization
// =============================================================================

pub use parser::{combine_headers, make_unique, normalize, parse_csv_file_auto, UNNAMED};

// =============================================================================
// Re-exports - Grouping
// =============================================================================

pub use transform::{
    chunk_groups, filter_and_group, select_group, selector_options, Filter, Predicate, ALL,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::{AppConfig, CatalogLayout};
pub use sheets::{SheetClient, SheetLocator, SheetSource};
pub use transform::{load_catalog, CacheMode, Catalog, CatalogView, LoadOptions, Selection};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
