//! Spreadsheet fetching.
//!
//! Pulls the raw rows of one worksheet. Two transports:
//!
//! - **Sheets API v4** when an API key or access token is configured:
//!   the spreadsheet metadata gives the title of the worksheet at the
//!   requested index, then `values/{title}` returns its cells.
//! - **CSV export** otherwise, for link-shared sheets
//!   (`/export?format=csv&gid=...`), parsed by [`crate::parser`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assettag::sheets::{SheetClient, SheetLocator};
//!
//! let locator = SheetLocator::parse("https://docs.google.com/spreadsheets/d/1AbC.../edit", 0)?;
//! let client = SheetClient::from_env();
//! let rows = client.fetch(&locator).await?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::config::Credentials;
use crate::error::{SheetError, SheetResult};
use crate::parser;

/// Default number of attempts per fetch
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between attempts in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Characters of a non-JSON error body kept in messages
const ERROR_BODY_CHARS: usize = 300;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DOCS_BASE: &str = "https://docs.google.com/spreadsheets/d";

static SHEET_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("valid regex"));
static GID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#?&]gid=(\d+)").expect("valid regex"));
static BARE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

// =============================================================================
// Locators
// =============================================================================

/// Which worksheet of which spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLocator {
    /// Spreadsheet id (the long token in the URL).
    pub spreadsheet_id: String,
    /// Zero-based worksheet position.
    pub sheet_index: usize,
    /// Worksheet id from the URL, when present.
    pub gid: Option<u64>,
}

impl SheetLocator {
    /// Accepts a full spreadsheet URL or a bare id.
    pub fn parse(url_or_id: &str, sheet_index: usize) -> SheetResult<Self> {
        let input = url_or_id.trim();

        let spreadsheet_id = if let Some(caps) = SHEET_URL_RE.captures(input) {
            caps[1].to_string()
        } else if BARE_ID_RE.is_match(input) {
            input.to_string()
        } else {
            return Err(SheetError::InvalidLocator(input.to_string()));
        };

        let gid = GID_RE.captures(input).and_then(|c| c[1].parse().ok());

        Ok(Self {
            spreadsheet_id,
            sheet_index,
            gid,
        })
    }

    /// Stable key for caching this worksheet.
    pub fn cache_key(&self) -> String {
        match self.gid {
            Some(gid) => format!("{}-gid{}", self.spreadsheet_id, gid),
            None => format!("{}-{}", self.spreadsheet_id, self.sheet_index),
        }
    }

    /// CSV export URL. Needs a gid, except for the first worksheet.
    pub fn export_url(&self) -> SheetResult<String> {
        let gid = match (self.gid, self.sheet_index) {
            (Some(gid), _) => gid,
            (None, 0) => 0,
            (None, index) => {
                return Err(SheetError::InvalidLocator(format!(
                    "worksheet {} of {} needs a gid in the URL or API credentials",
                    index, self.spreadsheet_id
                )))
            }
        };
        Ok(format!(
            "{}/{}/export?format=csv&gid={}",
            DOCS_BASE, self.spreadsheet_id, gid
        ))
    }
}

impl fmt::Display for SheetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [sheet {}]", self.spreadsheet_id, self.sheet_index)
    }
}

/// Where raw rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSource {
    /// CSV file on disk.
    File(PathBuf),
    /// Remote spreadsheet.
    Remote(SheetLocator),
}

impl SheetSource {
    /// Cache key, `None` for local files (never cached).
    pub fn cache_key(&self) -> Option<String> {
        match self {
            SheetSource::File(_) => None,
            SheetSource::Remote(loc) => Some(loc.cache_key()),
        }
    }
}

impl fmt::Display for SheetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSource::File(path) => write!(f, "{}", path.display()),
            SheetSource::Remote(loc) => write!(f, "{}", loc),
        }
    }
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: u64,
    title: String,
    #[serde(default)]
    index: usize,
}

/// `values` response. Google omits trailing empty cells and rows.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_range_rows(range: ValueRange) -> Vec<Vec<String>> {
    range
        .values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

/// Extract a readable message from an error response body
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => err.error.message,
        Err(_) => format!(
            "HTTP {}: {}",
            status,
            body.chars().take(ERROR_BODY_CHARS).collect::<String>()
        ),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Spreadsheet client
#[derive(Clone)]
pub struct SheetClient {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    max_retries: u32,
}

impl SheetClient {
    /// Create a client with optional credentials
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a client from `GOOGLE_ACCESS_TOKEN` / `GOOGLE_SHEETS_API_KEY`
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let get = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let credentials = get(crate::config::ENV_ACCESS_TOKEN)
            .map(Credentials::AccessToken)
            .or_else(|| get(crate::config::ENV_API_KEY).map(Credentials::ApiKey));
        Self::new(credentials)
    }

    /// Set the number of attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Read raw rows from any source
    pub async fn load(&self, source: &SheetSource) -> SheetResult<Vec<Vec<String>>> {
        match source {
            SheetSource::File(path) => {
                log_info(format!("Reading {}", path.display()));
                let parsed = parser::parse_csv_file_auto(path)?;
                log_success(format!(
                    "Encoding {}, delimiter '{}', {} rows",
                    parsed.encoding,
                    format_delimiter(parsed.delimiter),
                    parsed.rows.len()
                ));
                Ok(parsed.rows)
            }
            SheetSource::Remote(locator) => self.fetch(locator).await,
        }
    }

    /// Fetch one worksheet (with retries)
    pub async fn fetch(&self, locator: &SheetLocator) -> SheetResult<Vec<Vec<String>>> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.try_fetch(locator).await {
                Ok(rows) => {
                    log_success(format!("Fetched {} rows from {}", rows.len(), locator));
                    return Ok(rows);
                }
                // A missing worksheet or bad id won't fix itself
                Err(e @ (SheetError::WorksheetNotFound { .. } | SheetError::InvalidLocator(_))) => {
                    return Err(e)
                }
                Err(e) => {
                    log_warning(format!("Attempt {}/{} failed: {}", attempt, self.max_retries, e));
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        log_info(format!("Retrying in {}ms...", RETRY_DELAY_MS));
                        tokio::time::sleep(tokio::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| SheetError::Http("no attempt made".to_string()));
        log_error(format!("Giving up on {}: {}", locator, error));
        Err(error)
    }

    async fn try_fetch(&self, locator: &SheetLocator) -> SheetResult<Vec<Vec<String>>> {
        match self.credentials {
            Some(ref credentials) => self.fetch_values(locator, credentials).await,
            None => self.fetch_export(locator).await,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder, credentials: &Credentials) -> reqwest::RequestBuilder {
        match credentials {
            Credentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            Credentials::AccessToken(token) => request.bearer_auth(token),
        }
    }

    async fn get_text(&self, request: reqwest::RequestBuilder) -> SheetResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(SheetError::Api(api_error_message(status, &body)));
        }
        Ok(body)
    }

    /// Sheets API: metadata → worksheet title → values
    async fn fetch_values(
        &self,
        locator: &SheetLocator,
        credentials: &Credentials,
    ) -> SheetResult<Vec<Vec<String>>> {
        log_info(format!("Calling Sheets API for {}", locator));

        let meta_url = format!("{}/{}", SHEETS_API_BASE, locator.spreadsheet_id);
        let request = self
            .http
            .get(&meta_url)
            .query(&[("fields", "sheets.properties(sheetId,title,index)")]);
        let body = self.get_text(self.authorize(request, credentials)).await?;
        let meta: SpreadsheetMeta =
            serde_json::from_str(&body).map_err(|e| SheetError::InvalidResponse(e.to_string()))?;

        let title = worksheet_title(&meta, locator)?;
        log_info(format!("Worksheet: {}", title));

        let values_url = values_url(&locator.spreadsheet_id, &title)?;
        let request = self.http.get(values_url).query(&[
            ("majorDimension", "ROWS"),
            ("valueRenderOption", "FORMATTED_VALUE"),
        ]);
        let body = self.get_text(self.authorize(request, credentials)).await?;
        let range: ValueRange =
            serde_json::from_str(&body).map_err(|e| SheetError::InvalidResponse(e.to_string()))?;

        Ok(value_range_rows(range))
    }

    /// CSV export of a link-shared sheet
    async fn fetch_export(&self, locator: &SheetLocator) -> SheetResult<Vec<Vec<String>>> {
        let url = locator.export_url()?;
        log_info(format!("Downloading CSV export for {}", locator));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(SheetError::Api(format!(
                "HTTP {} (is the sheet shared by link?)",
                status
            )));
        }

        // The export is UTF-8 with commas; don't guess.
        let content = parser::decode_content(&bytes, "utf-8")?;
        parser::parse_rows(&content, ',')
    }
}

impl Default for SheetClient {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Title of the worksheet a locator points at
fn worksheet_title(meta: &SpreadsheetMeta, locator: &SheetLocator) -> SheetResult<String> {
    let found = match locator.gid {
        Some(gid) => meta.sheets.iter().find(|s| s.properties.sheet_id == gid),
        None => meta
            .sheets
            .iter()
            .find(|s| s.properties.index == locator.sheet_index),
    };

    found
        .map(|s| s.properties.title.clone())
        .ok_or(SheetError::WorksheetNotFound {
            index: locator.sheet_index,
            available: meta.sheets.len(),
        })
}

/// `values/{range}` URL with the worksheet title as an A1 range
fn values_url(spreadsheet_id: &str, title: &str) -> SheetResult<Url> {
    let mut url = Url::parse(SHEETS_API_BASE).map_err(|e| SheetError::InvalidLocator(e.to_string()))?;
    let range = format!("'{}'", title.replace('\'', "''"));
    url.path_segments_mut()
        .map_err(|_| SheetError::InvalidLocator(spreadsheet_id.to_string()))?
        .push(spreadsheet_id)
        .push("values")
        .push(&range);
    Ok(url)
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_from_url() {
        let loc = SheetLocator::parse(
            "https://docs.google.com/spreadsheets/d/10GM76b6Y91ZfNelelaOvg_Y42c/edit#gid=123",
            0,
        )
        .unwrap();

        assert_eq!(loc.spreadsheet_id, "10GM76b6Y91ZfNelelaOvg_Y42c");
        assert_eq!(loc.gid, Some(123));
        assert_eq!(loc.cache_key(), "10GM76b6Y91ZfNelelaOvg_Y42c-gid123");
    }

    #[test]
    fn test_locator_from_bare_id() {
        let loc = SheetLocator::parse("  abc-DEF_123 ", 2).unwrap();
        assert_eq!(loc.spreadsheet_id, "abc-DEF_123");
        assert_eq!(loc.gid, None);
        assert_eq!(loc.cache_key(), "abc-DEF_123-2");
    }

    #[test]
    fn test_locator_rejects_garbage() {
        let err = SheetLocator::parse("https://example.com/not a sheet", 0).unwrap_err();
        assert!(matches!(err, SheetError::InvalidLocator(_)));
    }

    #[test]
    fn test_export_url() {
        let first = SheetLocator::parse("abc", 0).unwrap();
        assert_eq!(
            first.export_url().unwrap(),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=0"
        );

        let second = SheetLocator::parse("abc", 1).unwrap();
        assert!(second.export_url().is_err());
    }

    #[test]
    fn test_value_range_rows() {
        let range: ValueRange = serde_json::from_str(
            r#"{"range": "'Assets'!A1:C4", "majorDimension": "ROWS",
                "values": [["Assets"], ["Asset", "", "Type"], ["Number", "Name"], ["A-1", "Oven", 2]]}"#,
        )
        .unwrap();
        let rows = value_range_rows(range);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!["Asset", "", "Type"]);
        assert_eq!(rows[3][2], "2");
    }

    #[test]
    fn test_empty_value_range() {
        let range: ValueRange = serde_json::from_str(r#"{"range": "A1:Z"}"#).unwrap();
        assert!(value_range_rows(range).is_empty());
    }

    #[test]
    fn test_worksheet_title_by_index_and_gid() {
        let meta: SpreadsheetMeta = serde_json::from_str(
            r#"{"sheets": [
                {"properties": {"sheetId": 0, "title": "Assets", "index": 0}},
                {"properties": {"sheetId": 77, "title": "Archive", "index": 1}}
            ]}"#,
        )
        .unwrap();

        let by_index = SheetLocator::parse("abc", 1).unwrap();
        assert_eq!(worksheet_title(&meta, &by_index).unwrap(), "Archive");

        let by_gid = SheetLocator::parse("https://docs.google.com/spreadsheets/d/abc/edit#gid=0", 1).unwrap();
        assert_eq!(worksheet_title(&meta, &by_gid).unwrap(), "Assets");

        let missing = SheetLocator::parse("abc", 5).unwrap();
        assert!(matches!(
            worksheet_title(&meta, &missing),
            Err(SheetError::WorksheetNotFound { index: 5, available: 2 })
        ));
    }

    #[test]
    fn test_values_url_quotes_title() {
        let url = values_url("abc", "Asset List").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'Asset%20List'"
        );
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 403, "message": "The caller does not have permission"}}"#;
        let msg = api_error_message(reqwest::StatusCode::FORBIDDEN, body);
        assert_eq!(msg, "The caller does not have permission");

        let msg = api_error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(msg.contains("502"));
    }

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter('\t'), "TAB");
        assert_eq!(format_delimiter(';'), ";");
        assert_eq!(format_delimiter('#'), "?");
    }

    #[test]
    fn test_api_error_message_truncates_on_char_boundary() {
        let body = "x".repeat(299) + "é and more";
        let msg = api_error_message(reqwest::StatusCode::BAD_GATEWAY, &body);
        assert!(msg.ends_with("xé"));
        assert!(!msg.contains("and more"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.csv");
        std::fs::write(&path, "Assets\nAsset,\nNumber,Name\nA-1,Oven\n").unwrap();

        let rows = SheetClient::default()
            .load(&SheetSource::File(path))
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
    }
}
