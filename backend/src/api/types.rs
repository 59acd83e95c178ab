//! REST API types for frontend integration.
//!
//! Every response carries the catalog summary so a client can show where
//! the data came from and how old it is. A sheet without data rows is not
//! an error: lists come back empty with `message` set.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{CatalogError, ServerError};
use crate::models::Table;
use crate::transform::{CatalogSummary, DetailView, PageView, Selection, Tab};

/// `GET /api/table`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResponse {
    pub catalog: CatalogSummary,
    pub table: Table,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /api/stations`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationsResponse {
    pub catalog: CatalogSummary,
    pub stations: Vec<Tab>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /api/view`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub catalog: CatalogSummary,
    /// Selection as understood from the query
    pub selection: Selection,
    /// `None` when there is no data
    pub page: Option<PageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /api/details`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsResponse {
    pub catalog: CatalogSummary,
    /// `None` when no row matches: no detail panel
    pub detail: Option<DetailView>,
}

/// `POST /api/refresh`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub status: String,
    pub catalog: CatalogSummary,
}

impl ServerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Catalog(CatalogError::Sheet(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(error_response(&self.to_string()))).into_response()
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
