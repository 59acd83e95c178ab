//! HTTP Server for the asset catalog API.
//!
//! Serves the normalized sheet and the views built from it. The catalog is
//! loaded lazily on the first request and reloaded once older than the
//! cache TTL.
//!
//! # API Endpoints
//!
//! | Method | Path                               | Description                    |
//! |--------|------------------------------------|--------------------------------|
//! | GET    | `/health`                          | Health check                   |
//! | GET    | `/api/table`                       | Normalized table               |
//! | GET    | `/api/stations`                    | Station tabs with counts       |
//! | GET    | `/api/view?station=&type=&asset=`  | Tabs, selector and cards       |
//! | GET    | `/api/details?station=&asset=`     | Drill-down rows of one card    |
//! | POST   | `/api/refresh`                     | Drop the cached copy, refetch  |
//! | GET    | `/api/logs`                        | SSE stream for real-time logs  |

use axum::{
    extract::{Query, State},
    http::{header, Method},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_success, LOG_BROADCASTER};
use super::types::{DetailsResponse, RefreshResponse, StationsResponse, TableResponse, ViewResponse};
use crate::cache::SheetCache;
use crate::config::AppConfig;
use crate::error::{CatalogError, ServerError, ServerResult};
use crate::sheets::{SheetClient, SheetSource};
use crate::transform::{load_catalog_with, CacheMode, Catalog, LoadOptions, Selection, NO_DATA};

/// Shared server state
pub struct AppState {
    source: SheetSource,
    options: LoadOptions,
    client: SheetClient,
    cache: Mutex<SheetCache>,
    catalog: RwLock<Option<Arc<Catalog>>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(source: SheetSource, config: &AppConfig) -> Self {
        Self {
            source,
            options: LoadOptions::from(config),
            client: SheetClient::new(config.credentials.clone()),
            cache: Mutex::new(SheetCache::with_dir(&config.cache_dir)),
            catalog: RwLock::new(None),
        }
    }

    /// Loaded catalog, (re)loading it when missing or older than the TTL.
    pub async fn catalog(&self) -> ServerResult<Arc<Catalog>> {
        if let Some(catalog) = self.catalog.read().await.as_ref() {
            if self.is_current(catalog) {
                return Ok(Arc::clone(catalog));
            }
        }
        self.reload(CacheMode::Use).await
    }

    fn is_current(&self, catalog: &Catalog) -> bool {
        match chrono::Duration::from_std(self.options.cache_ttl) {
            Ok(ttl) => Utc::now() - catalog.fetched_at < ttl,
            Err(_) => true,
        }
    }

    /// Load the catalog and store it.
    pub async fn reload(&self, cache_mode: CacheMode) -> ServerResult<Arc<Catalog>> {
        let options = LoadOptions {
            cache_mode,
            ..self.options.clone()
        };

        let loaded = {
            let mut cache = self.cache.lock().await;
            load_catalog_with(&self.client, &mut cache, &self.source, &options).await?
        };

        let loaded = Arc::new(loaded);
        *self.catalog.write().await = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Forget the cached copy and fetch again.
    pub async fn refresh(&self) -> ServerResult<Arc<Catalog>> {
        if let Some(key) = self.source.cache_key() {
            let removed = self
                .cache
                .lock()
                .await
                .invalidate(&key)
                .map_err(CatalogError::from)?;
            if removed {
                log_info(format!("Dropped cached copy of {}", self.source));
            }
        }
        self.reload(CacheMode::Refresh).await
    }
}

/// Build the router
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/table", get(table))
        .route("/api/stations", get(stations))
        .route("/api/view", get(view))
        .route("/api/details", get(details))
        .route("/api/refresh", post(refresh))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    source: SheetSource,
    config: AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(source, &config));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Asset catalog server running on http://localhost:{}", port);
    println!("   GET  /api/table    - Normalized table");
    println!("   GET  /api/stations - Station tabs");
    println!("   GET  /api/view     - Tabs, selector and cards");
    println!("   GET  /api/details  - Drill-down rows");
    println!("   POST /api/refresh  - Refetch the sheet");
    println!("   GET  /api/logs     - SSE log stream");
    println!("   GET  /health       - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "assettag",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "table": "GET /api/table",
            "stations": "GET /api/stations",
            "view": "GET /api/view?station=&type=&asset=",
            "details": "GET /api/details?station=&asset=",
            "refresh": "POST /api/refresh",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

fn no_data(catalog: &Catalog) -> Option<String> {
    catalog.is_empty().then(|| NO_DATA.to_string())
}

/// Normalized table endpoint
async fn table(State(state): State<SharedState>) -> ServerResult<Json<TableResponse>> {
    let catalog = state.catalog().await?;

    Ok(Json(TableResponse {
        catalog: catalog.summary(),
        table: (*catalog.table).clone(),
        message: no_data(&catalog),
    }))
}

/// Station tabs endpoint
async fn stations(State(state): State<SharedState>) -> ServerResult<Json<StationsResponse>> {
    let catalog = state.catalog().await?;

    let stations = match catalog.view() {
        Some(view) => view.stations().map_err(CatalogError::from)?,
        None => Vec::new(),
    };

    Ok(Json(StationsResponse {
        catalog: catalog.summary(),
        stations,
        message: no_data(&catalog),
    }))
}

/// Page view endpoint
async fn view(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> ServerResult<Json<ViewResponse>> {
    let catalog = state.catalog().await?;
    let selection = Selection::from_query(&params);

    let page = match catalog.view() {
        Some(view) => Some(view.page(&selection).map_err(CatalogError::from)?),
        None => None,
    };

    Ok(Json(ViewResponse {
        catalog: catalog.summary(),
        selection,
        page,
        message: no_data(&catalog),
    }))
}

/// Drill-down endpoint
async fn details(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> ServerResult<Json<DetailsResponse>> {
    let selection = Selection::from_query(&params);
    let station = selection
        .station
        .as_deref()
        .ok_or_else(|| ServerError::BadRequest("'station' is required".to_string()))?;
    let asset = selection
        .asset
        .as_deref()
        .ok_or_else(|| ServerError::BadRequest("'asset' is required".to_string()))?;

    let catalog = state.catalog().await?;
    let detail = match catalog.view() {
        Some(view) => view.details(station, asset).map_err(CatalogError::from)?,
        None => None,
    };

    Ok(Json(DetailsResponse {
        catalog: catalog.summary(),
        detail,
    }))
}

/// Refetch endpoint
async fn refresh(State(state): State<SharedState>) -> ServerResult<Json<RefreshResponse>> {
    let catalog = state.refresh().await?;
    log_success(format!("Reloaded {} assets", catalog.table.len()));

    Ok(Json(RefreshResponse {
        status: if catalog.is_empty() { "empty" } else { "ok" }.to_string(),
        catalog: catalog.summary(),
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
