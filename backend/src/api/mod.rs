//! HTTP API module.
//!
//! This module provides the HTTP server, response types and the log stream
//! of the asset catalog backend.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState, SharedState};
pub use types::*;
