//! Scorebook
//!
//! A minimal key-value web service backed by an external in-memory store.
//! Client records are stored by external id and carry a generated score;
//! a companion binary watches injected credentials for tampering.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server exposing the record CRUD surface
//! - **Store**: Redis reached over a mutually authenticated TLS connection,
//!   behind the [`store::RecordStore`] trait so handlers stay store-agnostic
//! - **Memory introspection**: debug endpoint dumping the process's own
//!   readable address ranges to stdout
//! - **Credential watcher**: polling loop that exits when injected
//!   environment credentials change underneath the process
//!
//! # Modules
//!
//! - [`config`]: configuration loading (file, environment, CLI)
//! - [`error`]: HTTP error taxonomy
//! - [`record`]: client record model and byte codec
//! - [`store`]: store trait and Redis implementation
//! - [`memdump`]: memory-map parsing and dumping
//! - [`watcher`]: credential snapshot and integrity loop

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unused_async)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod error;
pub mod memdump;
pub mod record;
pub mod server;
pub mod store;
pub mod watcher;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::RecordStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store holding encoded client records, keyed by client id.
    pub store: Arc<dyn RecordStore>,
    /// Global configuration.
    pub config: Arc<AppConfig>,
}
