//! Browse a flat object-storage key space as folders and files.
//!
//! The library has three layers:
//! - [`browser`]: pure projection of keys onto folder levels, breadcrumb
//!   derivation, and the navigation/session state machine.
//! - [`services`]: where key listings come from (`KeyLister`), including the
//!   SQLite-backed [`services::storage_service::StorageService`].
//! - [`routes`] / [`handlers`] / [`console`]: the HTTP listing API and the
//!   interactive terminal front end.

pub mod browser;
pub mod config;
pub mod console;
pub mod errors;
pub mod handlers;
pub mod migrations;
pub mod models;
pub mod routes;
pub mod services;
