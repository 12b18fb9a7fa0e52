//! Bookshelf catalog server
//!
//! A REST JSON API over a small bibliographic catalog: authors and the books
//! they wrote. Reads are open to everyone, writes need a bearer token.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod policy;
pub mod query;
pub mod repository;
pub mod services;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::CatalogStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire services over an opened store
    pub fn new(config: AppConfig, store: Arc<dyn CatalogStore>) -> Self {
        let services = services::Services::new(store, config.pagination);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
