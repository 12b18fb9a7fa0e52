//! Business logic services

pub mod catalog;

use std::sync::Arc;

use crate::{config::PaginationConfig, repository::CatalogStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn CatalogStore>, pagination: PaginationConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store, pagination),
        }
    }
}
