//! Business logic services

pub mod catalog;
pub mod reconcile;

use std::sync::Arc;

use crate::{config::SearchConfig, repository::CatalogStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
}

impl Services {
    /// Create all services on top of the given catalog store
    pub fn new(store: Arc<dyn CatalogStore>, search: &SearchConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store, search.title_match),
        }
    }
}
