//! Bookstore catalog server
//!
//! A REST JSON API for a bookstore catalog: books belong to one or more
//! categories, can be searched by category or by author and title, and can be
//! withdrawn from or returned to lending.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn repository::CatalogStore>) -> Self {
        let services = services::Services::new(store, &config.search);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
